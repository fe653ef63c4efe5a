//! Configuration file support.
//!
//! Loads config from ~/.chatrelay/config.toml; every field can also come
//! from the environment.

use serde::Deserialize;
use std::path::PathBuf;

/// Configuration for chatrelay.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// Gemini API key
    pub gemini_api_key: Option<String>,

    /// Bind host
    pub host: Option<String>,

    /// Bind port
    pub port: Option<u16>,
}

impl Config {
    /// Load config from ~/.chatrelay/config.toml.
    pub fn load() -> Self {
        let path = config_path();

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: failed to parse {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Get a value with fallback to an environment variable.
    pub fn get_or_env(&self, field: Option<&String>, env_var: &str) -> Option<String> {
        field.cloned().or_else(|| std::env::var(env_var).ok())
    }
}

/// Get the config file path.
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".chatrelay")
        .join("config.toml")
}
