//! chatrelay - streaming chat relay over interchangeable LLM backends.
//!
//! Forwards user messages to a selected generation backend, streams the
//! response back over SSE, and keeps the running conversation history in
//! process-wide memory.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use chatrelay::chat::Orchestrator;
use chatrelay::config::Config;
use chatrelay::memory::ConversationMemory;
use chatrelay::provider::BackendRegistry;
use chatrelay::web::{self, AppState};

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(about = "Streaming chat relay over interchangeable LLM backends")]
struct Args {
    /// Bind host
    #[arg(long)]
    host: Option<String>,

    /// Bind port (default: 8000)
    #[arg(long)]
    port: Option<u16>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY")]
    openai_api_key: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY")]
    gemini_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (from ~/.chatrelay/.env or current dir)
    let env_path = dirs::home_dir()
        .map(|h| h.join(".chatrelay").join(".env"))
        .filter(|p| p.exists());
    if let Some(path) = env_path {
        let _ = dotenvy::from_path(&path);
    } else {
        let _ = dotenvy::dotenv();
    }

    // Initialize logging
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load();

    let openai_api_key = args
        .openai_api_key
        .or_else(|| config.get_or_env(config.openai_api_key.as_ref(), "OPENAI_API_KEY"))
        .unwrap_or_default();
    let gemini_api_key = args
        .gemini_api_key
        .or_else(|| config.get_or_env(config.gemini_api_key.as_ref(), "GEMINI_API_KEY"))
        .unwrap_or_default();

    if openai_api_key.is_empty() {
        info!("no OpenAI API key configured; gpt-* models will fail at generation time");
    }
    if gemini_api_key.is_empty() {
        info!("no Gemini API key configured; gemini-* models will fail at generation time");
    }

    let host = args
        .host
        .or(config.host)
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let port = args.port.or(config.port).unwrap_or(8000);

    let memory = Arc::new(ConversationMemory::new());
    let registry = BackendRegistry::new(openai_api_key, gemini_api_key);
    let orchestrator = Arc::new(Orchestrator::new(registry, memory));

    info!(
        "starting chatrelay with models: {}",
        BackendRegistry::specs()
            .iter()
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    web::run(&host, port, AppState { orchestrator }).await
}
