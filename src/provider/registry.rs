//! Model identifier resolution.
//!
//! The supported set is closed and statically known; anything outside it is
//! rejected with `UnsupportedModel` before any generation work begins.

use reqwest::Client as HttpClient;

use super::{Backend, GeminiBackend, ModelSpec, OpenAiBackend};
use crate::error::ChatError;

/// Maps logical model identifiers to ready backend handles.
///
/// Credentials come from static configuration at construction. A missing or
/// wrong key does not affect resolution — it surfaces as an auth failure
/// when the backend is actually driven.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    http: HttpClient,
    openai_api_key: String,
    gemini_api_key: String,
}

impl BackendRegistry {
    pub fn new(openai_api_key: String, gemini_api_key: String) -> Self {
        Self {
            http: HttpClient::new(),
            openai_api_key,
            gemini_api_key,
        }
    }

    /// Descriptors for every supported model.
    pub fn specs() -> Vec<ModelSpec> {
        vec![
            ModelSpec::gpt_4o(),
            ModelSpec::gpt_35_turbo(),
            ModelSpec::gemini_15_flash(),
        ]
    }

    /// Case-insensitive lookup against the closed supported set.
    pub fn resolve(&self, model_id: &str) -> Result<Backend, ChatError> {
        match model_id.trim().to_ascii_lowercase().as_str() {
            "gpt-4o" => Ok(Backend::OpenAi(OpenAiBackend::new(
                self.http.clone(),
                self.openai_api_key.clone(),
                ModelSpec::gpt_4o(),
            ))),
            "gpt-3.5-turbo" => Ok(Backend::OpenAi(OpenAiBackend::new(
                self.http.clone(),
                self.openai_api_key.clone(),
                ModelSpec::gpt_35_turbo(),
            ))),
            "gemini-1.5-flash" => Ok(Backend::Gemini(GeminiBackend::new(
                self.http.clone(),
                self.gemini_api_key.clone(),
                ModelSpec::gemini_15_flash(),
            ))),
            _ => Err(ChatError::UnsupportedModel(model_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::BackendKind;

    fn registry() -> BackendRegistry {
        BackendRegistry::new("openai-key".into(), "gemini-key".into())
    }

    #[test]
    fn test_resolve_known_models() {
        let registry = registry();

        let backend = registry.resolve("gpt-4o").unwrap();
        assert_eq!(backend.spec().id, "gpt-4o");
        assert_eq!(backend.name(), "openai");

        let backend = registry.resolve("gpt-3.5-turbo").unwrap();
        assert_eq!(backend.spec().id, "gpt-3.5-turbo");

        let backend = registry.resolve("gemini-1.5-flash").unwrap();
        assert_eq!(backend.spec().backend, BackendKind::Gemini);
        assert_eq!(backend.name(), "gemini");
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = registry();
        for id in ["GPT-4O", "Gpt-4o", "GPT-3.5-Turbo", "Gemini-1.5-Flash", "  gpt-4o  "] {
            let backend = registry.resolve(id).unwrap();
            assert_eq!(backend.spec().id, id.trim().to_ascii_lowercase());
        }
    }

    #[test]
    fn test_resolve_rejects_unknown_models() {
        let registry = registry();
        for id in ["gpt-5", "claude", "", "gemini"] {
            let err = registry.resolve(id).unwrap_err();
            match err {
                ChatError::UnsupportedModel(got) => assert_eq!(got, id),
                other => panic!("expected UnsupportedModel, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_specs_cover_supported_set() {
        let ids: Vec<_> = BackendRegistry::specs().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["gpt-4o", "gpt-3.5-turbo", "gemini-1.5-flash"]);
    }
}
