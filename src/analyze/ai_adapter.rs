//! AI adapter: enricher abstraction, provider factory, and output normalization.
//!
//! Providers return whatever JSON object the model produced; nothing they return
//! is trusted. `normalize_output` is the single place where model output becomes
//! typed `AnalysisFields`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::analyze::providers::{gemini::GeminiEnricher, openai::OpenAiEnricher};
use crate::config::{AiProviderKind, AnalyzeSettings};
use crate::error::CollaboratorError;
use crate::record::AnalysisFields;

/// Enrichment collaborator: takes a rendered prompt, returns the model's JSON object.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<Value, CollaboratorError>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynEnricher = Arc<dyn Enricher>;

/// Build the enricher selected in config. Real providers need an API key.
pub fn build_enricher(cfg: &AnalyzeSettings) -> Result<DynEnricher, CollaboratorError> {
    let timeout = Duration::from_secs(cfg.request_timeout_secs);
    match cfg.provider {
        AiProviderKind::Mock => Ok(Arc::new(MockEnricher::default())),
        AiProviderKind::OpenAi => {
            if cfg.api_key.is_empty() {
                return Err(CollaboratorError::MissingCredentials("openai"));
            }
            Ok(Arc::new(OpenAiEnricher::new(
                &cfg.openai_base_url,
                &cfg.api_key,
                &cfg.openai_model,
                timeout,
            )?))
        }
        AiProviderKind::Gemini => {
            if cfg.api_key.is_empty() {
                return Err(CollaboratorError::MissingCredentials("gemini"));
            }
            Ok(Arc::new(GeminiEnricher::new(
                &cfg.gemini_base_url,
                &cfg.api_key,
                &cfg.gemini_model,
                timeout,
            )?))
        }
    }
}

/// Decode-with-defaults of a model answer (see `AnalysisFields::from_value`).
pub fn normalize_output(raw: &Value) -> AnalysisFields {
    AnalysisFields::from_value(raw)
}

/// Parse the model's text as a JSON object.
///
/// Models sometimes wrap JSON in markdown fences or prose even in JSON mode;
/// fall back to the outermost `{...}` span before giving up.
pub fn parse_model_json(service: &'static str, text: &str) -> Result<Value, CollaboratorError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CollaboratorError::EmptyResponse(service));
    }
    let parsed = serde_json::from_str::<Value>(trimmed).or_else(|first_err| {
        match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str::<Value>(&trimmed[start..=end])
            }
            _ => Err(first_err),
        }
    });
    match parsed {
        Ok(v @ Value::Object(_)) => Ok(v),
        Ok(_) => Err(CollaboratorError::decode(service, "model output is not a JSON object")),
        Err(e) => Err(CollaboratorError::decode(service, e)),
    }
}

/// Deterministic offline enricher for tests/local runs.
#[derive(Debug, Clone)]
pub struct MockEnricher {
    pub fixed: Value,
}

impl Default for MockEnricher {
    fn default() -> Self {
        Self {
            fixed: serde_json::json!({
                "sentiment": "neutral",
                "confidence": 0.5,
                "summary": "Mock analysis.",
                "impact": "No impact assessed (mock).",
                "risks": ["mock risk"]
            }),
        }
    }
}

#[async_trait]
impl Enricher for MockEnricher {
    async fn complete(&self, _prompt: &str) -> Result<Value, CollaboratorError> {
        Ok(self.fixed.clone())
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}
