// src/config/ai.rs
use serde::{Deserialize, Serialize};

fn default_schema_version() -> u32 {
    2
}
fn default_max_per_run() -> usize {
    50
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderKind {
    #[default]
    OpenAi,
    Gemini,
    /// Deterministic offline enricher for tests/local runs.
    Mock,
}

impl AiProviderKind {
    /// Case-insensitive; `None` for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "gemini" => Some(Self::Gemini),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }

    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Mock => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeSettings {
    pub provider: AiProviderKind,
    /// Current enrichment schema version; bump when the prompt/fields change.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Per-run quota of records sent to the AI service.
    #[serde(default = "default_max_per_run")]
    pub max_per_run: usize,
    pub openai_model: String,
    pub openai_base_url: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    /// Resolved from the provider's env var (`OPENAI_API_KEY` / `GEMINI_API_KEY`).
    #[serde(skip_serializing)]
    pub api_key: String,
    pub fetch_article_text: bool,
    pub article_char_budget: usize,
    pub article_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub concurrency: usize,
    /// Pause after each AI call, to stay under provider rate limits.
    pub pause_ms: u64,
    /// Persist after every applied enrichment instead of once at the end.
    pub save_each: bool,
}

impl Default for AnalyzeSettings {
    fn default() -> Self {
        Self {
            provider: AiProviderKind::default(),
            schema_version: default_schema_version(),
            max_per_run: default_max_per_run(),
            openai_model: "gpt-4.1-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: String::new(),
            fetch_article_text: true,
            article_char_budget: 6000,
            article_timeout_secs: 10,
            request_timeout_secs: 60,
            concurrency: 1,
            pause_ms: 1000,
            save_each: false,
        }
    }
}

impl AnalyzeSettings {
    pub fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if let Some(kind) = lookup("AI_PROVIDER").and_then(|v| AiProviderKind::parse(&v)) {
            self.provider = kind;
        }
        if let Some(n) = lookup("ANALYSIS_VERSION").and_then(|v| v.trim().parse().ok()) {
            self.schema_version = n;
        }
        if let Some(n) = lookup("MAX_ARTICLES_PER_RUN").and_then(|v| v.trim().parse().ok()) {
            self.max_per_run = n;
        }
        if let Some(v) = lookup("OPENAI_MODEL").filter(|v| !v.trim().is_empty()) {
            self.openai_model = v.trim().to_string();
        }
        if let Some(v) = lookup("GEMINI_MODEL").filter(|v| !v.trim().is_empty()) {
            self.gemini_model = v.trim().to_string();
        }
        if let Some(n) = lookup("ANALYZE_CONCURRENCY").and_then(|v| v.trim().parse().ok()) {
            self.concurrency = n;
        }
        if let Some(n) = lookup("ANALYZE_PAUSE_MS").and_then(|v| v.trim().parse().ok()) {
            self.pause_ms = n;
        }
        if let Some(key) = self.provider.api_key_env().and_then(lookup) {
            self.api_key = key.trim().to_string();
        }
    }

    pub fn sanitize(&mut self) {
        let d = Self::default();
        if self.max_per_run == 0 {
            self.max_per_run = d.max_per_run;
        }
        if self.concurrency == 0 {
            self.concurrency = 1;
        }
        if self.article_char_budget == 0 {
            self.article_char_budget = d.article_char_budget;
        }
        if self.article_timeout_secs == 0 {
            self.article_timeout_secs = d.article_timeout_secs;
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = d.request_timeout_secs;
        }
    }

    pub fn model(&self) -> &str {
        match self.provider {
            AiProviderKind::OpenAi => &self.openai_model,
            AiProviderKind::Gemini => &self.gemini_model,
            AiProviderKind::Mock => "mock",
        }
    }
}
