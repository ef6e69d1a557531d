// src/analyze/providers/gemini.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status_error;
use crate::analyze::ai_adapter::{parse_model_json, Enricher};
use crate::analyze::prompt::SYSTEM_PROMPT;
use crate::error::CollaboratorError;

const SERVICE: &str = "gemini";

/// Google Gemini `generateContent` with a JSON response MIME type.
pub struct GeminiEnricher {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiEnricher {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("market-news-enricher/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Req<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}
#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}
#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}
#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<RespContent>,
}
#[derive(Deserialize)]
struct RespContent {
    #[serde(default)]
    parts: Vec<RespPart>,
}
#[derive(Deserialize)]
struct RespPart {
    #[serde(default)]
    text: Option<String>,
}

fn looks_like_quota_issue(status: u16, body: &str) -> bool {
    let b = body.to_ascii_lowercase();
    status == 429 || b.contains("quota") || b.contains("billing")
}

#[async_trait]
impl Enricher for GeminiEnricher {
    async fn complete(&self, prompt: &str) -> Result<Value, CollaboratorError> {
        let req = Req {
            system_instruction: Content {
                parts: vec![Part {
                    text: SYSTEM_PROMPT,
                }],
            },
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let resp = self
            .http
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            let err = status_error(SERVICE, resp).await;
            if let CollaboratorError::Status { status, body, .. } = &err {
                if looks_like_quota_issue(*status, body) {
                    tracing::error!(
                        target: "analyze",
                        status,
                        "gemini rejected the call; this looks like a quota/billing issue, check plan and rate limits"
                    );
                }
            }
            return Err(err);
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::decode(SERVICE, e))?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        parse_model_json(SERVICE, &text)
    }

    fn name(&self) -> &'static str {
        SERVICE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_detection() {
        assert!(looks_like_quota_issue(429, ""));
        assert!(looks_like_quota_issue(403, "Billing account disabled"));
        assert!(!looks_like_quota_issue(500, "internal"));
    }
}
