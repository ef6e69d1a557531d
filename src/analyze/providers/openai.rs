// src/analyze/providers/openai.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status_error;
use crate::analyze::ai_adapter::{parse_model_json, Enricher};
use crate::analyze::prompt::SYSTEM_PROMPT;
use crate::error::CollaboratorError;

const SERVICE: &str = "openai";

/// OpenAI Chat Completions in JSON mode.
pub struct OpenAiEnricher {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiEnricher {
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
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}
#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}
#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    response_format: ResponseFormat,
    messages: Vec<Msg<'a>>,
}
#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    choices: Vec<Choice>,
}
#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}
#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Enricher for OpenAiEnricher {
    async fn complete(&self, prompt: &str) -> Result<Value, CollaboratorError> {
        let req = Req {
            model: &self.model,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(status_error(SERVICE, resp).await);
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::decode(SERVICE, e))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(CollaboratorError::EmptyResponse(SERVICE))?;

        parse_model_json(SERVICE, &content)
    }

    fn name(&self) -> &'static str {
        SERVICE
    }
}
