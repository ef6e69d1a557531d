// src/ingest/finnhub.rs
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use serde_json::Value;

use crate::config::FetchSettings;
use crate::error::CollaboratorError;
use crate::ingest::types::{NewsFetcher, RawNewsItem};

const SERVICE: &str = "finnhub";

/// Finnhub market news (`GET /news?category=...`).
pub struct FinnhubFetcher {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    category: String,
}

impl FinnhubFetcher {
    pub fn new(cfg: &FetchSettings) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("market-news-enricher/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.finnhub_api_key.clone(),
            category: cfg.category.clone(),
        })
    }
}

#[async_trait]
impl NewsFetcher for FinnhubFetcher {
    async fn fetch_latest(&self) -> Result<Vec<RawNewsItem>, CollaboratorError> {
        if self.api_key.trim().is_empty() {
            return Err(CollaboratorError::MissingCredentials(SERVICE));
        }
        let t0 = Instant::now();

        let resp = self
            .http
            .get(format!("{}/news", self.base_url))
            .query(&[("category", self.category.as_str()), ("token", self.api_key.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CollaboratorError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::decode(SERVICE, e))?;
        let Value::Array(items) = body else {
            return Err(CollaboratorError::decode(SERVICE, "expected a JSON array of news items"));
        };

        // Items with the wrong shape are skipped, not fatal for the batch.
        let total = items.len();
        let out: Vec<RawNewsItem> = items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();
        if out.len() < total {
            tracing::debug!(target: "ingest", skipped = total - out.len(), "undecodable provider items");
        }

        histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        SERVICE
    }
}
