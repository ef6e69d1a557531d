// src/ingest/types.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CollaboratorError, ValidationError};
use crate::record::{number_from_value, Record};

/// One item as delivered by a news provider, before validation.
///
/// Field names follow Finnhub's `/news` payload; the store's own names are
/// accepted as aliases so previously exported records can be re-ingested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNewsItem {
    /// Number or string; absent/null means the provider gave no identity.
    #[serde(default)]
    pub id: Option<Value>,
    /// Unix seconds, integer or float.
    #[serde(default, alias = "publishedAt")]
    pub datetime: Option<Value>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// List of symbols, or a comma-separated string.
    #[serde(default, alias = "relatedSymbols")]
    pub related: Option<Value>,
}

impl RawNewsItem {
    /// Float timestamps are truncated to whole seconds.
    pub fn published_at(&self) -> Option<i64> {
        self.datetime
            .as_ref()
            .and_then(number_from_value)
            .filter(|n| n.is_finite())
            .map(|n| n.trunc() as i64)
    }

    pub fn native_id(&self) -> Option<String> {
        let id = match self.id.as_ref()? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!id.is_empty()).then_some(id)
    }

    pub fn related_symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |s: &str| {
            let s = s.trim();
            if !s.is_empty() && !out.iter().any(|x| x == s) {
                out.push(s.to_string());
            }
        };
        match &self.related {
            Some(Value::Array(items)) => {
                for it in items {
                    if let Value::String(s) = it {
                        push(s.as_str());
                    }
                }
            }
            Some(Value::String(s)) => s.split(',').for_each(&mut push),
            _ => {}
        }
        out
    }

    /// Build a `Record`; `fallback_id` is used only when the provider sent no id.
    pub fn into_record(self, fallback_id: impl FnOnce(i64) -> String) -> Result<Record, ValidationError> {
        let published_at = self.published_at().ok_or(ValidationError::MissingPublishedAt)?;
        let headline = super::clean_text(self.headline.as_deref().unwrap_or_default());
        if headline.is_empty() {
            return Err(ValidationError::MissingHeadline);
        }
        let url = self.url.as_deref().unwrap_or_default().trim().to_string();
        if url.is_empty() {
            return Err(ValidationError::MissingUrl);
        }
        let id = self.native_id().unwrap_or_else(|| fallback_id(published_at));
        let related_symbols = self.related_symbols();

        Ok(Record {
            id,
            headline,
            summary: super::clean_text(self.summary.as_deref().unwrap_or_default()),
            url,
            source: self.source.unwrap_or_default().trim().to_string(),
            image: self.image.unwrap_or_default().trim().to_string(),
            related_symbols,
            published_at,
            enrichment: None,
        })
    }
}

/// Fetch collaborator: returns the provider's latest raw items.
#[async_trait::async_trait]
pub trait NewsFetcher: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<RawNewsItem>, CollaboratorError>;
    fn name(&self) -> &'static str;
}
