//! # News records
//! One news item plus its optional, versioned enrichment payload.
//!
//! On-disk shape (one element of the store's JSON array):
//! ```json
//! {
//!   "id": "7281734", "headline": "...", "summary": "...", "url": "https://...",
//!   "source": "Reuters", "image": "", "relatedSymbols": ["AAPL"], "publishedAt": 1717171717,
//!   "analysis": { "version": 2, "generatedAt": 1717172000, "sentiment": "bullish",
//!                 "confidence": 0.8, "summary": "...", "impact": "...", "risks": ["..."] }
//! }
//! ```
//! Enrichment payloads are decoded leniently: a malformed `analysis` object never
//! fails a load, it just normalizes to defaults (and `version` 0, which is always
//! eligible for re-enrichment).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Fallback confidence when the source omits it or sends garbage.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub image: String,
    /// Display order as delivered by the provider.
    #[serde(default)]
    pub related_symbols: Vec<String>,
    /// Unix seconds.
    pub published_at: i64,
    #[serde(rename = "analysis", default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Enrichment>,
}

impl Record {
    /// Ingestion-time validity: identity, headline and url must be present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.headline.trim().is_empty() {
            return Err(ValidationError::MissingHeadline);
        }
        if self.url.trim().is_empty() {
            return Err(ValidationError::MissingUrl);
        }
        Ok(())
    }

    /// `now - published_at > max_age`; saturating so far-future stamps never expire.
    pub fn is_expired(&self, now: i64, max_age_secs: i64) -> bool {
        now.saturating_sub(self.published_at) > max_age_secs
    }

    pub fn schema_version(&self) -> Option<u32> {
        self.enrichment.as_ref().map(|e| e.schema_version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Sentiment {
    /// Case-insensitive; anything unrecognized is `Neutral`.
    pub fn from_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullish" => Sentiment::Bullish,
            "bearish" => Sentiment::Bearish,
            _ => Sentiment::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Bullish => "bullish",
            Sentiment::Bearish => "bearish",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized analysis fields, as produced by an enricher after decode-with-defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AnalysisFields {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub summary: String,
    pub impact: String,
    pub risks: Vec<String>,
}

impl AnalysisFields {
    /// Decode a loosely-typed JSON object. Never fails; every field has a fallback:
    /// - `sentiment`: any scalar, unknown → `neutral`
    /// - `confidence`: number or numeric string, missing/NaN → 0.5, clamped to [0, 1]
    /// - `summary` / `impact`: any scalar stringified and trimmed, else empty
    /// - `risks`: array (stringified, trimmed, empties dropped) or newline-separated string
    pub fn from_value(v: &Value) -> Self {
        let sentiment = v
            .get("sentiment")
            .and_then(scalar_to_string)
            .map(|s| Sentiment::from_loose(&s))
            .unwrap_or_default();

        let confidence = clamp_confidence(v.get("confidence").and_then(number_from_value));

        let summary = v
            .get("summary")
            .and_then(scalar_to_string)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        let impact = v
            .get("impact")
            .and_then(scalar_to_string)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        let risks = v.get("risks").map(risks_from_value).unwrap_or_default();

        Self {
            sentiment,
            confidence,
            summary,
            impact,
            risks,
        }
    }
}

/// Missing or non-finite → `DEFAULT_CONFIDENCE`; otherwise clamped to [0, 1].
pub fn clamp_confidence(raw: Option<f64>) -> f64 {
    match raw {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

pub fn risks_from_value(v: &Value) -> Vec<String> {
    match v {
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_to_string)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn number_from_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Versioned enrichment payload, persisted under `analysis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct Enrichment {
    #[serde(rename = "version")]
    pub schema_version: u32,
    pub generated_at: i64,
    pub sentiment: Sentiment,
    pub confidence: f64,
    #[serde(rename = "summary")]
    pub narrative_summary: String,
    pub impact: String,
    pub risks: Vec<String>,
}

impl Enrichment {
    pub fn new(schema_version: u32, generated_at: i64, fields: AnalysisFields) -> Self {
        Self {
            schema_version,
            generated_at,
            sentiment: fields.sentiment,
            confidence: clamp_confidence(Some(fields.confidence)),
            narrative_summary: fields.summary,
            impact: fields.impact,
            risks: fields.risks,
        }
    }
}

impl From<Value> for Enrichment {
    fn from(v: Value) -> Self {
        // Legacy payloads without a version decode as version 0.
        let schema_version = v
            .get("version")
            .and_then(number_from_value)
            .filter(|n| *n >= 0.0)
            .map(|n| n.min(f64::from(u32::MAX)) as u32)
            .unwrap_or(0);
        let generated_at = v
            .get("generatedAt")
            .and_then(number_from_value)
            .map(|n| n as i64)
            .unwrap_or(0);
        Enrichment::new(schema_version, generated_at, AnalysisFields::from_value(&v))
    }
}
