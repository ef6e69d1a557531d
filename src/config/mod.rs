// src/config/mod.rs
//! Run configuration: optional TOML file, then environment overrides.
//!
//! Resolution order for the file:
//! 1) explicit path (CLI `--config`)
//! 2) $NEWS_CONFIG_PATH
//! 3) config/news.toml (if present)
//! 4) built-in defaults
//!
//! TOML shape (all sections optional):
//! ```toml
//! [store]
//! path = "news/top.json"
//! treat_corrupt_as_empty = false
//!
//! [retention]
//! max_items = 1000
//! max_age_secs = 31536000
//!
//! [fetch]
//! category = "general"
//!
//! [analyze]
//! provider = "openai"
//! schema_version = 2
//! max_per_run = 50
//! ```

pub mod ai;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::merge::RetentionPolicy;
use crate::store::{LoadPolicy, NewsStore};

pub use ai::{AiProviderKind, AnalyzeSettings};

const ENV_CONFIG_PATH: &str = "NEWS_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/news.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub retention: RetentionSettings,
    pub fetch: FetchSettings,
    pub analyze: AnalyzeSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub path: PathBuf,
    pub treat_corrupt_as_empty: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("news/top.json"),
            treat_corrupt_as_empty: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionSettings {
    pub max_items: usize,
    pub max_age_secs: i64,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        let p = RetentionPolicy::default();
        Self {
            max_items: p.max_items,
            max_age_secs: p.max_age_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    #[serde(skip_serializing)]
    pub finnhub_api_key: String,
    pub base_url: String,
    pub category: String,
    pub timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            finnhub_api_key: String::new(),
            base_url: "https://finnhub.io/api/v1".to_string(),
            category: "general".to_string(),
            timeout_secs: 15,
        }
    }
}

impl Settings {
    /// Load from file (see module docs) and apply process env overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut cfg = match resolve_path(explicit)? {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Environment wins over the file. Unparsable numbers are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("NEWS_FILE_PATH").filter(|v| !v.trim().is_empty()) {
            self.store.path = PathBuf::from(v.trim());
        }
        if let Some(v) = lookup("NEWS_TREAT_CORRUPT_AS_EMPTY") {
            self.store.treat_corrupt_as_empty = parse_bool(&v);
        }
        if let Some(n) = lookup("NEWS_MAX_ITEMS").and_then(|v| v.trim().parse().ok()) {
            self.retention.max_items = n;
        }
        if let Some(n) = lookup("NEWS_MAX_AGE_SECS").and_then(|v| v.trim().parse().ok()) {
            self.retention.max_age_secs = n;
        }
        if let Some(v) = lookup("FINNHUB_API_KEY") {
            self.fetch.finnhub_api_key = v.trim().to_string();
        }
        if let Some(v) = lookup("FINNHUB_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.fetch.base_url = v.trim().to_string();
        }
        if let Some(v) = lookup("FINNHUB_CATEGORY").filter(|v| !v.trim().is_empty()) {
            self.fetch.category = v.trim().to_string();
        }
        self.analyze.apply_env(&lookup);
    }

    /// Replace nonsensical values with defaults instead of failing.
    pub fn sanitize(&mut self) {
        let d = RetentionSettings::default();
        if self.retention.max_items == 0 {
            self.retention.max_items = d.max_items;
        }
        if self.retention.max_age_secs <= 0 {
            self.retention.max_age_secs = d.max_age_secs;
        }
        if self.fetch.timeout_secs == 0 {
            self.fetch.timeout_secs = FetchSettings::default().timeout_secs;
        }
        self.analyze.sanitize();
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_age_secs: self.retention.max_age_secs,
            max_items: self.retention.max_items,
        }
    }

    pub fn news_store(&self) -> NewsStore {
        let policy = if self.store.treat_corrupt_as_empty {
            LoadPolicy::TreatAsEmpty
        } else {
            LoadPolicy::Strict
        };
        NewsStore::new(&self.store.path).with_policy(policy)
    }
}

fn resolve_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(p) = explicit {
        return Ok(Some(p.to_path_buf()));
    }
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
    Ok(default.exists().then_some(default))
}

pub(crate) fn parse_bool(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
