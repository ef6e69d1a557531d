// src/ingest/mod.rs
pub mod finnhub;
pub mod types;

use crate::error::{CollaboratorError, StoreError, ValidationError};
use crate::ingest::types::{NewsFetcher, RawNewsItem};
use crate::merge::{reconcile, RetentionPolicy};
use crate::record::Record;
use crate::store::NewsStore;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up once a recorder is installed).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Raw items returned by the news provider.");
        describe_counter!(
            "ingest_invalid_total",
            "Raw items dropped for missing headline/url/timestamp."
        );
        describe_counter!(
            "ingest_expired_total",
            "Raw items dropped for being older than the retention window."
        );
        describe_counter!("ingest_provider_errors_total", "Provider fetch/decode errors.");
        describe_gauge!("store_records_total", "Records in the store after the last save.");
        describe_gauge!("ingest_last_run_ts", "Unix ts when the sync last ran.");
    });
}

/// Decode HTML entities, collapse whitespace, trim.
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("static regex"));
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestOutcome {
    pub records: Vec<Record>,
    pub invalid: usize,
    pub expired: usize,
}

/// Turn raw provider items into valid records.
///
/// Expired items are skipped first, so the ordinal in a synthesized id
/// (`"{publishedAt}-{ordinal}"`) counts only retained items. Synthesized ids are
/// not stable across fetches of overlapping windows.
pub fn normalize_batch(now: i64, raw: Vec<RawNewsItem>, max_age_secs: i64) -> IngestOutcome {
    let mut out = IngestOutcome::default();
    for item in raw {
        if let Some(ts) = item.published_at() {
            if now.saturating_sub(ts) > max_age_secs {
                out.expired += 1;
                continue;
            }
        }
        let ordinal = out.records.len();
        match item.into_record(|ts| format!("{ts}-{ordinal}")) {
            Ok(r) => out.records.push(r),
            Err(e) => {
                log_invalid(&e);
                out.invalid += 1;
            }
        }
    }
    out
}

fn log_invalid(e: &ValidationError) {
    tracing::debug!(target: "ingest", error = %e, "dropping raw item");
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub fetched: usize,
    pub valid: usize,
    pub invalid: usize,
    pub expired: usize,
    pub stored: usize,
    /// Set when the provider call failed; the store is left untouched.
    pub fetch_error: Option<CollaboratorError>,
}

/// Load → fetch → normalize → reconcile → save.
///
/// The store is loaded before the provider is called so a corrupt store fails
/// fast. A failed fetch is not fatal: it is logged, reported, and the store file
/// is not rewritten.
pub async fn run_sync(
    fetcher: &dyn NewsFetcher,
    store: &NewsStore,
    policy: &RetentionPolicy,
    now: i64,
) -> Result<SyncReport, StoreError> {
    ensure_metrics_described();

    let existing = store.load()?;
    let mut report = SyncReport::default();

    let raw = match fetcher.fetch_latest().await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(target: "ingest", error = %e, provider = fetcher.name(), "provider error");
            counter!("ingest_provider_errors_total").increment(1);
            report.stored = existing.len();
            report.fetch_error = Some(e);
            return Ok(report);
        }
    };
    report.fetched = raw.len();

    let outcome = normalize_batch(now, raw, policy.max_age_secs);
    report.valid = outcome.records.len();
    report.invalid = outcome.invalid;
    report.expired = outcome.expired;

    let merged = reconcile(existing, outcome.records, now, policy);
    store.save(&merged)?;
    report.stored = merged.len();

    counter!("ingest_items_total").increment(report.fetched as u64);
    counter!("ingest_invalid_total").increment(report.invalid as u64);
    counter!("ingest_expired_total").increment(report.expired as u64);
    gauge!("ingest_last_run_ts").set(now as f64);

    tracing::info!(
        target: "ingest",
        provider = fetcher.name(),
        fetched = report.fetched,
        valid = report.valid,
        invalid = report.invalid,
        expired = report.expired,
        stored = report.stored,
        "sync finished"
    );
    Ok(report)
}
