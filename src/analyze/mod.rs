// src/analyze/mod.rs
//! Enrichment pipeline: pick records that need (re-)analysis, call the AI
//! collaborator, and stamp results back onto the store's records.
//!
//! Order per run:
//! 1) load the store (only store errors abort)
//! 2) `select` eligible records in stored order, up to the per-run quota
//! 3) for each: optional article text → prompt → enricher → `normalize_output`
//! 4) `apply` results one at a time on the single in-memory collection
//! 5) save (once at the end, or after each applied result in `save_each` mode)

pub mod ai_adapter;
pub mod article;
pub mod prompt;
pub mod providers;

use std::time::Duration;

use futures::StreamExt;
use metrics::counter;
use tracing::{debug, info, warn};

use crate::analyze::ai_adapter::{normalize_output, Enricher};
use crate::analyze::article::ArticleSource;
use crate::analyze::prompt::build_prompt;
use crate::config::AnalyzeSettings;
use crate::error::{CollaboratorError, StoreError};
use crate::record::{AnalysisFields, Enrichment, Record};
use crate::store::NewsStore;

/// Needs enrichment: has a usable url, and no enrichment or an older schema version.
pub fn is_eligible(record: &Record, current_version: u32) -> bool {
    if record.url.trim().is_empty() {
        return false;
    }
    match &record.enrichment {
        None => true,
        Some(e) => e.schema_version < current_version,
    }
}

/// Eligible records in their existing order, first `quota` only. Records beyond
/// the quota stay eligible and keep their priority on the next run.
pub fn select(records: &[Record], current_version: u32, quota: usize) -> Vec<&Record> {
    records
        .iter()
        .filter(|r| is_eligible(r, current_version))
        .take(quota)
        .collect()
}

/// New enrichment stamped with `current_version` and `now`; other fields untouched.
///
/// A stored enrichment from a newer schema is never replaced by an older one.
pub fn apply(record: &Record, fields: AnalysisFields, current_version: u32, now: i64) -> Record {
    let mut out = record.clone();
    if let Some(v) = record.schema_version().filter(|v| *v > current_version) {
        warn!(
            target: "analyze",
            id = %record.id,
            stored_version = v,
            current_version,
            "not downgrading enrichment from a newer schema"
        );
        return out;
    }
    out.enrichment = Some(Enrichment::new(current_version, now, fields));
    out
}

/// Run options, usually derived from `AnalyzeSettings`.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub schema_version: u32,
    pub quota: usize,
    pub concurrency: usize,
    pub pause: Duration,
    pub request_timeout: Duration,
    pub save_each: bool,
}

impl From<&AnalyzeSettings> for EnrichOptions {
    fn from(s: &AnalyzeSettings) -> Self {
        Self {
            schema_version: s.schema_version,
            quota: s.max_per_run,
            concurrency: s.concurrency.max(1),
            pause: Duration::from_millis(s.pause_ms),
            request_timeout: Duration::from_secs(s.request_timeout_secs),
            save_each: s.save_each,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnalyzeReport {
    pub eligible: usize,
    pub selected: usize,
    pub enriched: usize,
    pub failed: usize,
}

/// One enrichment pass over the store. Collaborator failures are logged and
/// skipped; the record keeps its previous state and is retried next run.
pub async fn run_enrichment(
    store: &NewsStore,
    enricher: &dyn Enricher,
    articles: Option<&dyn ArticleSource>,
    opts: &EnrichOptions,
) -> Result<AnalyzeReport, StoreError> {
    let mut records = store.load()?;

    let eligible = records
        .iter()
        .filter(|r| is_eligible(r, opts.schema_version))
        .count();
    // Same order and quota as `select`, keyed by position so duplicate ids in a
    // hand-edited store still land on the record that was sent.
    let jobs: Vec<(usize, Record)> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| is_eligible(r, opts.schema_version))
        .take(opts.quota)
        .map(|(i, r)| (i, r.clone()))
        .collect();
    let mut report = AnalyzeReport {
        eligible,
        selected: jobs.len(),
        ..Default::default()
    };
    counter!("analyze_selected_total").increment(jobs.len() as u64);

    if jobs.is_empty() {
        info!(target: "analyze", version = opts.schema_version, "no items to analyze");
        return Ok(report);
    }
    info!(
        target: "analyze",
        provider = enricher.name(),
        eligible,
        selected = jobs.len(),
        quota = opts.quota,
        version = opts.schema_version,
        "start analyzing"
    );

    let total = jobs.len();

    let mut results = std::pin::pin!(futures::stream::iter(jobs.into_iter().enumerate())
        .map(move |(n, (idx, job))| async move {
            debug!(target: "analyze", "[{}/{}] id={} url={}", n + 1, total, job.id, job.url);
            let res = enrich_one(&job, enricher, articles, opts.request_timeout).await;
            if !opts.pause.is_zero() && n + 1 < total {
                tokio::time::sleep(opts.pause).await;
            }
            (idx, job.id, res)
        })
        .buffered(opts.concurrency.max(1)));

    while let Some((idx, id, res)) = results.next().await {
        let fields = match res {
            Ok(f) => f,
            Err(e) => {
                warn!(target: "analyze", id = %id, error = %e, "enrichment failed; skipping");
                counter!("analyze_failed_total").increment(1);
                report.failed += 1;
                continue;
            }
        };
        debug!(
            target: "analyze",
            id = %id,
            sentiment = %fields.sentiment,
            confidence = fields.confidence,
            risks = fields.risks.len(),
            "parsed analysis"
        );
        let now = chrono::Utc::now().timestamp();
        records[idx] = apply(&records[idx], fields, opts.schema_version, now);
        report.enriched += 1;
        counter!("analyze_enriched_total").increment(1);

        if opts.save_each {
            store.save(&records)?;
        }
    }

    if report.enriched > 0 && !opts.save_each {
        store.save(&records)?;
    }

    info!(
        target: "analyze",
        enriched = report.enriched,
        failed = report.failed,
        "analysis finished"
    );
    Ok(report)
}

async fn enrich_one(
    record: &Record,
    enricher: &dyn Enricher,
    articles: Option<&dyn ArticleSource>,
    timeout: Duration,
) -> Result<AnalysisFields, CollaboratorError> {
    let article_text = match articles {
        Some(src) => src.fetch_text(&record.url).await,
        None => None,
    };
    if articles.is_some() && article_text.is_none() {
        debug!(target: "analyze", id = %record.id, "no article text; summary-only prompt");
    }
    let prompt = build_prompt(record, article_text.as_deref());

    let raw = tokio::time::timeout(timeout, enricher.complete(&prompt))
        .await
        .map_err(|_| CollaboratorError::Timeout(enricher.name()))??;
    Ok(normalize_output(&raw))
}
