// tests/enrich_pipeline.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use market_news_enricher::analyze::ai_adapter::MockEnricher;
use market_news_enricher::analyze::article::ArticleSource;
use market_news_enricher::record::AnalysisFields;
use market_news_enricher::{
    run_enrichment, CollaboratorError, EnrichOptions, Enricher, Enrichment, NewsStore, Record,
    Sentiment, StoreError,
};
use serde_json::{json, Value};

fn rec(id: &str, ts: i64, version: Option<u32>) -> Record {
    Record {
        id: id.into(),
        headline: format!("Headline {id}"),
        summary: format!("Summary {id}"),
        url: format!("https://news.example/{id}"),
        source: "Wire".into(),
        image: String::new(),
        related_symbols: vec!["NVDA".into()],
        published_at: ts,
        enrichment: version.map(|v| {
            Enrichment::new(
                v,
                ts + 1,
                AnalysisFields {
                    sentiment: Sentiment::Bearish,
                    confidence: 0.4,
                    summary: "old".into(),
                    impact: "old".into(),
                    risks: vec![],
                },
            )
        }),
    }
}

fn opts(version: u32, quota: usize) -> EnrichOptions {
    EnrichOptions {
        schema_version: version,
        quota,
        concurrency: 1,
        pause: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
        save_each: false,
    }
}

fn seeded_store(records: &[Record]) -> (tempfile::TempDir, NewsStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = NewsStore::new(dir.path().join("top.json"));
    store.save(records).unwrap();
    (dir, store)
}

/// Fails for ids listed in `fail_ids`, echoes the prompt otherwise.
struct ScriptedEnricher {
    fail_ids: Vec<&'static str>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedEnricher {
    fn new(fail_ids: Vec<&'static str>) -> Self {
        Self {
            fail_ids,
            prompts: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl Enricher for ScriptedEnricher {
    async fn complete(&self, prompt: &str) -> Result<Value, CollaboratorError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self
            .fail_ids
            .iter()
            .any(|id| prompt.contains(&format!("Title: Headline {id}\n")))
        {
            return Err(CollaboratorError::EmptyResponse("scripted"));
        }
        Ok(json!({
            "sentiment": "BULLISH",
            "confidence": 1.7,
            "summary": " fresh summary ",
            "impact": "fresh impact",
            "risks": "supply risk\nrate risk"
        }))
    }
    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct SlowEnricher;

#[async_trait]
impl Enricher for SlowEnricher {
    async fn complete(&self, _prompt: &str) -> Result<Value, CollaboratorError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(json!({}))
    }
    fn name(&self) -> &'static str {
        "slow"
    }
}

/// Replaces the store file with a directory mid-run, so the final save cannot land.
struct FileSwappingEnricher {
    path: std::path::PathBuf,
}

#[async_trait]
impl Enricher for FileSwappingEnricher {
    async fn complete(&self, _prompt: &str) -> Result<Value, CollaboratorError> {
        if self.path.is_file() {
            std::fs::remove_file(&self.path).unwrap();
            std::fs::create_dir(&self.path).unwrap();
        }
        Ok(json!({"sentiment": "neutral", "confidence": 0.5}))
    }
    fn name(&self) -> &'static str {
        "swapping"
    }
}

struct CannedArticles(AtomicUsize);

#[async_trait]
impl ArticleSource for CannedArticles {
    async fn fetch_text(&self, url: &str) -> Option<String> {
        self.0.fetch_add(1, Ordering::SeqCst);
        url.ends_with("/a").then(|| "Full body of article a.".to_string())
    }
}

#[tokio::test]
async fn enriches_missing_and_stale_and_normalizes_output() {
    let (_dir, store) = seeded_store(&[
        rec("a", 300, None),
        rec("b", 200, Some(2)),
        rec("c", 100, Some(1)),
    ]);
    let enricher = ScriptedEnricher::new(vec![]);
    let started = chrono::Utc::now().timestamp();

    let report = run_enrichment(&store, &enricher, None, &opts(2, 10)).await.unwrap();
    assert_eq!(report.eligible, 2);
    assert_eq!(report.selected, 2);
    assert_eq!(report.enriched, 2);
    assert_eq!(report.failed, 0);

    let after = store.load().unwrap();
    let ids: Vec<&str> = after.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    for r in [&after[0], &after[2]] {
        let e = r.enrichment.as_ref().unwrap();
        assert_eq!(e.schema_version, 2);
        assert!(e.generated_at >= started);
        assert_eq!(e.sentiment, Sentiment::Bullish);
        assert_eq!(e.confidence, 1.0);
        assert_eq!(e.narrative_summary, "fresh summary");
        assert_eq!(e.risks, vec!["supply risk".to_string(), "rate risk".to_string()]);
    }
    // already current: untouched
    assert_eq!(after[1], rec("b", 200, Some(2)));
}

#[tokio::test]
async fn quota_sweep_resumes_in_stored_order() {
    let records: Vec<Record> = (0..5).map(|i| rec(&format!("r{i}"), 1_000 - i, None)).collect();
    let (_dir, store) = seeded_store(&records);
    let enricher = MockEnricher::default();

    let first = run_enrichment(&store, &enricher, None, &opts(1, 2)).await.unwrap();
    assert_eq!((first.eligible, first.enriched), (5, 2));
    let done: Vec<bool> = store.load().unwrap().iter().map(|r| r.enrichment.is_some()).collect();
    assert_eq!(done, vec![true, true, false, false, false]);

    let second = run_enrichment(&store, &enricher, None, &opts(1, 2)).await.unwrap();
    assert_eq!((second.eligible, second.enriched), (3, 2));
    let done: Vec<bool> = store.load().unwrap().iter().map(|r| r.enrichment.is_some()).collect();
    assert_eq!(done, vec![true, true, true, true, false]);
}

#[tokio::test]
async fn failures_are_skipped_and_retried_next_run() {
    let (_dir, store) = seeded_store(&[rec("a", 300, None), rec("b", 200, Some(1))]);
    let flaky = ScriptedEnricher::new(vec!["a"]);

    let report = run_enrichment(&store, &flaky, None, &opts(2, 10)).await.unwrap();
    assert_eq!(report.enriched, 1);
    assert_eq!(report.failed, 1);
    let after = store.load().unwrap();
    assert!(after[0].enrichment.is_none());
    assert_eq!(after[1].schema_version(), Some(2));

    let healthy = ScriptedEnricher::new(vec![]);
    let retry = run_enrichment(&store, &healthy, None, &opts(2, 10)).await.unwrap();
    assert_eq!((retry.selected, retry.enriched), (1, 1));
    assert_eq!(healthy.prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn zero_successes_leave_file_bytes_unchanged() {
    let (dir, store) = seeded_store(&[rec("a", 300, None), rec("b", 200, Some(1))]);
    let path = dir.path().join("top.json");
    let before = std::fs::read(&path).unwrap();

    let broken = ScriptedEnricher::new(vec!["a", "b"]);
    let report = run_enrichment(&store, &broken, None, &opts(2, 10)).await.unwrap();
    assert_eq!((report.enriched, report.failed), (0, 2));
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn nothing_eligible_is_a_no_op() {
    let (_dir, store) = seeded_store(&[rec("a", 300, Some(3))]);
    let enricher = ScriptedEnricher::new(vec![]);
    let report = run_enrichment(&store, &enricher, None, &opts(3, 10)).await.unwrap();
    assert_eq!(report, Default::default());
    assert!(enricher.prompts.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_enricher_times_out_as_a_skip() {
    let (_dir, store) = seeded_store(&[rec("a", 300, None)]);
    let mut o = opts(1, 10);
    o.request_timeout = Duration::from_secs(2);

    let report = run_enrichment(&store, &SlowEnricher, None, &o).await.unwrap();
    assert_eq!((report.enriched, report.failed), (0, 1));
    assert!(store.load().unwrap()[0].enrichment.is_none());
}

#[tokio::test]
async fn article_text_is_used_when_available() {
    let (_dir, store) = seeded_store(&[rec("a", 300, None), rec("b", 200, None)]);
    let enricher = ScriptedEnricher::new(vec![]);
    let articles = CannedArticles(AtomicUsize::new(0));

    let mut o = opts(1, 10);
    o.concurrency = 2;
    o.save_each = true;
    let report = run_enrichment(&store, &enricher, Some(&articles), &o).await.unwrap();
    assert_eq!(report.enriched, 2);
    assert_eq!(articles.0.load(Ordering::SeqCst), 2);

    let prompts = enricher.prompts.lock().unwrap();
    let with_body = prompts
        .iter()
        .filter(|p| p.contains("Full article text:\nFull body of article a."))
        .count();
    assert_eq!(with_body, 1);
    assert!(prompts.iter().all(|p| p.contains("Related symbols: NVDA")));
}

#[tokio::test]
async fn duplicate_ids_are_each_enriched_once() {
    let (_dir, store) = seeded_store(&[rec("x", 200, None), rec("x", 100, None)]);
    let enricher = MockEnricher::default();

    let first = run_enrichment(&store, &enricher, None, &opts(1, 10)).await.unwrap();
    assert_eq!((first.eligible, first.selected, first.enriched), (2, 2, 2));
    let after = store.load().unwrap();
    assert!(after.iter().all(|r| r.schema_version() == Some(1)));
    assert_eq!(
        after.iter().map(|r| r.published_at).collect::<Vec<_>>(),
        vec![200, 100]
    );

    let second = run_enrichment(&store, &enricher, None, &opts(1, 10)).await.unwrap();
    assert_eq!(second, Default::default());
}

#[tokio::test]
async fn failed_save_is_fatal_and_leaves_no_temp_file() {
    let (dir, store) = seeded_store(&[rec("a", 300, None)]);
    let enricher = FileSwappingEnricher {
        path: dir.path().join("top.json"),
    };

    let err = run_enrichment(&store, &enricher, None, &opts(1, 10)).await.unwrap_err();
    assert!(matches!(err, StoreError::Persistence { .. }), "got {err:?}");

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["top.json".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn pause_runs_between_calls_but_not_after_the_last() {
    let (_dir, store) = seeded_store(&[rec("a", 300, None), rec("b", 200, None)]);
    let mut o = opts(1, 10);
    o.pause = Duration::from_secs(10);

    let started = tokio::time::Instant::now();
    let report = run_enrichment(&store, &MockEnricher::default(), None, &o).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.enriched, 2);
    assert!(elapsed >= Duration::from_secs(10), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(20), "elapsed {elapsed:?}");
}
