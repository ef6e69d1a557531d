// src/analyze/article.rs
//! Full-article text for richer prompts. Best effort: any failure means the
//! prompt falls back to the provider summary.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CollaboratorError;
use crate::ingest::clean_text;

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

static RE_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<script\b[^>]*>.*?</script>|<style\b[^>]*>.*?</style>|<noscript\b[^>]*>.*?</noscript>|<!--.*?-->",
    )
    .expect("static regex")
});
static RE_ARTICLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<article\b[^>]*>(.*)</article>").expect("static regex"));
static RE_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*)</body>").expect("static regex"));
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("static regex"));

/// Source of article text for a URL.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Option<String>;
}

pub struct ArticleFetcher {
    http: reqwest::Client,
    char_budget: usize,
}

impl ArticleFetcher {
    pub fn new(timeout: Duration, char_budget: usize) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_UA)
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()?;
        Ok(Self { http, char_budget })
    }

    async fn fetch_html(&self, url: &str) -> Result<String, CollaboratorError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(CollaboratorError::Status {
                service: "article",
                status: status.as_u16(),
                body: String::new(),
            });
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl ArticleSource for ArticleFetcher {
    async fn fetch_text(&self, url: &str) -> Option<String> {
        let html = match self.fetch_html(url).await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(target: "analyze", url, error = %e, "article fetch failed; using summary-only prompt");
                return None;
            }
        };
        let text = extract_main_text(&html)?;
        let chars = text.chars().count();
        if chars > self.char_budget {
            tracing::debug!(target: "analyze", url, from = chars, to = self.char_budget, "truncating article text");
        }
        Some(truncate_chars(&text, self.char_budget))
    }
}

/// Readable text of a page: `<article>` content if present, else `<body>`, else
/// the whole document; scripts/styles/comments removed, entities decoded,
/// whitespace collapsed. `None` when nothing readable is left.
pub fn extract_main_text(html: &str) -> Option<String> {
    let cleaned = RE_NOISE.replace_all(html, " ");

    let candidates = [
        RE_ARTICLE.captures(&cleaned).and_then(|c| c.get(1)).map(|m| m.as_str()),
        RE_BODY.captures(&cleaned).and_then(|c| c.get(1)).map(|m| m.as_str()),
        Some(cleaned.as_ref()),
    ];
    let text = candidates
        .into_iter()
        .flatten()
        .map(|fragment| clean_text(&RE_TAGS.replace_all(fragment, " ")))
        .find(|t| !t.is_empty());
    text
}

/// Cut to at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
