// src/analyze/prompt.rs
use crate::record::Record;

pub const SYSTEM_PROMPT: &str = "You are a professional equity research analyst. \
Always respond with a single JSON object and use English.";

const INSTRUCTIONS: &str = "Return a JSON object with exactly these fields:\n\
- sentiment: one of ['bullish', 'bearish', 'neutral']\n\
- confidence: a number between 0 and 1\n\
- summary: in English, 3-6 sentences, clearly explaining the key events, background, \
and the logical chain from the news to the business fundamentals or industry context.\n\
- impact: in English, 2-4 sentences, concretely describing the potential impact on the \
related stocks. Cover short-term and/or medium-term effects, and mention drivers such as \
earnings outlook, valuation, sentiment, liquidity, or macro factors when relevant.\n\
- risks: an array of English strings. Each element is one specific risk or uncertainty \
(for example: 'regulatory approval risk', 'integration risk', 'demand slowdown risk'). \
Prefer 2-4 concise and concrete items when possible.\n";

/// Render the user prompt for one record. `article_text` is the extracted page
/// text, already cut to budget; without it the provider summary stands alone.
pub fn build_prompt(record: &Record, article_text: Option<&str>) -> String {
    let related = if record.related_symbols.is_empty() {
        "N/A".to_string()
    } else {
        record.related_symbols.join(", ")
    };

    let mut info = vec![
        format!("Title: {}", record.headline),
        format!("Source: {}", record.source),
        format!("URL: {}", record.url),
        format!("Related symbols: {related}"),
        String::new(),
        format!("Provider summary: {}", record.summary),
    ];
    if let Some(text) = article_text.filter(|t| !t.trim().is_empty()) {
        info.push(String::new());
        info.push("Full article text:".to_string());
        info.push(text.to_string());
    }

    format!(
        "You are a professional equity research analyst.\n\
         Based on the following news article, provide a detailed, actionable analysis for stock traders.\n\n\
         {}\n\n{INSTRUCTIONS}",
        info.join("\n")
    )
}
