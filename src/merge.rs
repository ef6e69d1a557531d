//! # Merger
//! Reconciles freshly fetched records with the stored collection.
//!
//! Policy: identity is `id`, incoming wins (last write wins within a batch too),
//! but a re-fetched record without enrichment inherits the stored one's
//! enrichment. Records older than the retention window are dropped from both
//! sides. Output is newest-first with `id` ascending as tiebreak, capped at
//! `max_items` (the oldest are evicted first).

use std::cmp::Reverse;
use std::collections::HashMap;

use tracing::debug;

use crate::record::Record;

/// Age + size bounds applied on every merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age_secs: i64,
    pub max_items: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age_secs: 365 * 24 * 3600,
            max_items: 1000,
        }
    }
}

pub fn reconcile(
    existing: Vec<Record>,
    incoming: Vec<Record>,
    now: i64,
    policy: &RetentionPolicy,
) -> Vec<Record> {
    let existing_len = existing.len();
    let incoming_len = incoming.len();

    let mut by_id: HashMap<String, Record> = HashMap::with_capacity(existing_len + incoming_len);
    for r in existing {
        if r.validate().is_err() || r.is_expired(now, policy.max_age_secs) {
            continue;
        }
        by_id.insert(r.id.clone(), r);
    }

    let mut preserved = 0usize;
    for mut r in incoming {
        if r.validate().is_err() || r.is_expired(now, policy.max_age_secs) {
            continue;
        }
        if r.enrichment.is_none() {
            if let Some(prev) = by_id.get_mut(&r.id) {
                if let Some(e) = prev.enrichment.take() {
                    r.enrichment = Some(e);
                    preserved += 1;
                }
            }
        }
        by_id.insert(r.id.clone(), r);
    }

    let mut out: Vec<Record> = by_id.into_values().collect();
    out.sort_by(|a, b| {
        Reverse(a.published_at)
            .cmp(&Reverse(b.published_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    let before_cap = out.len();
    out.truncate(policy.max_items);

    debug!(
        target: "merge",
        existing = existing_len,
        incoming = incoming_len,
        preserved_enrichment = preserved,
        evicted_for_size = before_cap - out.len(),
        kept = out.len(),
        "reconciled"
    );
    out
}
