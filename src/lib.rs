// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod merge;
pub mod record;
pub mod store;

// Provider-facing ingestion (raw items → records → store)
pub mod ingest;

// Enrichment pipeline (selection, AI adapter, application)
pub mod analyze;

// ---- Re-exports for stable public API ----
pub use crate::analyze::ai_adapter::{build_enricher, Enricher};
pub use crate::analyze::{apply, run_enrichment, select, AnalyzeReport, EnrichOptions};
pub use crate::config::Settings;
pub use crate::error::{CollaboratorError, StoreError, ValidationError};
pub use crate::ingest::{run_sync, SyncReport};
pub use crate::merge::{reconcile, RetentionPolicy};
pub use crate::record::{Enrichment, Record, Sentiment};
pub use crate::store::{LoadPolicy, NewsStore};
