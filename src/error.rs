// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

/// Store-level failures. These are the only errors that abort a run.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reading store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store {path} is corrupt: {source}")]
    CorruptState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("persisting store {path}: {message}")]
    Persistence { path: PathBuf, message: String },
}

/// A raw provider item that cannot become a `Record`. Dropped at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing headline")]
    MissingHeadline,

    #[error("missing url")]
    MissingUrl,

    #[error("missing or non-numeric publish time")]
    MissingPublishedAt,

    #[error("empty id")]
    EmptyId,
}

/// Failure of an external collaborator (news provider, article page, AI service).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} response could not be decoded: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("{0} credentials are not configured")]
    MissingCredentials(&'static str),

    #[error("{0} returned an empty response")]
    EmptyResponse(&'static str),

    #[error("{0} did not answer in time")]
    Timeout(&'static str),
}

impl CollaboratorError {
    pub(crate) fn decode(service: &'static str, message: impl ToString) -> Self {
        Self::Decode {
            service,
            message: message.to_string(),
        }
    }
}
