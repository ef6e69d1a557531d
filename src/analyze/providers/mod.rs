// src/analyze/providers/mod.rs
pub mod gemini;
pub mod openai;

use crate::error::CollaboratorError;

/// Map a non-success response to `CollaboratorError::Status`, keeping a short body excerpt.
pub(crate) async fn status_error(service: &'static str, resp: reqwest::Response) -> CollaboratorError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    CollaboratorError::Status {
        service,
        status,
        body: body.chars().take(300).collect(),
    }
}
