//! Error types for the MoodTune client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for client operations.
///
/// Variants fall into two classes: authentication errors, which end in a
/// redirect to the entry point, and fetch errors, which stay inside the panel
/// or orchestrator that issued the call.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend rejected the attached credential.
    #[error("credential rejected by backend")]
    Unauthorized,

    /// The redirect callback arrived without a usable token.
    #[error("authentication handoff failed: {0}")]
    HandoffFailed(String),

    /// Transport or body decoding failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status other than 401/403.
    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// One of the concurrent calls of an orchestration round failed.
    #[error("orchestration round failed: {0}")]
    PartialRoundFailure(#[source] Box<Error>),

    /// Time range value outside the accepted set.
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    /// Credential persistence failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that must invalidate the session.
    pub fn is_auth(&self) -> bool {
        match self {
            Error::Unauthorized | Error::HandoffFailed(_) => true,
            Error::PartialRoundFailure(inner) => inner.is_auth(),
            _ => false,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::HandoffFailed(_) | Error::InvalidTimeRange(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
