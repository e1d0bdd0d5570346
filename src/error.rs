//! Error Types
//!
//! Per-subsystem errors for the fetcher, renderer and session engine, plus
//! the HTTP-facing [`ApiError`] that maps them onto status codes.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Failure while downloading remote content.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },
}

/// Failure while turning a page into a PDF.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("PDF printing failed: {0}")]
    Print(String),

    #[error("render task aborted: {0}")]
    Aborted(String),
}

/// Failure reported by the messaging session engine.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("WhatsApp client not connected")]
    NotConnected,

    #[error("invalid recipient '{recipient}': {reason}")]
    InvalidRecipient { recipient: String, reason: String },

    #[error("media upload failed: {0}")]
    Upload(String),

    #[error("message delivery failed: {0}")]
    Delivery(String),
}

/// Errors returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed request fields
    #[error("{0}")]
    Validation(String),

    /// Session is not authenticated yet
    #[error("WhatsApp not connected")]
    NotReady,

    /// Fetch, render or send failure from an external engine
    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

impl From<RenderError> for ApiError {
    fn from(e: RenderError) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

impl From<SendError> for ApiError {
    fn from(e: SendError) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
