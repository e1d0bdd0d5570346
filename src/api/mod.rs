//! HTTP API
//!
//! JSON endpoints for session status, pairing and message delivery, plus a
//! standalone HTML-to-PDF endpoint. No authentication: the service is meant
//! to sit behind a trusted network boundary.

mod handlers;
mod types;


pub use types::*;

use crate::fetch::ContentFetcher;
use crate::messaging::MessagingClient;
use crate::render::PdfRenderer;
use crate::session::SessionView;
use axum::Router;
use axum::routing::{get, post};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub session: SessionView,
    pub messenger: Arc<dyn MessagingClient>,
    pub fetcher: ContentFetcher,
    pub renderer: PdfRenderer,
}

/// Method, path and description of every route, logged at startup.
pub const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("GET", "/api/status", "Service status"),
    ("GET", "/api/qr", "Current pairing QR code"),
    ("POST", "/api/sendText", "Send a text message"),
    ("POST", "/api/sendFile", "Send a file from a URL"),
    ("POST", "/api/sendImage", "Send an image from a URL"),
    ("POST", "/api/sendPdf", "Render a page to PDF and send it"),
    ("POST", "/api/generatePdf", "Render a page to PDF and return it"),
];

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(handlers::status))
        .route("/api/qr", get(handlers::qr))
        .route("/api/sendText", post(handlers::send_text))
        .route("/api/sendFile", post(handlers::send_file))
        .route("/api/sendImage", post(handlers::send_image))
        .route("/api/sendPdf", post(handlers::send_pdf))
        .route("/api/generatePdf", post(handlers::generate_pdf))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("WhatsApp relay listening on {}", addr);
    tracing::info!("Available endpoints:");
    for (method, path, description) in ENDPOINTS {
        tracing::info!("  {:<4} {} - {}", method, path, description);
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
