//! PDF Renderer
//!
//! Drives a headless browser to a URL and prints the page as an A4 PDF with
//! print media emulation and backgrounds enabled. Every render launches its
//! own browser and tears it down before returning; there is no pooling.
//!
//! The browser is held by a [`SessionGuard`] so it is closed exactly once on
//! every exit path, including navigation failures and timeouts.

mod chrome;

pub use chrome::{CHROMIUM_ARGS, ChromeLauncher};

use crate::error::RenderError;
use std::sync::Arc;
use std::time::Duration;

/// Default attachment name for rendered documents.
pub const DEFAULT_PDF_NAME: &str = "document.pdf";

/// Page geometry and timing for a render.
#[derive(Debug, Clone)]
pub struct PageSettings {
    /// Viewport in CSS pixels; 794×1123 is A4 at 96 DPI
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Paper size in inches
    pub paper_width: f64,
    pub paper_height: f64,
    pub print_background: bool,
    pub navigation_timeout: Duration,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            viewport_width: 794,
            viewport_height: 1123,
            paper_width: 8.27,
            paper_height: 11.69,
            print_background: true,
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

impl PageSettings {
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }
}

/// A rendered PDF, ready to attach or stream back.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

impl RenderedDocument {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Starts an isolated browser instance.
pub trait BrowserLauncher: Send + Sync {
    fn launch(&self, settings: &PageSettings) -> Result<Box<dyn BrowserSession>, RenderError>;
}

/// A live browser owned by one render call.
pub trait BrowserSession: Send {
    /// Navigate to `url`, emulate print media and print the page.
    fn print_pdf(&mut self, url: &str, settings: &PageSettings) -> Result<Vec<u8>, RenderError>;

    /// Terminate the browser. Called exactly once by [`SessionGuard`].
    fn close(&mut self);
}

/// Closes the wrapped browser when dropped.
pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    fn print_pdf(&mut self, url: &str, settings: &PageSettings) -> Result<Vec<u8>, RenderError> {
        match self.session.as_mut() {
            Some(session) => session.print_pdf(url, settings),
            None => Err(RenderError::Aborted("browser already closed".to_string())),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
            tracing::debug!("PDF: browser closed");
        }
    }
}

/// Renders URLs to PDF through a [`BrowserLauncher`].
#[derive(Clone)]
pub struct PdfRenderer {
    launcher: Arc<dyn BrowserLauncher>,
    settings: PageSettings,
}

impl PdfRenderer {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, settings: PageSettings) -> Self {
        Self { launcher, settings }
    }

    /// Render `url` to a PDF named `file_name` (or [`DEFAULT_PDF_NAME`]).
    ///
    /// The browser driver is blocking, so the whole launch/print/close cycle
    /// runs on the blocking pool.
    pub async fn render(
        &self,
        url: &str,
        file_name: Option<&str>,
    ) -> Result<RenderedDocument, RenderError> {
        tracing::info!("PDF: generating from {}", url);

        let launcher = self.launcher.clone();
        let settings = self.settings.clone();
        let target = url.to_string();
        let bytes = tokio::task::spawn_blocking(move || {
            render_blocking(launcher.as_ref(), &target, &settings)
        })
        .await
        .map_err(|e| RenderError::Aborted(e.to_string()))??;

        tracing::info!("PDF: generated {} bytes", bytes.len());
        Ok(RenderedDocument {
            bytes,
            file_name: file_name.unwrap_or(DEFAULT_PDF_NAME).to_string(),
        })
    }
}

fn render_blocking(
    launcher: &dyn BrowserLauncher,
    url: &str,
    settings: &PageSettings,
) -> Result<Vec<u8>, RenderError> {
    let mut guard = SessionGuard::new(launcher.launch(settings)?);
    let bytes = guard.print_pdf(url, settings)?;
    if bytes.is_empty() {
        return Err(RenderError::Print("browser returned an empty document".to_string()));
    }
    Ok(bytes)
}
