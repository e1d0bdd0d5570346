//! Headless Chrome backend for the PDF renderer.

use super::{BrowserLauncher, BrowserSession, PageSettings};
use crate::error::RenderError;
use headless_chrome::protocol::cdp::Emulation;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;

/// Extra flags for running Chromium inside containers. The OS-level sandbox
/// is disabled separately through `LaunchOptions::sandbox`.
pub const CHROMIUM_ARGS: &[&str] = &[
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
];

/// Launches a fresh Chromium process per render.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    executable: PathBuf,
}

impl ChromeLauncher {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl BrowserLauncher for ChromeLauncher {
    fn launch(&self, settings: &PageSettings) -> Result<Box<dyn BrowserSession>, RenderError> {
        tracing::debug!("PDF: launching {}", self.executable.display());

        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .path(Some(self.executable.clone()))
            .window_size(Some((settings.viewport_width, settings.viewport_height)))
            .args(CHROMIUM_ARGS.iter().map(OsStr::new).collect())
            // Must outlast the navigation timeout or the driver drops the connection first
            .idle_browser_timeout(settings.navigation_timeout + Duration::from_secs(30))
            .build()
            .map_err(|e| RenderError::Launch(format!("invalid launch options: {}", e)))?;

        let browser = Browser::new(options).map_err(|e| {
            RenderError::Launch(format!(
                "{} (executable: {})",
                e,
                self.executable.display()
            ))
        })?;

        Ok(Box::new(ChromeSession {
            browser: Some(browser),
        }))
    }
}

struct ChromeSession {
    browser: Option<Browser>,
}

impl BrowserSession for ChromeSession {
    fn print_pdf(&mut self, url: &str, settings: &PageSettings) -> Result<Vec<u8>, RenderError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| RenderError::Aborted("browser already closed".to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| RenderError::Launch(format!("failed to open tab: {}", e)))?;
        tab.set_default_timeout(settings.navigation_timeout);

        let navigation_error = |e: anyhow::Error| RenderError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };
        tab.navigate_to(url).map_err(navigation_error)?;
        // Returns on the `networkAlmostIdle` lifecycle event (at most two open requests)
        tab.wait_until_navigated().map_err(navigation_error)?;

        // Print stylesheets (e.g. `.no-print` rules) only apply under print media
        tab.call_method(Emulation::SetEmulatedMedia {
            media: Some("print".to_string()),
            features: None,
        })
        .map_err(|e| RenderError::Print(format!("print media emulation failed: {}", e)))?;

        tab.print_to_pdf(Some(pdf_options(settings)))
            .map_err(|e| RenderError::Print(e.to_string()))
    }

    fn close(&mut self) {
        // Dropping the Browser kills the Chromium process
        if let Some(browser) = self.browser.take() {
            drop(browser);
        }
    }
}

fn pdf_options(settings: &PageSettings) -> PrintToPdfOptions {
    PrintToPdfOptions {
        print_background: Some(settings.print_background),
        paper_width: Some(settings.paper_width),
        paper_height: Some(settings.paper_height),
        margin_top: Some(0.0),
        margin_bottom: Some(0.0),
        margin_left: Some(0.0),
        margin_right: Some(0.0),
        prefer_css_page_size: Some(false),
        ..Default::default()
    }
}
