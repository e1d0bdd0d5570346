use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use whatsapp_relay::api::{self, AppState};
use whatsapp_relay::cli::{Cli, Command};
use whatsapp_relay::config::Config;
use whatsapp_relay::fetch::ContentFetcher;
use whatsapp_relay::logging;
use whatsapp_relay::messaging::whatsapp::WhatsAppEngine;
use whatsapp_relay::render::{ChromeLauncher, PageSettings, PdfRenderer};
use whatsapp_relay::session;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = logging::init(&config)?;

    match cli.action() {
        Command::Serve => run_server(config).await,
        Command::Render { url, output } => run_render(&config, &url, &output).await,
    }
}

async fn run_server(config: Config) -> Result<()> {
    tracing::info!("Starting WhatsApp relay");
    let (tracker, view) = session::channel();

    let engine = WhatsAppEngine::new(&config.session_dir);
    let bot_handle = match engine.start(tracker).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("Failed to start WhatsApp session: {:#}", e);
            return Err(e);
        }
    };

    let state = AppState {
        session: view,
        messenger: Arc::new(engine),
        fetcher: ContentFetcher::new(config.fetch_timeout())
            .context("Failed to build HTTP client")?,
        renderer: pdf_renderer(&config),
    };

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let result = api::serve(listener, state, shutdown_signal()).await;
    bot_handle.abort();
    tracing::info!("WhatsApp relay stopped");
    result.context("HTTP server error")
}

async fn run_render(config: &Config, url: &str, output: &Path) -> Result<()> {
    let file_name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    let document = pdf_renderer(config)
        .render(url, file_name.as_deref())
        .await
        .with_context(|| format!("Failed to render {}", url))?;

    tokio::fs::write(output, &document.bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!("Wrote {} bytes to {}", document.len(), output.display());
    Ok(())
}

fn pdf_renderer(config: &Config) -> PdfRenderer {
    let launcher = ChromeLauncher::new(PathBuf::from(&config.chromium_path));
    let settings = PageSettings::default().with_navigation_timeout(config.render_timeout());
    PdfRenderer::new(Arc::new(launcher), settings)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
