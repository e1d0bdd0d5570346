//! Configuration
//!
//! Built-in defaults, then an optional TOML file, then the two supported
//! environment variables (`PORT`, `PUPPETEER_EXECUTABLE_PATH`). CLI flags are
//! applied on top by the binary.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_CHROMIUM_PATH: &str = "/usr/bin/chromium";
pub const DEFAULT_SESSION_DIR: &str = "./whatsapp-session";

/// Environment variable holding the listening port.
pub const PORT_ENV: &str = "PORT";
/// Environment variable holding the Chromium executable path.
pub const CHROMIUM_ENV: &str = "PUPPETEER_EXECUTABLE_PATH";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub bind: String,
    pub chromium_path: PathBuf,
    /// Where the session engine persists its credentials
    pub session_dir: PathBuf,
    pub fetch_timeout_secs: u64,
    pub render_timeout_secs: u64,
    pub log_level: String,
    pub log_json: bool,
    /// Daily rolling log files are written here when set
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from defaults, `file` (if given) and the process
    /// environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with_env(file, |key| std::env::var(key).ok())
    }

    pub(crate) fn load_with_env(
        file: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("bind", DEFAULT_BIND)?
            .set_default("chromium_path", DEFAULT_CHROMIUM_PATH)?
            .set_default("session_dir", DEFAULT_SESSION_DIR)?
            .set_default("fetch_timeout_secs", 30_i64)?
            .set_default("render_timeout_secs", 30_i64)?
            .set_default("log_level", "info")?
            .set_default("log_json", false)?;

        if let Some(path) = file {
            tracing::debug!("Loading config file: {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .set_override_option("port", env(PORT_ENV))?
            .set_override_option("chromium_path", env(CHROMIUM_ENV))?
            .build()
            .context("Failed to load configuration")?
            .try_deserialize::<Config>()
            .context("Invalid configuration")?;

        Ok(config)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.bind, self.port))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}
