//! Command-line interface.

use crate::config::Config;
use crate::render::DEFAULT_PDF_NAME;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "whatsapp-relay",
    version,
    about = "HTTP relay for sending WhatsApp messages, files and HTML-rendered PDFs"
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Listening port (overrides PORT and the config file)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the WhatsApp session and the HTTP API (default)
    Serve,

    /// Render a page to PDF without starting a WhatsApp session
    Render {
        /// Page to render
        url: String,

        /// Output file
        #[arg(short, long, default_value = DEFAULT_PDF_NAME)]
        output: PathBuf,
    },
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.log_json {
            config.log_json = true;
        }
    }

    pub fn action(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_is_default() {
        let cli = Cli::try_parse_from(["whatsapp-relay"]).unwrap();
        assert_eq!(cli.action(), Command::Serve);
        assert!(cli.port.is_none());
    }

    #[test]
    fn test_render_with_output() {
        let cli = Cli::try_parse_from([
            "whatsapp-relay",
            "render",
            "http://localhost/invoice/42",
            "-o",
            "invoice.pdf",
        ])
        .unwrap();
        assert_eq!(
            cli.action(),
            Command::Render {
                url: "http://localhost/invoice/42".to_string(),
                output: PathBuf::from("invoice.pdf"),
            }
        );
    }

    #[test]
    fn test_render_default_output() {
        let cli = Cli::try_parse_from(["whatsapp-relay", "render", "http://x"]).unwrap();
        match cli.action() {
            Command::Render { output, .. } => assert_eq!(output, PathBuf::from("document.pdf")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_overrides_apply() {
        let cli = Cli::try_parse_from(["whatsapp-relay", "--port", "9000", "--log-json"]).unwrap();
        let mut config = Config::load_with_env(None, |_| None).unwrap();
        cli.apply(&mut config);
        assert_eq!(config.port, 9000);
        assert!(config.log_json);
    }
}
