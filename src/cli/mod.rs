//! Command-line interface for odtmerge.
//!
//! # Commands
//!
//! - `render` - render a template document against a JSON context
//! - `tags` - list the template tags of a document and where they will expand
//!
//! # Global options
//!
//! - `-v, --verbose` - debug logging of every render stage
//! - `-q, --quiet` - only errors
//! - `-c, --config <FILE>` - renderer configuration; defaults to
//!   `odtmerge.toml` in the current directory when present
//!
//! Without `--verbose` or `--quiet`, `RUST_LOG` selects the log level.
//!
//! ```bash
//! odtmerge render invoice.odt out/invoice-42.odt --context invoice-42.json
//! odtmerge -v tags invoice.odt
//! odtmerge tags invoice.odt --format json
//! ```

mod render;
mod tags;


pub use render::RenderCommand;
pub use tags::{OutputFormat, TagsCommand};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::RenderConfig;

/// Configuration file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "odtmerge.toml";

/// Runtime options shared by all commands.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` leaves `RUST_LOG` in charge
    pub log_level: Option<String>,
    /// Suppress informational output
    pub quiet: bool,
}

#[derive(Parser, Debug)]
#[command(
    name = "odtmerge",
    about = "Render OpenDocument text templates",
    version,
    long_about = "odtmerge fills template fields of .odt documents with data from a JSON context, \
                  expanding loops and conditions over paragraphs, table rows and cells."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the renderer configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template document
    Render(RenderCommand),

    /// List the template tags of a document
    Tags(TagsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        init_logging(config.log_level.as_deref());

        let render_config = match &self.config {
            Some(path) => RenderConfig::load_from(path).await?,
            None => RenderConfig::load_with_optional(Some(PathBuf::from(DEFAULT_CONFIG_FILE))).await?,
        };

        match self.command {
            Commands::Render(cmd) => cmd.execute(render_config, &config).await,
            Commands::Tags(cmd) => cmd.execute(render_config, &config).await,
        }
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            quiet: self.quiet,
        }
    }
}

/// Install the stderr log subscriber.
///
/// `level` overrides `RUST_LOG`; without either, warnings and errors are shown.
fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
