//! `odtmerge tags`: show how each template tag of a document will expand.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::CliConfig;
use crate::config::RenderConfig;
use crate::package::{CONTENT_ENTRY, OdtPackage, STYLES_ENTRY};
use crate::templating::{OdtRenderer, TagReport};

#[derive(Args, Debug)]
pub struct TagsCommand {
    /// Template document (.odt)
    pub template: PathBuf,

    /// Output format: text or json
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct PartReport {
    part: &'static str,
    tags: Vec<TagReport>,
}

impl TagsCommand {
    pub async fn execute(self, config: RenderConfig, cli: &CliConfig) -> Result<()> {
        let template = self.template.clone();
        let parts = tokio::task::spawn_blocking(move || -> Result<Vec<PartReport>> {
            let renderer = OdtRenderer::with_config(&config)?;
            let package = OdtPackage::open(&template)
                .with_context(|| format!("Failed to open template {}", template.display()))?;
            Ok(vec![
                PartReport {
                    part: CONTENT_ENTRY,
                    tags: renderer.inspect(package.content()),
                },
                PartReport {
                    part: STYLES_ENTRY,
                    tags: renderer.inspect(package.styles()),
                },
            ])
        })
        .await
        .context("Inspect task failed")??;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&parts)?),
            OutputFormat::Text => print_text(&parts, cli.quiet),
        }
        Ok(())
    }
}

fn print_text(parts: &[PartReport], quiet: bool) {
    for part in parts {
        if part.tags.is_empty() {
            if !quiet {
                println!("{}: no template tags", part.part.bold());
            }
            continue;
        }
        println!("{}:", part.part.bold());
        for tag in &part.tags {
            let hint = tag.hint.as_deref().map(|h| format!(" [{h}]")).unwrap_or_default();
            match (&tag.error, tag.placement, &tag.placeholder) {
                (Some(error), _, _) => {
                    println!("  {:<5} {}{}  {} {}", tag.kind, tag.content, hint, "error:".red(), error);
                }
                (None, Some(placement), Some(placeholder)) => {
                    println!("  {:<5} {}{}  {} <{}>", tag.kind, tag.content, hint, placement, placeholder);
                }
                _ => println!("  {:<5} {}{}", tag.kind, tag.content, hint),
            }
        }
    }
}
