//! `odtmerge render`: render a template document into a new file.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::CliConfig;
use crate::config::RenderConfig;
use crate::package::OdtPackage;
use crate::templating::{MediaReport, OdtRenderer};

#[derive(Args, Debug)]
pub struct RenderCommand {
    /// Template document (.odt)
    pub template: PathBuf,

    /// Where to write the rendered document
    pub output: PathBuf,

    /// JSON file holding the render context (an object)
    #[arg(short = 'x', long)]
    pub context: Option<PathBuf>,

    /// Directory the `image` filter resolves names against
    #[arg(long)]
    pub media_dir: Option<PathBuf>,
}

impl RenderCommand {
    pub async fn execute(self, mut config: RenderConfig, cli: &CliConfig) -> Result<()> {
        let context = match &self.context {
            Some(path) => load_context(path).await?,
            None => Value::Object(Map::new()),
        };
        if let Some(media_dir) = self.media_dir {
            config.media_dir = Some(media_dir);
        }

        let template = self.template.clone();
        let output = self.output.clone();
        let report = tokio::task::spawn_blocking(move || render_file(&config, &template, &output, &context))
            .await
            .context("Render task failed")??;

        for failure in &report.failures {
            eprintln!("{}: {}", "warning".yellow(), failure);
        }
        if !cli.quiet {
            println!(
                "{} {} ({} image(s) embedded)",
                "Rendered".green().bold(),
                self.output.display(),
                report.resolved.len()
            );
        }
        Ok(())
    }
}

fn render_file(config: &RenderConfig, template: &Path, output: &Path, context: &Value) -> Result<MediaReport> {
    let renderer = OdtRenderer::with_config(config)?;
    let mut package = OdtPackage::open(template)
        .with_context(|| format!("Failed to open template {}", template.display()))?;
    let report = renderer
        .render_package(&mut package, context)
        .with_context(|| format!("Failed to render {}", template.display()))?;
    package.save(output).with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(report)
}

/// Read a JSON render context; it must be an object.
pub async fn load_context(path: &Path) -> Result<Value> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read context file {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in context file {}", path.display()))?;
    if !value.is_object() {
        anyhow::bail!("Context file {} must contain a JSON object", path.display());
    }
    Ok(value)
}
