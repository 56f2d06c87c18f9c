//! Renderer configuration (`odtmerge.toml`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::templating::MarkdownElement;

/// Default private URL scheme marking hyperlink targets that embed expressions.
pub const DEFAULT_LINK_SCHEME: &str = "secretary";

/// Default marker identifying a markdown filter invocation inside a tag.
pub const DEFAULT_MARKDOWN_MARKER: &str = "|markdown";

/// Default bound on fixed-point passes of each unescape rule.
pub const DEFAULT_MAX_UNESCAPE_PASSES: usize = 1000;

/// The four delimiter strings of the expansion backend's syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delimiters {
    pub block_start: String,
    pub block_end: String,
    pub variable_start: String,
    pub variable_end: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            block_start: "{%".to_string(),
            block_end: "%}".to_string(),
            variable_start: "{{".to_string(),
            variable_end: "}}".to_string(),
        }
    }
}

/// Settings for an [`OdtRenderer`](crate::templating::OdtRenderer).
///
/// Every field has a default, so an empty file (or no file at all) yields a
/// renderer compatible with the built-in Tera backend.
///
/// ```toml
/// link_scheme = "secretary"
/// media_dir = "assets/images"
///
/// [delimiters]
/// block_start = "{%"
/// block_end = "%}"
/// variable_start = "{{"
/// variable_end = "}}"
///
/// [scopes]
/// section = "text:section"
/// "before::section" = "text:section"
///
/// [markdown.strong]
/// replace_with = "text:span"
/// attributes = { "text:style-name" = "Bold" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub delimiters: Delimiters,

    /// URL scheme of `xlink:href` targets whose percent-encoded payload is a
    /// template expression.
    pub link_scheme: String,

    /// Substring that forces a tag to paragraph scope.
    pub markdown_marker: String,

    /// Upper bound on passes of each entity unescape rule.
    pub max_unescape_passes: usize,

    /// Directory the `image` filter resolves file names against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_dir: Option<PathBuf>,

    /// Extra scope names mapped to element names, merged over the defaults.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub scopes: HashMap<String, String>,

    /// Extra `markdown` filter elements keyed by HTML tag, merged over the defaults.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub markdown: HashMap<String, MarkdownElement>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            link_scheme: DEFAULT_LINK_SCHEME.to_string(),
            markdown_marker: DEFAULT_MARKDOWN_MARKER.to_string(),
            max_unescape_passes: DEFAULT_MAX_UNESCAPE_PASSES,
            media_dir: None,
            scopes: HashMap::new(),
            markdown: HashMap::new(),
        }
    }
}

impl RenderConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse render config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// declares an empty delimiter.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read render config from {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid render config in {}", path.display()))
    }

    /// Load from `path` when given and present, defaults otherwise.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load_from(&path).await,
            Some(path) => {
                tracing::debug!("Render config {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        let d = &self.delimiters;
        for (name, value) in [
            ("block_start", &d.block_start),
            ("block_end", &d.block_end),
            ("variable_start", &d.variable_start),
            ("variable_end", &d.variable_end),
        ] {
            if value.is_empty() {
                anyhow::bail!("Delimiter '{name}' must not be empty");
            }
        }
        if self.link_scheme.is_empty() {
            anyhow::bail!("link_scheme must not be empty");
        }
        Ok(())
    }
}
