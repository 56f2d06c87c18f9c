//! Expansion backends.
//!
//! The engine never interprets template syntax itself. After the tree has been
//! rewritten and serialized, the whole document is handed to an
//! [`ExpansionDelegate`] as template source, and the delegate's output is
//! parsed back. A delegate must:
//!
//! - use the same four delimiters the engine scans for ([`ExpansionDelegate::delimiters`]);
//! - escape printed values so the output stays well-formed XML;
//! - render undefined variables as empty text instead of failing;
//! - provide a "safe" form for expressions that must not be escaped again.
//!
//! [`TeraDelegate`] is the built-in backend.

use regex::Regex;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::LazyLock;
use tera::{Context as TeraContext, Tera};

use super::filters;
use super::markdown::{MarkdownFilter, MarkdownMap};
use crate::config::Delimiters;
use crate::core::ExpansionError;

/// Name under which the document source is registered; the `.xml` suffix
/// turns autoescaping on.
pub const TEMPLATE_NAME: &str = "document.xml";

/// Upper bound on undefined variables filled in during one render.
pub const DEFAULT_MAX_UNDEFINED_FILLS: usize = 256;

/// A templating backend the renderer delegates expansion to.
pub trait ExpansionDelegate {
    /// Expand `source` against `context`.
    ///
    /// # Errors
    ///
    /// Returns an [`ExpansionError`] for syntax errors, unknown filters, and
    /// any other failure of the backend.
    fn render(&self, source: &str, context: &Value) -> Result<String, ExpansionError>;

    /// Rewrite a bare expression so its value is printed without escaping.
    fn mark_safe(&self, expression: &str) -> String;

    /// Delimiters of the backend's syntax.
    fn delimiters(&self) -> Delimiters {
        Delimiters::default()
    }
}

/// Expansion with Tera.
///
/// A fresh [`Tera`] instance is built per render with the source registered as
/// [`TEMPLATE_NAME`], [`filters::escape_odf`] as escape function, and the
/// `pad`, `image`, and `markdown` filters.
///
/// Tera has no lenient undefined mode, so a "Variable `x` not found" failure
/// is answered by defining `x` as an empty string in a working copy of the
/// context and rendering again. Subscripts past the end of a list pad it, and
/// attribute lookups through a scalar replace that scalar in the copy.
#[derive(Debug, Clone)]
pub struct TeraDelegate {
    media_dir: PathBuf,
    markdown: MarkdownMap,
    max_undefined_fills: usize,
}

impl Default for TeraDelegate {
    fn default() -> Self {
        Self::new()
    }
}

impl TeraDelegate {
    pub fn new() -> Self {
        Self {
            media_dir: PathBuf::new(),
            markdown: MarkdownMap::default(),
            max_undefined_fills: DEFAULT_MAX_UNDEFINED_FILLS,
        }
    }

    /// Directory the `image` filter resolves file names against.
    #[must_use]
    pub fn with_media_dir(mut self, media_dir: impl Into<PathBuf>) -> Self {
        self.media_dir = media_dir.into();
        self
    }

    /// Element mapping used by the `markdown` filter.
    #[must_use]
    pub fn with_markdown_map(mut self, markdown: MarkdownMap) -> Self {
        self.markdown = markdown;
        self
    }

    #[must_use]
    pub fn with_max_undefined_fills(mut self, max: usize) -> Self {
        self.max_undefined_fills = max;
        self
    }

    fn engine(&self, source: &str) -> tera::Result<Tera> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".xml"]);
        tera.set_escape_fn(filters::escape_odf);
        tera.register_filter("pad", filters::pad);
        tera.register_filter("image", filters::create_image_filter(self.media_dir.clone()));
        tera.register_filter("markdown", MarkdownFilter::new(self.markdown.clone()));
        tera.add_raw_template(TEMPLATE_NAME, source)?;
        Ok(tera)
    }
}

impl ExpansionDelegate for TeraDelegate {
    fn render(&self, source: &str, context: &Value) -> Result<String, ExpansionError> {
        let tera = self.engine(source).map_err(|e| ExpansionError::new(format_tera_error(&e)))?;

        let mut data = match context {
            Value::Object(_) => context.clone(),
            Value::Null => Value::Object(Map::new()),
            _ => return Err(ExpansionError::new("render context must be a JSON object")),
        };

        let mut fills = 0;
        loop {
            let tera_context = TeraContext::from_value(data.clone())
                .map_err(|e| ExpansionError::new(format_tera_error(&e)))?;

            let error = match tera.render(TEMPLATE_NAME, &tera_context) {
                Ok(rendered) => return Ok(rendered),
                Err(error) => error,
            };

            let Some(path) = missing_variable(&error) else {
                return Err(ExpansionError::new(format_tera_error(&error)));
            };
            if fills >= self.max_undefined_fills || !fill_undefined(&mut data, &path) {
                return Err(ExpansionError::new(format_tera_error(&error)));
            }
            fills += 1;
            tracing::debug!("Rendering undefined variable '{}' as empty", path);
        }
    }

    fn mark_safe(&self, expression: &str) -> String {
        format!(" {} | safe ", expression.trim())
    }
}

/// Flatten a Tera error chain into one readable message.
pub fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut messages = Vec::new();
    let mut current: Option<&dyn Error> = Some(error);
    while let Some(err) = current {
        let cleaned = err
            .to_string()
            .replace(&format!("Failed to render '{TEMPLATE_NAME}'"), "")
            .replace(&format!("Failed to parse '{TEMPLATE_NAME}'"), "")
            .replace(&format!("while rendering '{TEMPLATE_NAME}'"), "")
            .trim()
            .to_string();
        if !cleaned.is_empty() && !messages.contains(&cleaned) {
            messages.push(cleaned);
        }
        current = err.source();
    }

    if messages.is_empty() {
        "template syntax error".to_string()
    } else {
        messages.join("\n  → ")
    }
}

static MISSING_VARIABLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Variable `([^`]+)` not found").ok());

static EVALUATED_PATH: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"evaluated version was `([^`]+)`").ok());

/// Lookup path of the variable a "Variable `x` not found" error refers to.
///
/// Subscripted lookups (`rows[0]`) come with the evaluated dotted path
/// (`rows.0`), which is returned instead of the name.
fn missing_variable(error: &tera::Error) -> Option<String> {
    use std::error::Error;

    let missing = MISSING_VARIABLE.as_ref()?;
    let evaluated = EVALUATED_PATH.as_ref()?;
    let mut current: Option<&dyn Error> = Some(error);
    while let Some(err) = current {
        let message = err.to_string();
        if let Some(caps) = missing.captures(&message) {
            let path = evaluated.captures(&message).unwrap_or(caps);
            return path.get(1).map(|m| m.as_str().to_string());
        }
        current = err.source();
    }
    None
}

/// Define the dotted `path` in `data` as an empty string.
///
/// Numeric segments index arrays, which are padded with empty strings up to
/// the index. Missing intermediates are created as arrays or objects
/// depending on the following segment; a scalar in the middle of the path is
/// replaced the same way, since the lookup through it already failed.
/// Returns `false` when nothing can be filled: a non-numeric segment on an
/// array, a path starting at a scalar, or a leaf that already exists.
fn fill_undefined(data: &mut Value, path: &str) -> bool {
    let segments: Vec<&str> = path.split('.').map(str::trim).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return false;
    }

    let mut current = data;
    for (depth, segment) in segments.iter().enumerate() {
        let next = segments.get(depth + 1).copied();
        let slot = match current {
            Value::Object(map) => {
                if next.is_none() {
                    if map.contains_key(*segment) {
                        return false;
                    }
                    map.insert((*segment).to_string(), Value::String(String::new()));
                    return true;
                }
                map.entry((*segment).to_string()).or_insert(Value::Null)
            }
            Value::Array(items) => {
                let Ok(index) = segment.parse::<usize>() else {
                    return false;
                };
                let present = index < items.len();
                if next.is_none() {
                    if present {
                        return false;
                    }
                    items.resize(index + 1, Value::String(String::new()));
                    return true;
                }
                if !present {
                    items.resize(index + 1, Value::String(String::new()));
                }
                &mut items[index]
            }
            _ => return false,
        };
        if !slot.is_object() && !slot.is_array() {
            *slot = container_for(next);
        }
        current = slot;
    }
    false
}

/// Empty container able to hold the `next` path segment.
fn container_for(next: Option<&str>) -> Value {
    match next {
        Some(segment) if segment.parse::<usize>().is_ok() => Value::Array(Vec::new()),
        _ => Value::Object(Map::new()),
    }
}
