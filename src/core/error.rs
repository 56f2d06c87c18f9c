//! Error handling for odtmerge
//!
//! Library operations return [`OdtError`], whose variants follow the failure
//! stages of a render call:
//! - [`OdtError::StructuralTag`] - a tag's scope cannot be resolved in the tree
//! - [`OdtError::MalformedOutput`] - expanded text is not well-formed XML
//! - [`OdtError::Expansion`] - the expansion backend rejected the template
//! - [`OdtError::Xml`], [`OdtError::Zip`], [`OdtError::Package`] - reading or
//!   writing the document itself
//!
//! Media failures are not fatal: they are reported per frame as
//! [`MediaResolutionError`] values next to the rendered trees.
//!
//! The CLI converts any error into an [`ErrorContext`] with
//! [`user_friendly_error`], adding details and a suggestion for template
//! authors.

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::xml::XmlError;

/// All failures of a render call.
#[derive(Error, Debug)]
pub enum OdtError {
    /// A tag's placeholder could not be determined.
    ///
    /// Raised when a block tag without a scope hint climbs to the document
    /// node without meeting an ancestor shared with another tag (usually an
    /// unbalanced block), or when a scope hint names an element that is not
    /// an ancestor of the field.
    #[error("Cannot place template tag '{tag}': {reason}")]
    StructuralTag {
        /// The tag's literal template syntax
        tag: String,
        /// What went wrong
        reason: String,
    },

    /// Expansion produced text that is not a well-formed document.
    #[error(transparent)]
    MalformedOutput(#[from] MalformedOutput),

    /// The expansion backend failed (syntax error, unknown filter, ...).
    #[error("Template expansion failed: {0}")]
    Expansion(#[from] ExpansionError),

    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    /// A required part of the document container is missing or unusable.
    #[error("Invalid document package: {0}")]
    Package(String),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid renderer configuration: {0}")]
    Config(String),
}

/// Expanded output that cannot be turned back into a tree.
#[derive(Error, Debug)]
pub enum MalformedOutput {
    #[error("{0}")]
    InvalidXml(XmlDiagnostic),

    /// An unescape rule kept matching past its pass limit.
    #[error("Unescaping '{entity}' inside template delimiters did not settle after {passes} passes")]
    UnescapeLimit {
        entity: String,
        passes: usize,
    },
}

/// Location of an XML well-formedness failure in expanded text.
///
/// `line` is 1-based, `column` is a 0-based character offset in that line.
/// `excerpt` is a window of the offending line around `column` and `marker`
/// is a `---^` line pointing at the failure inside the excerpt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDiagnostic {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub excerpt: String,
    pub marker: String,
}

impl fmt::Display for XmlDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid XML near line {}, column {}: {}\n{}\n{}",
            self.line, self.column, self.message, self.excerpt, self.marker
        )
    }
}

/// Failure reported by an expansion backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExpansionError {
    pub message: String,
}

impl ExpansionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure of a [`MediaWriter`](crate::templating::MediaWriter) to store a file.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("media rejected: {0}")]
    Rejected(String),
}

/// A frame whose media could not be stored; the frame was left untouched.
#[derive(Error, Debug)]
#[error("Image frame '{frame}' was not resolved: {source}")]
pub struct MediaResolutionError {
    /// The frame's original `draw:name`
    pub frame: String,
    #[source]
    pub source: MediaError,
}

/// Error wrapper with user-facing details and a suggestion.
#[derive(Debug)]
pub struct ErrorContext {
    /// The error message, including its causes
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let message = format!("{error:#}");

    if let Some(odt_error) = error.downcast_ref::<OdtError>() {
        return match odt_error {
            OdtError::StructuralTag {
                ..
            } => ErrorContext::new(message)
                .with_details(
                    "Block tags without a scope hint expand up to the nearest element shared with another tag",
                )
                .with_suggestion(
                    "Check that every block tag has its closing tag, or set the field description to a scope such as 'before::row'",
                ),
            OdtError::MalformedOutput(MalformedOutput::InvalidXml(diagnostic)) => {
                ErrorContext::new(format!("Rendered document is not valid XML: {}", diagnostic.message))
                    .with_details(format!(
                        "line {}, column {}\n{}\n{}",
                        diagnostic.line, diagnostic.column, diagnostic.excerpt, diagnostic.marker
                    ))
                    .with_suggestion(
                        "A block tag probably spans part of an element; give it an explicit scope hint (row, cell, paragraph)",
                    )
            }
            OdtError::MalformedOutput(MalformedOutput::UnescapeLimit {
                ..
            }) => ErrorContext::new(message)
                .with_suggestion("Check the document for unusually nested entities inside template tags"),
            OdtError::Expansion(_) => ErrorContext::new(message)
                .with_suggestion("Fix the template syntax of the field named in the message"),
            OdtError::Zip(_) | OdtError::Package(_) => ErrorContext::new(message)
                .with_suggestion("Make sure the input is an OpenDocument text (.odt) file"),
            _ => ErrorContext::new(message),
        };
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::NotFound {
            return ErrorContext::new(message)
                .with_suggestion("Check that the file exists and the path is correct");
        }
    }

    if error.downcast_ref::<serde_json::Error>().is_some() {
        return ErrorContext::new(message)
            .with_suggestion("The context file must contain a JSON object");
    }

    ErrorContext::new(message)
}
