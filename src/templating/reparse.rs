//! Turning expanded text back into a tree, with located diagnostics.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::core::{MalformedOutput, OdtError, XmlDiagnostic};
use crate::xml::{Document, XmlError};

/// Characters shown on each side of the failure column in a diagnostic.
pub const EXCERPT_RADIUS: usize = 40;

/// Parse expanded output into a fresh document.
///
/// Non-ASCII characters are first written as numeric character references so
/// the parser sees plain ASCII; line and column in a diagnostic refer to that
/// encoded text.
///
/// # Errors
///
/// Returns [`MalformedOutput::InvalidXml`] when the text is not well-formed.
pub fn reparse(expanded: &str) -> Result<Document, OdtError> {
    let encoded = encode_non_ascii(expanded);
    Document::parse(&encoded).map_err(|err| match err {
        XmlError::Syntax {
            message,
            position,
        } => {
            let diagnostic = diagnose(&encoded, position, message);
            tracing::error!("Expanded document is not well-formed:\n{}", diagnostic);
            MalformedOutput::InvalidXml(diagnostic).into()
        }
        other => other.into(),
    })
}

/// Replace every non-ASCII character with `&#N;`.
pub fn encode_non_ascii(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let _ = write!(out, "&#{};", u32::from(c));
        }
    }
    Cow::Owned(out)
}

/// Locate byte offset `position` of `source` as a line/column diagnostic.
pub fn diagnose(source: &str, position: usize, message: String) -> XmlDiagnostic {
    let mut position = position.min(source.len());
    while !source.is_char_boundary(position) {
        position -= 1;
    }

    let before = &source[..position];
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[position..].find('\n').map_or(source.len(), |i| position + i);
    let line: Vec<char> = source[line_start..line_end].chars().collect();

    let column = source[line_start..position].chars().count();
    let lower = column.saturating_sub(EXCERPT_RADIUS);
    let upper = (column + EXCERPT_RADIUS).min(line.len());

    XmlDiagnostic {
        message,
        line: before.matches('\n').count() + 1,
        column,
        excerpt: line[lower..upper].iter().collect(),
        marker: format!("{}^", "-".repeat(column - lower)),
    }
}
