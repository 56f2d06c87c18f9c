//! Delimiter patterns that recognise and classify template tags.
//!
//! The three expressions are compiled from the configured delimiters (each
//! passed through [`regex::escape`]) with `(?is)`: matching is
//! case-insensitive and `.` spans newlines.
//!
//! - tag: starts with a variable or block start, ends with a variable or block end
//! - block: starts with the block start, ends with the block end
//! - variable: a variable start ... variable end span ending the text
//!
//! A tag that opens with a block start but closes with a variable end (or the
//! reverse) is a tag but not a block, so it is treated as a print tag.

use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::config::Delimiters;
use crate::core::OdtError;

/// Classification of a template tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    /// Value interpolation, e.g. `{{ name }}`
    Print,
    /// Control flow, e.g. `{% for row in rows %}`
    Block,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKind::Print => f.pad("print"),
            TagKind::Block => f.pad("block"),
        }
    }
}

/// Compiled tag expressions for one set of delimiters.
#[derive(Debug, Clone)]
pub struct TagPatterns {
    delimiters: Delimiters,
    tag: Regex,
    block: Regex,
    variable: Regex,
}

impl TagPatterns {
    pub fn new(delimiters: &Delimiters) -> Result<Self, OdtError> {
        let vs = regex::escape(&delimiters.variable_start);
        let ve = regex::escape(&delimiters.variable_end);
        let bs = regex::escape(&delimiters.block_start);
        let be = regex::escape(&delimiters.block_end);

        Ok(Self {
            delimiters: delimiters.clone(),
            tag: compile(&format!(r"(?is)^({vs}|{bs}).*({ve}|{be})$"))?,
            block: compile(&format!(r"(?is)^({bs})(.*)({be})$"))?,
            variable: compile(&format!(r"(?is)({vs})(.*)({ve})$"))?,
        })
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    /// Whether `text` (already trimmed) is template syntax at all.
    pub fn is_tag(&self, text: &str) -> bool {
        self.tag.is_match(text)
    }

    /// Classify a tag: block when the block pattern matches, print otherwise.
    pub fn classify(&self, text: &str) -> TagKind {
        if self.block.is_match(text) {
            TagKind::Block
        } else {
            TagKind::Print
        }
    }

    /// Pattern with groups (start, expression, end) for a trailing variable tag.
    pub fn variable(&self) -> &Regex {
        &self.variable
    }
}

pub(crate) fn compile(pattern: &str) -> Result<Regex, OdtError> {
    Regex::new(pattern).map_err(|e| OdtError::Config(format!("invalid delimiter pattern: {e}")))
}
