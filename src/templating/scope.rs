//! Scope resolution: deciding which element a tag replaces.
//!
//! A tag's *placeholder* is the node its substitute takes the place of. It is
//! chosen by, in order:
//!
//! 1. the markdown marker, which forces paragraph scope;
//! 2. an explicit scope hint known to the [`ScopeTable`], resolved to the
//!    nearest enclosing element of the mapped name;
//! 3. for block tags, the shared-ancestor rule: climb from the field while the
//!    parent holds no other tag;
//! 4. for print tags, the field itself.
//!
//! Hints the table does not know are logged and ignored, so the tag falls back
//! to rule 3 or 4.

use indextree::NodeId;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use super::patterns::TagKind;
use super::scanner::{Census, TemplateTag};
use crate::core::OdtError;
use crate::xml::Document;

const PARAGRAPH: &str = "text:p";
const TABLE_ROW: &str = "table:table-row";
const TABLE_CELL: &str = "table:table-cell";

const BEFORE_PREFIX: &str = "before::";
const AFTER_PREFIX: &str = "after::";

/// Where the substitute goes relative to the placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Substitute replaces the placeholder
    Replace,
    /// Substitute precedes the placeholder, which stays
    Before,
    /// Substitute follows the placeholder, which stays
    After,
}

impl Placement {
    /// Placement encoded by a normalized hint's prefix.
    pub fn from_hint(hint: &str) -> Self {
        if hint.starts_with(BEFORE_PREFIX) {
            Placement::Before
        } else if hint.starts_with(AFTER_PREFIX) {
            Placement::After
        } else {
            Placement::Replace
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Replace => f.pad("replace"),
            Placement::Before => f.pad("before"),
            Placement::After => f.pad("after"),
        }
    }
}

/// What the tag is turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Substitute {
    /// A bare text node holding the tag
    RawText,
    /// A `<text:span>` holding the tag as text
    Span,
}

/// Resolved placement of one tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub placeholder: NodeId,
    pub substitute: Substitute,
    pub placement: Placement,
}

/// Case-insensitive map from scope names to element names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeTable {
    entries: HashMap<String, String>,
}

impl Default for ScopeTable {
    fn default() -> Self {
        let mut table = Self {
            entries: HashMap::new(),
        };
        for name in [PARAGRAPH, "paragraph"] {
            table.insert(name, PARAGRAPH);
        }
        table.insert("before::paragraph", PARAGRAPH);
        table.insert("after::paragraph", PARAGRAPH);
        for name in [TABLE_ROW, "table-row", "row"] {
            table.insert(name, TABLE_ROW);
        }
        for name in ["table-row", "row"] {
            table.insert(&format!("{BEFORE_PREFIX}{name}"), TABLE_ROW);
            table.insert(&format!("{AFTER_PREFIX}{name}"), TABLE_ROW);
        }
        for name in [TABLE_CELL, "table-cell", "cell"] {
            table.insert(name, TABLE_CELL);
        }
        for name in ["table-cell", "cell"] {
            table.insert(&format!("{BEFORE_PREFIX}{name}"), TABLE_CELL);
            table.insert(&format!("{AFTER_PREFIX}{name}"), TABLE_CELL);
        }
        table
    }
}

impl ScopeTable {
    /// The default table extended (or overridden) with `extra` entries.
    pub fn with_entries<'a>(extra: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let mut table = Self::default();
        for (name, element) in extra {
            table.insert(name, element);
        }
        table
    }

    pub fn insert(&mut self, name: &str, element: &str) {
        self.entries.insert(normalize(name), element.trim().to_string());
    }

    /// Element name for a hint, or `None` when the hint is unknown.
    pub fn lookup(&self, hint: &str) -> Option<&str> {
        self.entries.get(&normalize(hint)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(hint: &str) -> String {
    hint.trim().to_lowercase()
}

/// Resolves tags against a census taken before any rewriting.
#[derive(Debug, Clone, Copy)]
pub struct ScopeResolver<'a> {
    scopes: &'a ScopeTable,
    census: &'a Census,
    markdown_marker: &'a str,
}

impl<'a> ScopeResolver<'a> {
    pub fn new(scopes: &'a ScopeTable, census: &'a Census, markdown_marker: &'a str) -> Self {
        Self {
            scopes,
            census,
            markdown_marker,
        }
    }

    /// Effective hint of a tag after the markdown override, normalized.
    pub fn effective_hint(&self, tag: &TemplateTag) -> String {
        if self.is_markdown(&tag.content) {
            return PARAGRAPH.to_string();
        }
        normalize(&tag.hint)
    }

    /// Markdown marker present after the first character of the tag.
    fn is_markdown(&self, content: &str) -> bool {
        let marker = self.markdown_marker.to_lowercase();
        !marker.is_empty() && content.to_lowercase().find(&marker).is_some_and(|index| index > 0)
    }

    /// Determine the placeholder, substitute, and placement of `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`OdtError::StructuralTag`] when a known hint names an element
    /// that does not enclose the field, or when a block tag's climb reaches
    /// the document node.
    pub fn resolve(&self, document: &Document, tag: &TemplateTag) -> Result<Resolution, OdtError> {
        let hint = self.effective_hint(tag);

        if !hint.is_empty() {
            if let Some(element) = self.scopes.lookup(&hint) {
                let placeholder = document.nearest_ancestor_named(tag.node, element).ok_or_else(|| {
                    OdtError::StructuralTag {
                        tag: tag.content.clone(),
                        reason: format!("scope '{hint}' requires an enclosing <{element}>"),
                    }
                })?;
                return Ok(Resolution {
                    placeholder,
                    substitute: Substitute::RawText,
                    placement: Placement::from_hint(&hint),
                });
            }
            tracing::debug!("Ignoring unknown scope hint '{}' on tag '{}'", hint, tag.content);
        }

        match tag.kind {
            TagKind::Block => Ok(Resolution {
                placeholder: self.shared_ancestor_child(document, tag)?,
                substitute: Substitute::RawText,
                placement: Placement::Replace,
            }),
            TagKind::Print => Ok(Resolution {
                placeholder: tag.node,
                substitute: Substitute::Span,
                placement: Placement::Replace,
            }),
        }
    }

    /// Nearest ancestor-or-self of the field whose parent holds more than one tag.
    fn shared_ancestor_child(&self, document: &Document, tag: &TemplateTag) -> Result<NodeId, OdtError> {
        let mut placeholder = tag.node;
        loop {
            let parent = document.parent(placeholder).ok_or_else(|| OdtError::StructuralTag {
                tag: tag.content.clone(),
                reason: "no ancestor is shared with another tag; the block is probably not closed"
                    .to_string(),
            })?;
            if self.census.total(parent) > 1 {
                return Ok(placeholder);
            }
            placeholder = parent;
        }
    }
}
