//! Finds template tags in a document and counts them per ancestor.

use indextree::NodeId;
use std::collections::HashMap;
use std::iter;

use super::patterns::{TagKind, TagPatterns};
use crate::xml::Document;

/// Element holding user-entered field text in an OpenDocument body.
pub const FIELD_ELEMENT: &str = "text:text-input";

/// Field attribute carrying the optional scope hint.
pub const SCOPE_HINT_ATTRIBUTE: &str = "text:description";

/// A field whose text is template syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateTag {
    /// The field element
    pub node: NodeId,
    /// Trimmed, decoded template syntax
    pub content: String,
    pub kind: TagKind,
    /// Raw scope hint; empty when the field has none
    pub hint: String,
}

/// Lazily yield the template tags of `document` in document order.
///
/// A field qualifies when its first child is a text node whose trimmed text
/// matches the tag pattern; other fields are ordinary document fields and are
/// skipped.
pub fn tags_in_document<'a>(
    document: &'a Document,
    patterns: &'a TagPatterns,
) -> impl Iterator<Item = TemplateTag> + 'a {
    document.elements_named(FIELD_ELEMENT).filter_map(move |node| {
        let first = document.first_child(node)?;
        let content = document.text(first)?.trim();
        if !patterns.is_tag(content) {
            return None;
        }
        Some(TemplateTag {
            node,
            content: content.to_string(),
            kind: patterns.classify(content),
            hint: document.attribute(node, SCOPE_HINT_ATTRIBUTE).unwrap_or_default().to_string(),
        })
    })
}

/// Tag counters of one node's subtree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TagCounts {
    pub total: usize,
    pub block: usize,
    pub variable: usize,
}

/// Per-node tag counts, keyed by node identity.
///
/// Each tag is counted on its parent and every ancestor above it, up to and
/// including the document node. The table is built once before rewriting and
/// only read afterwards.
#[derive(Debug, Default, Clone)]
pub struct Census {
    counts: HashMap<NodeId, TagCounts>,
}

impl Census {
    pub fn take(document: &Document, tags: &[TemplateTag]) -> Self {
        let mut counts: HashMap<NodeId, TagCounts> = HashMap::new();

        for tag in tags {
            let Some(parent) = document.parent(tag.node) else {
                continue;
            };
            for ancestor in iter::once(parent).chain(document.ancestors(parent)) {
                let entry = counts.entry(ancestor).or_default();
                entry.total += 1;
                match tag.kind {
                    TagKind::Block => entry.block += 1,
                    TagKind::Print => entry.variable += 1,
                }
            }
        }

        tracing::debug!("Tag census covers {} node(s)", counts.len());
        Self {
            counts,
        }
    }

    /// Counters of `node`; zero for nodes with no tag beneath them.
    pub fn counts(&self, node: NodeId) -> TagCounts {
        self.counts.get(&node).copied().unwrap_or_default()
    }

    pub fn total(&self, node: NodeId) -> usize {
        self.counts(node).total
    }
}
