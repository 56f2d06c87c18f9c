//! In-memory XML documents for the OpenDocument parts being rendered.
//!
//! A [`Document`] is parsed fresh from serialized XML, mutated in place while
//! template tags are rewritten, and serialized again before expansion. The
//! tree is index-based (see [`tree`]) so upward walks and serialization are
//! iterative.

mod parser;
pub mod tree;
mod writer;

pub use indextree::NodeId;
pub use tree::{Document, Element, XmlDeclaration, XmlNode};

use thiserror::Error;

/// Errors raised while reading, building or writing XML trees.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The input is not well-formed; `position` is a byte offset into it.
    #[error("{message} (byte {position})")]
    Syntax {
        message: String,
        position: usize,
    },

    #[error("failed to write XML: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to write XML: {0}")]
    Serialize(#[from] quick_xml::Error),

    #[error("serialized XML is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid tree operation: {0}")]
    Tree(#[from] indextree::NodeError),
}

impl XmlError {
    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            position,
        }
    }
}
