//! Configuration for odtmerge.
//!
//! A single optional TOML file (`odtmerge.toml` by convention) tunes the
//! renderer: template delimiters, the link scheme for expressions embedded in
//! hyperlinks, the markdown marker, the unescape pass limit, the media
//! directory for the `image` filter, extra scope names, and extra `markdown`
//! filter elements. Every key is optional; see [`RenderConfig`] for the full
//! layout.

pub mod render;

pub use render::{
    DEFAULT_LINK_SCHEME, DEFAULT_MARKDOWN_MARKER, DEFAULT_MAX_UNESCAPE_PASSES, Delimiters,
    RenderConfig,
};
