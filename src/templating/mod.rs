//! Template engine for OpenDocument text.
//!
//! Authors write template syntax into *fields* of an office document (input
//! fields, `text:text-input`). The engine turns each field into literal
//! template text at the right place in the XML tree, lets an expansion backend
//! expand the serialized document, and parses the result back.
//!
//! # Tags and scopes
//!
//! A field whose trimmed text starts with a start delimiter and ends with an
//! end delimiter is a *tag*:
//!
//! - print tags (`{{ customer.name }}`) replace only their field, wrapped in a
//!   `<text:span>` so the surrounding character style applies;
//! - block tags (`{% for row in rows %}`) replace the largest ancestor that
//!   contains no other tag, so `{% for %}` and `{% endfor %}` in two
//!   paragraphs repeat everything between them;
//! - the field description (`text:description`) can name a scope instead:
//!   `paragraph`, `row`, `cell`, or `before::row` / `after::row` (and the same
//!   for the others) to put the tag next to the element rather than in its
//!   place.
//!
//! # Example
//!
//! ```no_run
//! use odtmerge::config::RenderConfig;
//! use odtmerge::package::OdtPackage;
//! use odtmerge::templating::OdtRenderer;
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let renderer = OdtRenderer::with_config(&RenderConfig::default())?;
//! let mut package = OdtPackage::open("invoice.odt")?;
//! let report = renderer.render_package(&mut package, &json!({"customer": {"name": "Ada"}}))?;
//! for failure in &report.failures {
//!     eprintln!("{failure}");
//! }
//! package.save("invoice-ada.odt")?;
//! # Ok(())
//! # }
//! ```

pub mod delegate;
pub mod escape;
pub mod filters;
pub mod markdown;
pub mod media;
pub mod patterns;
pub mod renderer;
pub mod reparse;
pub mod rewriter;
pub mod scanner;
pub mod scope;

pub use delegate::{ExpansionDelegate, TeraDelegate};
pub use markdown::{MarkdownElement, MarkdownFilter, MarkdownMap};
pub use media::{MediaReport, MediaWriter, resolve_media};
pub use patterns::{TagKind, TagPatterns};
pub use renderer::{OdtRenderer, RenderedParts, TagReport};
pub use scanner::{Census, TagCounts, TemplateTag};
pub use scope::{Placement, ScopeTable};
