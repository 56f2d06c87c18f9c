//! odtmerge - template rendering for OpenDocument text
//!
//! Office documents make good templates: authors design invoices, letters and
//! reports in a word processor and mark the variable parts with input fields
//! holding template syntax (`{{ customer.name }}`, `{% for row in rows %}`).
//! odtmerge renders such a document against a JSON context into a new `.odt`.
//!
//! # Architecture Overview
//!
//! Rendering one XML part of the document runs these stages:
//!
//! 1. **Scan** the fields holding template syntax and count them per ancestor
//! 2. **Resolve** each tag's scope: the element it stands in for
//! 3. **Rewrite** the tree so the literal tag text sits in that element's place
//! 4. **Normalize** the serialized XML so the tag text is raw template source
//! 5. **Expand** it with a templating backend (Tera by default)
//! 6. **Reparse** the result, with line and column on failure
//! 7. **Embed** images that frames now point at
//!
//! # Core Modules
//!
//! - [`templating`] - the render pipeline and the expansion backend contract
//! - [`xml`] - the mutable XML tree the pipeline works on
//! - [`package`] - reading and writing the `.odt` zip container
//! - [`config`] - renderer configuration (`odtmerge.toml`)
//! - [`core`] - error types and user-facing error reporting
//! - [`cli`] - the `odtmerge` command-line interface
//!
//! # Example
//!
//! ```bash
//! odtmerge render invoice.odt invoice-42.odt --context invoice-42.json
//! odtmerge tags invoice.odt
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod package;
pub mod templating;
pub mod xml;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
