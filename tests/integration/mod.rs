//! Integration test suite for odtmerge
//!
//! End-to-end tests of the render pipeline on whole documents, the `.odt`
//! container, and the command-line interface.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! RUST_LOG=odtmerge=debug cargo test --test integration -- --nocapture
//! ```
//!
//! # Test Organization
//!
//! - **pipeline**: rendering XML parts with the Tera backend
//! - **package**: reading, rendering, and writing `.odt` packages, media included
//! - **cli**: the `render` and `tags` commands

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli;
mod package;
mod pipeline;
