//! Test utilities for odtmerge
//!
//! Helpers shared by unit and integration tests: one-time log setup and
//! builders for `.odt` packages.
//!
//! # Example
//!
//! ```rust,no_run
//! use odtmerge::test_utils::{OdtFixture, init_test_logging};
//!
//! init_test_logging(None);
//! let dir = tempfile::tempdir().unwrap();
//! let path = OdtFixture::with_body("<text:p>Hello</text:p>").write_to(dir.path(), "hello.odt").unwrap();
//! ```

pub mod fixtures;

pub use fixtures::OdtFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, tests run without logging.
///
/// ```bash
/// RUST_LOG=odtmerge=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
