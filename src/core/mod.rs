//! Core types shared across odtmerge.

pub mod error;

pub use error::{
    ErrorContext, ExpansionError, MalformedOutput, MediaError, MediaResolutionError, OdtError,
    XmlDiagnostic, user_friendly_error,
};
