//! Mount error definitions.

use thiserror::Error;

use crate::routing::error::{PatternError, RouteConflictError};

/// Errors raised by a [`RouteSource`](crate::mount::RouteSource) while
/// producing declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// A file name that does not follow the naming convention.
    #[error("invalid route file name `{name}`: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// A `_hooks` file bound to a route, or a route file bound to hooks.
    #[error("`{name}` is a {expected} file but was given a {actual} declaration")]
    KindMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Two entries registered under the same file name.
    #[error("duplicate route file `{0}`")]
    DuplicateName(String),
}

/// Errors that abort a mount. The previously active table stays in place.
#[derive(Debug, Error)]
pub enum MountError {
    #[error("route source failed: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Conflict(#[from] RouteConflictError),
}

/// A declaration left out of the table because its pattern did not compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDeclaration {
    pub source: String,
    pub error: PatternError,
}
