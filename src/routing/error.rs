//! Routing error definitions.

use thiserror::Error;

/// Errors raised while compiling a path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// Patterns are absolute request paths.
    #[error("pattern `{0}` must start with `/`")]
    NotAbsolute(String),

    /// Opening and closing brackets do not pair up.
    #[error("mismatched brackets in segment `{0}`")]
    UnbalancedBrackets(String),

    /// A segment mixes literal text and a parameter, or is otherwise not a
    /// recognised parameter form.
    #[error("malformed parameter segment `{0}`")]
    MalformedSegment(String),

    /// Parameter names start with a letter and contain only `[A-Za-z0-9_.-]`.
    #[error("invalid parameter name `{0}`")]
    InvalidParamName(String),

    /// `[...name]` and `[[...name]]` must be the final segment.
    #[error("spread segment `{0}` must be the final segment")]
    SpreadNotLast(String),

    /// `*` is only allowed as the final segment.
    #[error("wildcard must be the final segment in `{0}`")]
    WildcardNotLast(String),

    /// The same parameter name appears twice in one pattern.
    #[error("duplicate parameter name `{0}`")]
    DuplicateParam(String),
}

/// Two declarations resolve to the same methods and path shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "route conflict on [{methods}]: `{pattern}` declared by `{source_id}` collides with `{existing_pattern}` declared by `{existing_source}`"
)]
pub struct RouteConflictError {
    /// Overlapping method tokens, comma separated.
    pub methods: String,
    pub pattern: String,
    pub source_id: String,
    pub existing_pattern: String,
    pub existing_source: String,
}
