//! Dispatch error definitions.

use thiserror::Error;

/// Boxed error returned by user hooks and handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while reading a request body.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The underlying stream failed or exceeded the size limit.
    #[error("failed to read request body: {0}")]
    Read(#[source] axum::Error),

    /// A previous read failed; the body is gone.
    #[error("request body is no longer available")]
    Unavailable,

    #[error("request body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("request body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that abort a request's dispatch chain. All of them surface to the
/// server loop, which answers with a 500.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// `next()` was invoked a second time, or after a later link was entered.
    #[error("next() called again for link {index} (links entered: {entered})")]
    DoubleNext { index: usize, entered: usize },

    /// `respond` was invoked after the response was already committed.
    #[error("response already sent")]
    AlreadyResponded,

    #[error(transparent)]
    Body(#[from] BodyError),

    /// Any error raised by a hook or handler.
    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),
}

impl DispatchError {
    /// Wrap an arbitrary error raised inside a hook or handler.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        DispatchError::Handler(err.into())
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::Handler(Box::new(err))
    }
}
