//! Middleware dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Resolution { endpoint, params }
//!     → context.rs (request line, headers, params, body reader, response record)
//!     → chain.rs (hook 0 → hook 1 → ... → handler, then unwind)
//!     → response.rs (committed or accumulated record, JSON finalize)
//!     → server loop writes the response
//! ```
//!
//! # Design Decisions
//! - Strictly sequential per request, no fan-out
//! - `next()` re-entry is a hard error, not a warning
//! - Errors are never swallowed inside the chain; the server loop owns the
//!   5xx fallback

pub mod body;
pub mod chain;
pub mod context;
pub mod error;
pub mod hook;
pub mod response;

pub use body::BodyReader;
pub use chain::{DispatchChain, Next};
pub use context::Context;
pub use error::{BodyError, BoxError, DispatchError};
pub use hook::{
    empty, handler, hook, reply, BoxHandler, BoxHook, Handler, Hook, HookResult, Reply,
};
pub use response::{ResponseBody, ResponseRecord};
