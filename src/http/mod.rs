//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → RouteTable::resolve (404 when nothing matches)
//!     → DispatchChain::run
//!     → response.rs (record → HTTP response, 500 on error)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::{build_router, AppState, HttpServer};
