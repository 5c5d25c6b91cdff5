//! Convention-based HTTP request router.
//!
//! Routes are declared as (method set, path pattern, handler) triples,
//! usually named after files (`hello/[name].get.rs`), optionally wrapped in
//! onion-style hooks. They are compiled into an immutable, precedence-sorted
//! table that is swapped atomically on remount.

pub mod config;
pub mod demo;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod mount;
pub mod observability;
pub mod routing;

pub use config::schema::AppConfig;
pub use dispatch::{Context, Next};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use mount::{ConventionSource, RouteRegistry};
pub use routing::RouteTable;
