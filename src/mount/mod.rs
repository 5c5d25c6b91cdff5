//! Mount subsystem.
//!
//! # Data Flow
//! ```text
//! RouteSource (ConventionSource, Vec<RouteDeclaration>, ...)
//!     → declaration.rs (methods, pattern, Declaration, source id)
//!     → builder.rs (intern, scope hooks, build endpoints, insert, seal)
//!     → registry.rs (ArcSwap store)
//!     → server loop loads one snapshot per request
//!
//! On remount (config change, SIGHUP):
//!     same source → builder.rs → new table
//!     → single atomic store, or error and keep the old table
//! ```
//!
//! # Design Decisions
//! - Declarations carry an explicit kind instead of being probed
//! - The interner lives only for one build
//! - Hook factories run at mount time, never per request

pub mod builder;
pub mod convention;
pub mod declaration;
pub mod error;
pub mod registry;

pub use builder::{build, MountReport};
pub use convention::{parse_file_name, ConventionName, ConventionSource};
pub use declaration::{Declaration, Registrar, RouteDeclaration, RouteSource};
pub use error::{MountError, SkippedDeclaration, SourceError};
pub use registry::RouteRegistry;
