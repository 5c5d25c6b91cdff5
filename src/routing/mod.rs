//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (method partition lookup, HEAD → GET → * fallback)
//!     → matcher.rs (segment match, parameter extraction)
//!     → Return: Resolution { endpoint, params } or None
//!
//! Route Compilation (at mount):
//!     (methods, pattern) declarations
//!     → route.rs (compile + intern)
//!     → router.rs (conflict check on insert)
//!     → Sort by precedence
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at mount, immutable at runtime
//! - No regex in hot path (segment matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by precedence)

pub mod error;
pub mod matcher;
pub mod params;
pub mod route;
pub mod router;

pub use error::{PatternError, RouteConflictError};
pub use matcher::{compile, Matcher, Segment, SegmentKind};
pub use params::ParamBindings;
pub use route::{Endpoint, MethodToken, Methods, Route, RouteInterner};
pub use router::{Resolution, RouteTable};
