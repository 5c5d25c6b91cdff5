//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Metrics → Mount routes → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain requests → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Remount routes
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then routes, then listeners
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has timeout: forced exit after deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{Startup, StartupError};
