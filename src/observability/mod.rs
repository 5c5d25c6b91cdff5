//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON optional) for machine parsing
//! - Request ID flows through the request span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
