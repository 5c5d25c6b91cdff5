//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! waypoint.toml (optional, defaults otherwise)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → CLI overrides applied in main
//!
//! On file change (--watch):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → route naming rules re-applied, routes remounted
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Unknown keys are rejected
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_from_dir, ConfigError, CONFIG_FILE_NAME};
pub use schema::{
    AppConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, RoutesConfig, TimeoutConfig,
};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;
