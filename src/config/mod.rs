//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → TunnelConfig (validated)
//!     → settings.rs (TunnelSettings: immutable runtime view)
//!     → shared via Arc with every session
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - No process-wide mutable state; settings are injected

pub mod loader;
pub mod schema;
pub mod settings;
pub mod validation;

pub use loader::{apply_env_overrides, load, load_config, ConfigError};
pub use schema::{ListenerConfig, ObservabilityConfig, TimeoutConfig, TunnelConfig, TunnelSection};
pub use settings::{normalize_ws_path, TunnelSettings};
pub use validation::{validate_config, ValidationError};
