//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (fill unset credentials from environment)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - File values win over environment variables
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AllowlistConfig;
pub use schema::HeaderConfig;
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::OAuthConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProxyConfig;
pub use schema::SecurityConfig;
