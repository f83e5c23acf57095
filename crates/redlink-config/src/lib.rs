//! # Redlink Config
//!
//! Connection settings for a Redis-compatible key-value store.
//!
//! This crate provides:
//!
//! - [`settings`]: the immutable [`ConnectionSettings`] record and [`ServerConfig`]
//! - [`uri`]: connection URI generation
//! - [`blocked`]: blocked database lookups
//! - [`env`]: environment value parsing
//!
//! # Example
//!
//! ```ignore
//! use redlink_config::ConnectionSettings;
//!
//! let settings = ConnectionSettings::from_env()?;
//!
//! let uri = settings.connection_uri();
//! // "redis://127.0.0.1:6379/0"
//!
//! if settings.is_database_blocked(3) {
//!     // refuse to switch
//! }
//! ```

pub mod blocked;
pub mod env;
pub mod error;
pub mod settings;
pub mod uri;

// Re-export commonly used types at crate root
pub use blocked::{get_blocked_databases, is_database_blocked};
pub use error::ConfigError;
pub use settings::{ConnectionSettings, ServerConfig};
pub use uri::{generate_connection_uri, redacted_connection_uri};
