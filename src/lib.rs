//! # Redlink
//!
//! Resolves Redis connection settings from the environment and exposes them
//! through a small CLI.
//!
//! ## Architecture
//!
//! ```text
//! crates/
//! ├── redlink-config/   # Settings loader, URI builder, blocked databases
//! └── redlink-client/   # Connections and server management commands
//! src/
//! ├── cli.rs            # clap commands
//! └── logging.rs        # tracing subscriber setup
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export REDIS_HOST=cache.internal
//! export REDIS_PWD=secret
//! export BLOCKED_DBS=0,15
//!
//! redlink uri
//! # redis://:***@cache.internal:6379/0
//!
//! redlink check 15
//! # Database 15 is blocked
//! ```

pub mod cli;
pub mod logging;

pub use redlink_client as client;
pub use redlink_config as config;
