//! # Redlink Client
//!
//! Redis connection management built on [`redlink_config::ConnectionSettings`].
//!
//! This crate provides:
//! - A store client with a shared default connection and per-database connections
//! - Single-node and cluster support, with optional TLS
//! - Server management operations (DBSIZE, INFO, CLIENT LIST, database switching)
//!
//! # Example
//!
//! ```ignore
//! use redlink_client::StoreClient;
//! use redlink_config::ConnectionSettings;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = Arc::new(ConnectionSettings::from_env().unwrap());
//!     let client = StoreClient::new(settings);
//!
//!     let keys = client.dbsize().await.unwrap();
//! }
//! ```

pub mod admin;
pub mod connection;
pub mod error;

pub use admin::{
    DatabaseListing, DatabaseOverview, DatabaseSummary, ServerInfo, ensure_switch_allowed,
};
pub use connection::{StoreClient, StoreConnection, connection_info};
pub use error::ClientError;
