//! Connection settings loaded from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Default |
//! |---|---|
//! | `MCP_TRANSPORT` | `stdio` |
//! | `REDIS_HOST` | `127.0.0.1` |
//! | `REDIS_PORT` | `6379` |
//! | `REDIS_USERNAME` | unset |
//! | `REDIS_PWD` | empty |
//! | `REDIS_SSL` | `false` |
//! | `REDIS_SSL_CA_PATH` | unset |
//! | `REDIS_SSL_KEYFILE` | unset |
//! | `REDIS_SSL_CERTFILE` | unset |
//! | `REDIS_SSL_CERT_REQS` | `required` |
//! | `REDIS_SSL_CA_CERTS` | unset |
//! | `REDIS_CLUSTER_MODE` | `false` |
//! | `REDIS_DB` | `0` |
//! | `ALLOW_DB_SWITCH` | `false` |
//! | `BLOCKED_DBS` | empty |
//!
//! Settings are built once and never mutated. Share them by reference or
//! behind an `Arc`.

use crate::ConfigError;
use crate::env::{self, flag, integer_or, optional, string_or};
use std::collections::BTreeMap;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 6379;
const DEFAULT_CERT_REQS: &str = "required";
const DEFAULT_TRANSPORT: &str = "stdio";

/// Everything needed to reach the key-value store.
///
/// Nothing mutates a loaded record; share it as `Arc<ConnectionSettings>`.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    /// ACL username. `None` means password-only or no auth.
    pub username: Option<String>,
    /// Empty means no password.
    pub password: String,
    pub ssl: bool,
    pub ssl_ca_path: Option<String>,
    pub ssl_keyfile: Option<String>,
    pub ssl_certfile: Option<String>,
    /// Server certificate requirement; only used when `ssl` is set.
    pub ssl_cert_reqs: String,
    pub ssl_ca_certs: Option<String>,
    /// Connect to a cluster. Cluster mode has no logical databases.
    pub cluster_mode: bool,
    /// Logical database index.
    pub db: i64,
    /// Whether the database may be switched at runtime.
    pub allow_db_switch: bool,
    /// Database indices that must never be selected.
    pub blocked_dbs: Vec<i64>,
}

impl ConnectionSettings {
    /// Loads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidInteger`] if `REDIS_PORT` or `REDIS_DB`
    /// is set to something that is not an integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings from an explicit variable map.
    ///
    /// # Errors
    ///
    /// Same as [`ConnectionSettings::from_env`].
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| map.get(key).cloned())
    }

    /// Loads settings through an arbitrary lookup function.
    ///
    /// # Errors
    ///
    /// Same as [`ConnectionSettings::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            host: string_or(&lookup, env::ENV_HOST, DEFAULT_HOST),
            port: integer_or(&lookup, env::ENV_PORT, DEFAULT_PORT)?,
            username: optional(&lookup, env::ENV_USERNAME),
            password: string_or(&lookup, env::ENV_PASSWORD, ""),
            ssl: flag(&lookup, env::ENV_SSL),
            ssl_ca_path: optional(&lookup, env::ENV_SSL_CA_PATH),
            ssl_keyfile: optional(&lookup, env::ENV_SSL_KEYFILE),
            ssl_certfile: optional(&lookup, env::ENV_SSL_CERTFILE),
            ssl_cert_reqs: string_or(&lookup, env::ENV_SSL_CERT_REQS, DEFAULT_CERT_REQS),
            ssl_ca_certs: optional(&lookup, env::ENV_SSL_CA_CERTS),
            cluster_mode: flag(&lookup, env::ENV_CLUSTER_MODE),
            db: integer_or(&lookup, env::ENV_DB, 0)?,
            allow_db_switch: flag(&lookup, env::ENV_ALLOW_DB_SWITCH),
            blocked_dbs: lookup(env::ENV_BLOCKED_DBS)
                .map(|raw| env::parse_db_list(&raw))
                .unwrap_or_default(),
        })
    }

    /// Whether server certificates should be verified.
    pub fn verify_certificates(&self) -> bool {
        !self.ssl_cert_reqs.eq_ignore_ascii_case("none")
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            username: None,
            password: String::new(),
            ssl: false,
            ssl_ca_path: None,
            ssl_keyfile: None,
            ssl_certfile: None,
            ssl_cert_reqs: DEFAULT_CERT_REQS.into(),
            ssl_ca_certs: None,
            cluster_mode: false,
            db: 0,
            allow_db_switch: false,
            blocked_dbs: Vec::new(),
        }
    }
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let password = if self.password.is_empty() { "" } else { "***" };
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &password)
            .field("ssl", &self.ssl)
            .field("ssl_ca_path", &self.ssl_ca_path)
            .field("ssl_keyfile", &self.ssl_keyfile)
            .field("ssl_certfile", &self.ssl_certfile)
            .field("ssl_cert_reqs", &self.ssl_cert_reqs)
            .field("ssl_ca_certs", &self.ssl_ca_certs)
            .field("cluster_mode", &self.cluster_mode)
            .field("db", &self.db)
            .field("allow_db_switch", &self.allow_db_switch)
            .field("blocked_dbs", &self.blocked_dbs)
            .finish()
    }
}

/// Process configuration: the transport plus the store settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Transport of the surrounding server (`stdio`, `sse`, ...).
    pub transport: String,
    pub redis: ConnectionSettings,
}

impl ServerConfig {
    /// Loads the full configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfigError`] from [`ConnectionSettings::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the full configuration from an explicit variable map.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfigError`] from [`ConnectionSettings::from_lookup`].
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| map.get(key).cloned())
    }

    /// Loads the full configuration through an arbitrary lookup function.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfigError`] from [`ConnectionSettings::from_lookup`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            transport: string_or(&lookup, env::ENV_TRANSPORT, DEFAULT_TRANSPORT),
            redis: ConnectionSettings::from_lookup(&lookup)?,
        })
    }
}
