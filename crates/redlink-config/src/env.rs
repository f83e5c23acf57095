//! Environment value parsing.
//!
//! Every reader here takes a lookup closure rather than touching the process
//! environment, so callers can load settings from an explicit map.
//!
//! Parsing rules:
//! - flags are true only for `true`, `1` or `t` (case-insensitive)
//! - integers tolerate surrounding whitespace and fail loudly otherwise
//! - optional strings treat an empty value as unset
//! - database lists keep digit-only tokens and drop everything else

use crate::ConfigError;
use std::num::ParseIntError;
use std::str::FromStr;
use tracing::debug;

/// Env var: transport used by the surrounding server.
pub const ENV_TRANSPORT: &str = "MCP_TRANSPORT";
/// Env var: store host.
pub const ENV_HOST: &str = "REDIS_HOST";
/// Env var: store port.
pub const ENV_PORT: &str = "REDIS_PORT";
/// Env var: ACL username.
pub const ENV_USERNAME: &str = "REDIS_USERNAME";
/// Env var: password (secret).
pub const ENV_PASSWORD: &str = "REDIS_PWD";
/// Env var: enable TLS.
pub const ENV_SSL: &str = "REDIS_SSL";
/// Env var: directory of CA certificates.
pub const ENV_SSL_CA_PATH: &str = "REDIS_SSL_CA_PATH";
/// Env var: client private key file.
pub const ENV_SSL_KEYFILE: &str = "REDIS_SSL_KEYFILE";
/// Env var: client certificate file.
pub const ENV_SSL_CERTFILE: &str = "REDIS_SSL_CERTFILE";
/// Env var: server certificate requirement (`none`, `optional`, `required`).
pub const ENV_SSL_CERT_REQS: &str = "REDIS_SSL_CERT_REQS";
/// Env var: CA bundle file.
pub const ENV_SSL_CA_CERTS: &str = "REDIS_SSL_CA_CERTS";
/// Env var: talk to a cluster instead of a single node.
pub const ENV_CLUSTER_MODE: &str = "REDIS_CLUSTER_MODE";
/// Env var: logical database index.
pub const ENV_DB: &str = "REDIS_DB";
/// Env var: permit switching databases at runtime.
pub const ENV_ALLOW_DB_SWITCH: &str = "ALLOW_DB_SWITCH";
/// Env var: comma-separated list of blocked database indices.
pub const ENV_BLOCKED_DBS: &str = "BLOCKED_DBS";

/// Returns true for the accepted truthy spellings.
pub fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "t")
}

/// Reads a flag, defaulting to `false` when unset.
pub fn flag<F>(lookup: &F, key: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).is_some_and(|v| is_truthy(&v))
}

/// Reads a string, falling back to `default` when unset.
pub fn string_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Reads an optional string. An empty value counts as unset.
pub fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.is_empty())
}

/// Reads an integer, falling back to `default` when unset.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidInteger`] when the variable is set but does
/// not parse.
pub fn integer_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr<Err = ParseIntError>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidInteger {
                key,
                value,
                source,
            }),
    }
}

/// Parses a comma-separated list of database indices.
///
/// Tokens are trimmed; anything that is not made of ASCII digits (including
/// empty tokens) is skipped. Order and duplicates are preserved.
pub fn parse_db_list(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter_map(|token| {
            if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
                if !token.is_empty() {
                    debug!(token = %token, "Skipping non-numeric blocked database entry");
                }
                return None;
            }
            token.parse().ok()
        })
        .collect()
}
