use std::path::PathBuf;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Database switching not supported in cluster mode")]
    ClusterDbSwitch,

    #[error("Database switching is disabled (set ALLOW_DB_SWITCH=true to enable)")]
    DbSwitchDisabled,

    #[error("Database {0} is blocked")]
    DatabaseBlocked(i64),

    #[error("Failed to read TLS file {path}: {source}")]
    Certificate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
