//! Connection management.
//!
//! [`StoreClient`] owns one lazily created default connection and hands out
//! clones of it. Connections bound to another database are created fresh on
//! every call. Cluster mode has no logical databases, so per-database
//! connections are refused there.

use crate::ClientError;
use redis::aio::{ConnectionLike, ConnectionManager, ConnectionManagerConfig};
use redis::cluster::ClusterClientBuilder;
use redis::cluster_async::ClusterConnection;
use redis::{
    Client, ClientTlsConfig, Cmd, ConnectionAddr, ConnectionInfo, ErrorKind, Pipeline,
    RedisConnectionInfo, RedisError, RedisFuture, TlsCertificates, Value,
};
use redlink_config::ConnectionSettings;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Upper bound on establishing a single connection. Failed connects are not
/// retried.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A live connection to a single node or to a cluster.
#[derive(Clone)]
pub enum StoreConnection {
    Single(ConnectionManager),
    Cluster(ClusterConnection),
}

impl std::fmt::Debug for StoreConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(_) => f.write_str("StoreConnection::Single"),
            Self::Cluster(_) => f.write_str("StoreConnection::Cluster"),
        }
    }
}

impl ConnectionLike for StoreConnection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        match self {
            Self::Single(conn) => conn.req_packed_command(cmd),
            Self::Cluster(conn) => conn.req_packed_command(cmd),
        }
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        match self {
            Self::Single(conn) => conn.req_packed_commands(cmd, offset, count),
            Self::Cluster(conn) => conn.req_packed_commands(cmd, offset, count),
        }
    }

    fn get_db(&self) -> i64 {
        match self {
            Self::Single(conn) => conn.get_db(),
            Self::Cluster(conn) => conn.get_db(),
        }
    }
}

struct ActiveConnection {
    /// `None` for cluster connections.
    db: Option<i64>,
    conn: StoreConnection,
}

/// Store client built from immutable connection settings.
pub struct StoreClient {
    settings: Arc<ConnectionSettings>,
    default: Mutex<Option<ActiveConnection>>,
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl StoreClient {
    /// Creates a client. No connection is opened until first use.
    pub fn new(settings: Arc<ConnectionSettings>) -> Self {
        Self {
            settings,
            default: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Returns the shared default connection, opening it on first use.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Redis` if the connection cannot be established.
    pub async fn connection(&self) -> Result<StoreConnection, ClientError> {
        let mut default = self.default.lock().await;

        if let Some(active) = default.as_ref() {
            return Ok(active.conn.clone());
        }

        let db = (!self.settings.cluster_mode).then_some(self.settings.db);
        let conn = open(&self.settings, db).await?;
        *default = Some(ActiveConnection {
            db,
            conn: conn.clone(),
        });

        Ok(conn)
    }

    /// Opens a new connection bound to `db`. The default connection is not
    /// touched.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ClusterDbSwitch` in cluster mode, or
    /// `ClientError::Redis` if the connection fails.
    pub async fn connection_for_db(&self, db: i64) -> Result<StoreConnection, ClientError> {
        if self.settings.cluster_mode {
            return Err(ClientError::ClusterDbSwitch);
        }

        open(&self.settings, Some(db)).await
    }

    /// Database of the default connection, if one is open and bound to a db.
    pub async fn current_database(&self) -> Option<i64> {
        self.default.lock().await.as_ref().and_then(|active| active.db)
    }

    pub(crate) async fn replace_default(&self, db: i64, conn: StoreConnection) {
        *self.default.lock().await = Some(ActiveConnection { db: Some(db), conn });
    }
}

/// Translates settings into connection info for `db`.
///
/// Cluster mode ignores `db` since clusters only expose database 0.
pub fn connection_info(settings: &ConnectionSettings, db: Option<i64>) -> ConnectionInfo {
    let addr = if settings.ssl {
        ConnectionAddr::TcpTls {
            host: settings.host.clone(),
            port: settings.port,
            insecure: !settings.verify_certificates(),
            tls_params: None,
        }
    } else {
        ConnectionAddr::Tcp(settings.host.clone(), settings.port)
    };

    let db = if settings.cluster_mode {
        0
    } else {
        db.unwrap_or(settings.db)
    };

    ConnectionInfo {
        addr,
        redis: RedisConnectionInfo {
            db,
            username: settings.username.clone(),
            password: (!settings.password.is_empty()).then(|| settings.password.clone()),
            ..Default::default()
        },
    }
}

#[instrument(skip(settings), fields(redis.host = %settings.host, redis.port = settings.port))]
async fn open(settings: &ConnectionSettings, db: Option<i64>) -> Result<StoreConnection, ClientError> {
    let info = connection_info(settings, db);

    let result = if settings.cluster_mode {
        open_cluster(info).await
    } else {
        open_single(settings, info).await
    };

    match &result {
        Ok(_) => info!(redis.db = ?db, "Connected to Redis"),
        Err(ClientError::Redis(e)) => log_connect_error(e, db),
        Err(e) => error!(error = %e, "Failed to prepare Redis connection"),
    }

    result
}

async fn open_single(
    settings: &ConnectionSettings,
    info: ConnectionInfo,
) -> Result<StoreConnection, ClientError> {
    let client = match tls_certificates(settings).await? {
        Some(certs) => Client::build_with_tls(info, certs)?,
        None => Client::open(info)?,
    };
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(0)
        .set_connection_timeout(CONNECT_TIMEOUT);
    let conn = ConnectionManager::new_with_config(client, config).await?;

    Ok(StoreConnection::Single(conn))
}

async fn open_cluster(info: ConnectionInfo) -> Result<StoreConnection, ClientError> {
    let client = ClusterClientBuilder::new(vec![info])
        .retries(0)
        .connection_timeout(CONNECT_TIMEOUT)
        .build()?;
    let conn = client.get_async_connection().await?;

    Ok(StoreConnection::Cluster(conn))
}

/// Loads client certificate and CA bundle files, if TLS needs any.
async fn tls_certificates(
    settings: &ConnectionSettings,
) -> Result<Option<TlsCertificates>, ClientError> {
    if !settings.ssl {
        return Ok(None);
    }

    if let Some(ca_path) = &settings.ssl_ca_path {
        debug!(ssl_ca_path = %ca_path, "CA directory is not used for native TLS; set REDIS_SSL_CA_CERTS instead");
    }

    let client_tls = match (&settings.ssl_certfile, &settings.ssl_keyfile) {
        (Some(cert), Some(key)) => Some(ClientTlsConfig {
            client_cert: read_file(cert).await?,
            client_key: read_file(key).await?,
        }),
        (None, None) => None,
        _ => {
            warn!("Both REDIS_SSL_CERTFILE and REDIS_SSL_KEYFILE are needed for client auth; ignoring");
            None
        }
    };

    let root_cert = match &settings.ssl_ca_certs {
        Some(path) => Some(read_file(path).await?),
        None => None,
    };

    if client_tls.is_none() && root_cert.is_none() {
        return Ok(None);
    }

    Ok(Some(TlsCertificates {
        client_tls,
        root_cert,
    }))
}

async fn read_file(path: &str) -> Result<Vec<u8>, ClientError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| ClientError::Certificate {
            path: Path::new(path).to_path_buf(),
            source,
        })
}

fn log_connect_error(e: &RedisError, db: Option<i64>) {
    if e.is_connection_refusal() || e.is_connection_dropped() {
        error!(redis.db = ?db, error = %e, "Failed to connect to Redis server");
    } else if e.is_timeout() {
        error!(redis.db = ?db, error = %e, "Connection timed out");
    } else {
        match e.kind() {
            ErrorKind::AuthenticationFailed => {
                error!(redis.db = ?db, error = %e, "Authentication failed")
            }
            ErrorKind::ResponseError => error!(redis.db = ?db, error = %e, "Response error"),
            _ => error!(redis.db = ?db, error = %e, "Redis error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_connection_info() {
        let settings = ConnectionSettings {
            host: "cache.internal".into(),
            port: 6380,
            db: 2,
            ..ConnectionSettings::default()
        };

        let info = connection_info(&settings, None);
        assert!(matches!(
            &info.addr,
            ConnectionAddr::Tcp(host, 6380) if host == "cache.internal"
        ));
        assert_eq!(info.redis.db, 2);
        assert_eq!(info.redis.username, None);
        assert_eq!(info.redis.password, None);
    }

    #[test]
    fn test_explicit_db_overrides_configured() {
        let settings = ConnectionSettings::default();
        let info = connection_info(&settings, Some(7));
        assert_eq!(info.redis.db, 7);
    }

    #[test]
    fn test_tls_connection_info() {
        let settings = ConnectionSettings {
            ssl: true,
            username: Some("app".into()),
            password: "secret".into(),
            ..ConnectionSettings::default()
        };

        let info = connection_info(&settings, None);
        assert!(matches!(
            info.addr,
            ConnectionAddr::TcpTls { insecure: false, .. }
        ));
        assert_eq!(info.redis.username.as_deref(), Some("app"));
        assert_eq!(info.redis.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_cert_reqs_none_is_insecure() {
        let settings = ConnectionSettings {
            ssl: true,
            ssl_cert_reqs: "none".into(),
            ..ConnectionSettings::default()
        };

        let info = connection_info(&settings, None);
        assert!(matches!(info.addr, ConnectionAddr::TcpTls { insecure: true, .. }));
    }

    #[test]
    fn test_cluster_ignores_db() {
        let settings = ConnectionSettings {
            cluster_mode: true,
            db: 3,
            ..ConnectionSettings::default()
        };

        assert_eq!(connection_info(&settings, Some(5)).redis.db, 0);
    }

    #[tokio::test]
    async fn test_connection_for_db_rejected_in_cluster_mode() {
        let settings = ConnectionSettings {
            cluster_mode: true,
            ..ConnectionSettings::default()
        };
        let client = StoreClient::new(Arc::new(settings));

        let err = client.connection_for_db(1).await.unwrap_err();
        assert!(matches!(err, ClientError::ClusterDbSwitch));
    }

    #[tokio::test]
    async fn test_missing_certificate_file() {
        let settings = ConnectionSettings {
            ssl: true,
            ssl_ca_certs: Some("/nonexistent/redlink/ca.pem".into()),
            ..ConnectionSettings::default()
        };

        let Err(err) = tls_certificates(&settings).await else {
            panic!("expected a certificate error");
        };
        assert!(matches!(err, ClientError::Certificate { .. }));
    }

    #[tokio::test]
    async fn test_no_certificates_without_tls() {
        let settings = ConnectionSettings {
            ssl_ca_certs: Some("/nonexistent/redlink/ca.pem".into()),
            ..ConnectionSettings::default()
        };

        let Ok(certs) = tls_certificates(&settings).await else {
            panic!("expected no certificate lookup");
        };
        assert!(certs.is_none());
    }

    #[tokio::test]
    async fn test_refused_connect_fails_fast() {
        let settings = ConnectionSettings {
            port: 1,
            ..ConnectionSettings::default()
        };
        let client = StoreClient::new(Arc::new(settings));

        let result = tokio::time::timeout(Duration::from_secs(10), client.connection()).await;
        assert!(matches!(result, Ok(Err(ClientError::Redis(_)))));
        assert_eq!(client.current_database().await, None);
    }

    #[tokio::test]
    async fn test_refused_connect_for_db_fails_fast() {
        let settings = ConnectionSettings {
            port: 1,
            ..ConnectionSettings::default()
        };
        let client = StoreClient::new(Arc::new(settings));

        let result = tokio::time::timeout(Duration::from_secs(10), client.connection_for_db(3)).await;
        assert!(matches!(result, Ok(Err(ClientError::Redis(_)))));
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_default_connection_is_reused() {
        let client = StoreClient::new(Arc::new(ConnectionSettings::default()));

        client.connection().await.unwrap();
        assert_eq!(client.current_database().await, Some(0));
        client.connection().await.unwrap();
    }
}
