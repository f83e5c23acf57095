//! Server management operations.
//!
//! Thin wrappers over `DBSIZE`, `INFO`, `CLIENT LIST` and database selection,
//! with replies parsed into plain maps so they serialize cleanly.

use crate::{ClientError, StoreClient};
use redis::{FromRedisValue, Value};
use redlink_config::ConnectionSettings;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Number of logical databases scanned by [`StoreClient::list_all_databases`].
pub const DATABASE_SCAN_LIMIT: i64 = 16;

/// Databases assumed when `CONFIG GET databases` gives no usable answer.
pub const DEFAULT_DATABASE_COUNT: i64 = 16;

/// Parsed `INFO` reply.
///
/// A cluster fans `INFO` out to every primary and answers per node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ServerInfo {
    Node(BTreeMap<String, String>),
    /// Node address -> that node's fields.
    Cluster(BTreeMap<String, BTreeMap<String, String>>),
}

/// Keyspace summary of the currently selected database.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DatabaseOverview {
    /// Database of the default connection; `None` in cluster mode.
    pub current_database: Option<i64>,
    /// `databases` server setting.
    pub total_databases: i64,
    pub keyspace: ServerInfo,
}

/// Key count for one logical database.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DatabaseSummary {
    pub database: i64,
    pub keys: u64,
    pub has_data: bool,
    /// Blocked databases are listed but never queried.
    pub blocked: bool,
}

/// Result of scanning every logical database.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseListing {
    pub databases: Vec<DatabaseSummary>,
    /// Number of databases holding at least one key.
    pub total_found: usize,
}

/// Checks whether the client may move to `db`.
///
/// # Errors
///
/// - `ClientError::ClusterDbSwitch` in cluster mode
/// - `ClientError::DbSwitchDisabled` unless `ALLOW_DB_SWITCH` is set
/// - `ClientError::DatabaseBlocked` if `db` is in the blocked list
pub fn ensure_switch_allowed(settings: &ConnectionSettings, db: i64) -> Result<(), ClientError> {
    if settings.cluster_mode {
        return Err(ClientError::ClusterDbSwitch);
    }
    if !settings.allow_db_switch {
        return Err(ClientError::DbSwitchDisabled);
    }
    if settings.is_database_blocked(db) {
        return Err(ClientError::DatabaseBlocked(db));
    }
    Ok(())
}

impl StoreClient {
    /// Number of keys in the current database.
    #[instrument(skip(self), fields(redis.command = "DBSIZE"))]
    pub async fn dbsize(&self) -> Result<u64, ClientError> {
        let mut conn = self.connection().await?;
        let size = redis::cmd("DBSIZE").query_async(&mut conn).await?;
        Ok(size)
    }

    /// Server information for `section` (`default`, `memory`, `keyspace`, ...).
    #[instrument(skip(self), fields(redis.command = "INFO"))]
    pub async fn info(&self, section: &str) -> Result<ServerInfo, ClientError> {
        let mut conn = self.connection().await?;
        let reply: Value = redis::cmd("INFO")
            .arg(section)
            .query_async(&mut conn)
            .await?;
        parse_info_reply(&reply)
    }

    /// Connected clients, one map of fields per client.
    #[instrument(skip(self), fields(redis.command = "CLIENT LIST"))]
    pub async fn client_list(&self) -> Result<Vec<BTreeMap<String, String>>, ClientError> {
        let mut conn = self.connection().await?;
        let reply: Value = redis::cmd("CLIENT")
            .arg("LIST")
            .query_async(&mut conn)
            .await?;
        parse_client_list_reply(&reply)
    }

    /// Keyspace info and database count for the current database.
    ///
    /// Falls back to 16 databases if `CONFIG GET databases` is refused or
    /// unparseable.
    #[instrument(skip(self))]
    pub async fn database_overview(&self) -> Result<DatabaseOverview, ClientError> {
        let keyspace = self.info("keyspace").await?;

        let mut conn = self.connection().await?;
        let config: redis::RedisResult<BTreeMap<String, String>> = redis::cmd("CONFIG")
            .arg("GET")
            .arg("databases")
            .query_async(&mut conn)
            .await;
        let total_databases = match config {
            Ok(config) => parse_database_count(&config),
            Err(e) => {
                debug!(error = %e, "CONFIG GET databases failed; assuming default");
                DEFAULT_DATABASE_COUNT
            }
        };

        Ok(DatabaseOverview {
            current_database: self.current_database().await,
            total_databases,
            keyspace,
        })
    }

    /// Moves the default connection to `db`.
    ///
    /// The switch is refused in cluster mode, when switching is disabled, or
    /// when `db` is blocked. On success every later [`StoreClient::connection`]
    /// call returns a connection bound to `db`.
    #[instrument(skip(self), fields(redis.command = "SELECT"))]
    pub async fn switch_database(&self, db: i64) -> Result<(), ClientError> {
        if let Err(e) = ensure_switch_allowed(self.settings(), db) {
            warn!(redis.db = db, error = %e, "Database switch refused");
            return Err(e);
        }

        let conn = self.connection_for_db(db).await?;
        self.replace_default(db, conn).await;

        info!(redis.db = db, "Switched database");
        Ok(())
    }

    /// Key counts for databases `0..16`.
    ///
    /// Blocked databases are reported without being queried. Databases that
    /// cannot be reached are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ClusterDbSwitch` in cluster mode.
    #[instrument(skip(self))]
    pub async fn list_all_databases(&self) -> Result<DatabaseListing, ClientError> {
        if self.settings().cluster_mode {
            return Err(ClientError::ClusterDbSwitch);
        }

        let mut listing = DatabaseListing::default();

        for db in 0..DATABASE_SCAN_LIMIT {
            if self.settings().is_database_blocked(db) {
                listing.databases.push(DatabaseSummary {
                    database: db,
                    keys: 0,
                    has_data: false,
                    blocked: true,
                });
                continue;
            }

            let keys = match self.count_keys(db).await {
                Ok(keys) => keys,
                Err(e) => {
                    debug!(redis.db = db, error = %e, "Skipping unreachable database");
                    continue;
                }
            };

            listing.databases.push(DatabaseSummary {
                database: db,
                keys,
                has_data: keys > 0,
                blocked: false,
            });
        }

        listing.total_found = listing.databases.iter().filter(|d| d.has_data).count();
        Ok(listing)
    }

    async fn count_keys(&self, db: i64) -> Result<u64, ClientError> {
        let mut conn = self.connection_for_db(db).await?;
        let size = redis::cmd("DBSIZE").query_async(&mut conn).await?;
        Ok(size)
    }
}

/// Parses an `INFO` reply into `field -> value`.
///
/// Section headers (`# Server`) and blank lines are skipped. Values keep any
/// further colons.
pub fn parse_info(raw: &str) -> BTreeMap<String, String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Parses a raw `INFO` reply, per node when the reply comes from a cluster.
pub fn parse_info_reply(reply: &Value) -> Result<ServerInfo, ClientError> {
    match reply {
        Value::Map(nodes) => {
            let mut per_node = BTreeMap::new();
            for (node, raw) in nodes {
                let node = String::from_redis_value(node)?;
                let raw = String::from_redis_value(raw)?;
                per_node.insert(node, parse_info(&raw));
            }
            Ok(ServerInfo::Cluster(per_node))
        }
        other => Ok(ServerInfo::Node(parse_info(&String::from_redis_value(other)?))),
    }
}

/// Parses a raw `CLIENT LIST` reply. Cluster replies are merged across nodes.
pub fn parse_client_list_reply(
    reply: &Value,
) -> Result<Vec<BTreeMap<String, String>>, ClientError> {
    match reply {
        Value::Map(nodes) => {
            let mut clients = Vec::new();
            for (_, raw) in nodes {
                clients.extend(parse_client_list(&String::from_redis_value(raw)?));
            }
            Ok(clients)
        }
        other => Ok(parse_client_list(&String::from_redis_value(other)?)),
    }
}

/// Reads `databases` from a `CONFIG GET databases` reply.
pub fn parse_database_count(config: &BTreeMap<String, String>) -> i64 {
    config
        .get("databases")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|count| *count > 0)
        .unwrap_or(DEFAULT_DATABASE_COUNT)
}

/// Parses a `CLIENT LIST` reply. Each line is one client made of
/// space-separated `field=value` pairs.
pub fn parse_client_list(raw: &str) -> Vec<BTreeMap<String, String>> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split_whitespace()
                .filter_map(|pair| pair.split_once('='))
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn switchable() -> ConnectionSettings {
        ConnectionSettings {
            allow_db_switch: true,
            blocked_dbs: vec![0, 15],
            ..ConnectionSettings::default()
        }
    }

    #[test]
    fn test_switch_allowed() {
        assert!(ensure_switch_allowed(&switchable(), 3).is_ok());
    }

    #[test]
    fn test_switch_disabled_by_default() {
        let err = ensure_switch_allowed(&ConnectionSettings::default(), 3).unwrap_err();
        assert!(matches!(err, ClientError::DbSwitchDisabled));
    }

    #[test]
    fn test_switch_to_blocked_database() {
        let err = ensure_switch_allowed(&switchable(), 15).unwrap_err();
        assert!(matches!(err, ClientError::DatabaseBlocked(15)));
        assert_eq!(err.to_string(), "Database 15 is blocked");
    }

    #[test]
    fn test_switch_in_cluster_mode() {
        let settings = ConnectionSettings {
            cluster_mode: true,
            ..switchable()
        };
        let err = ensure_switch_allowed(&settings, 3).unwrap_err();
        assert!(matches!(err, ClientError::ClusterDbSwitch));
    }

    #[tokio::test]
    async fn test_switch_database_refused_without_network() {
        let client = StoreClient::new(Arc::new(switchable()));

        let err = client.switch_database(0).await.unwrap_err();
        assert!(matches!(err, ClientError::DatabaseBlocked(0)));
        assert_eq!(client.current_database().await, None);
    }

    #[tokio::test]
    async fn test_list_all_databases_rejected_in_cluster_mode() {
        let settings = ConnectionSettings {
            cluster_mode: true,
            ..ConnectionSettings::default()
        };
        let client = StoreClient::new(Arc::new(settings));

        assert!(matches!(
            client.list_all_databases().await,
            Err(ClientError::ClusterDbSwitch)
        ));
    }

    #[test]
    fn test_parse_info() {
        let raw = "# Server\r\nredis_version:7.2.4\r\nexecutable:/usr/bin/redis-server\r\n\r\n# Keyspace\r\ndb0:keys=3,expires=0,avg_ttl=0\r\n";
        let info = parse_info(raw);

        assert_eq!(info.len(), 3);
        assert_eq!(info["redis_version"], "7.2.4");
        assert_eq!(info["executable"], "/usr/bin/redis-server");
        assert_eq!(info["db0"], "keys=3,expires=0,avg_ttl=0");
    }

    #[test]
    fn test_parse_client_list() {
        let raw = "id=3 addr=127.0.0.1:51234 name= db=0 cmd=client|list\n\
                   id=4 addr=127.0.0.1:51240 name=worker db=2 cmd=get\n";
        let clients = parse_client_list(raw);

        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0]["addr"], "127.0.0.1:51234");
        assert_eq!(clients[0]["name"], "");
        assert_eq!(clients[1]["name"], "worker");
        assert_eq!(clients[1]["db"], "2");
    }

    fn bulk(text: &str) -> Value {
        Value::BulkString(text.as_bytes().to_vec())
    }

    #[test]
    fn test_parse_single_node_info_reply() {
        let reply = bulk("# Keyspace\r\ndb0:keys=3,expires=0,avg_ttl=0\r\n");

        let ServerInfo::Node(info) = parse_info_reply(&reply).unwrap() else {
            panic!("expected a single node reply");
        };
        assert_eq!(info["db0"], "keys=3,expires=0,avg_ttl=0");
    }

    #[test]
    fn test_parse_cluster_info_reply() {
        let reply = Value::Map(vec![
            (bulk("10.0.0.1:7000"), bulk("# Server\r\nredis_version:7.2.4\r\n")),
            (bulk("10.0.0.2:7000"), bulk("# Server\r\nredis_version:7.2.5\r\n")),
        ]);

        let ServerInfo::Cluster(nodes) = parse_info_reply(&reply).unwrap() else {
            panic!("expected a per-node reply");
        };
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes["10.0.0.1:7000"]["redis_version"], "7.2.4");
        assert_eq!(nodes["10.0.0.2:7000"]["redis_version"], "7.2.5");

        let json = serde_json::to_value(ServerInfo::Cluster(nodes)).unwrap();
        assert_eq!(json["10.0.0.2:7000"]["redis_version"], "7.2.5");
    }

    #[test]
    fn test_parse_info_reply_rejects_non_text() {
        assert!(parse_info_reply(&Value::Int(3)).is_err());
    }

    #[test]
    fn test_parse_cluster_client_list_reply() {
        let reply = Value::Map(vec![
            (bulk("10.0.0.1:7000"), bulk("id=1 addr=10.0.0.9:5000 db=0\n")),
            (bulk("10.0.0.2:7000"), bulk("id=7 addr=10.0.0.9:5001 db=0\n")),
        ]);

        let clients = parse_client_list_reply(&reply).unwrap();
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[1]["id"], "7");
    }

    #[test]
    fn test_parse_database_count() {
        let mut config = BTreeMap::new();
        assert_eq!(parse_database_count(&config), 16);

        config.insert("databases".to_string(), "32".to_string());
        assert_eq!(parse_database_count(&config), 32);

        config.insert("databases".to_string(), "lots".to_string());
        assert_eq!(parse_database_count(&config), 16);
    }

    #[test]
    fn test_listing_serializes() {
        let listing = DatabaseListing {
            databases: vec![DatabaseSummary {
                database: 1,
                keys: 4,
                has_data: true,
                blocked: false,
            }],
            total_found: 1,
        };
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["total_found"], 1);
        assert_eq!(json["databases"][0]["keys"], 4);
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_dbsize_and_info() {
        let client = StoreClient::new(Arc::new(ConnectionSettings::default()));

        client.dbsize().await.unwrap();
        let ServerInfo::Node(info) = client.info("server").await.unwrap() else {
            panic!("expected a single node reply");
        };
        assert!(info.contains_key("redis_version"));

        let overview = client.database_overview().await.unwrap();
        assert_eq!(overview.current_database, Some(0));
        assert!(overview.total_databases > 0);
    }
}
