//! Command-line interface.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use redlink_client::StoreClient;
use redlink_config::ServerConfig;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "redlink")]
#[command(about = "Redlink - Redis connection settings and server tools", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Print the connection URI
    Uri {
        /// Show the password instead of masking it
        #[arg(long)]
        reveal: bool,
    },
    /// List blocked databases, one per line
    Blocked,
    /// Check whether a database is blocked (exit code 1 if it is)
    Check {
        /// Database index
        #[arg(allow_hyphen_values = true)]
        db: i64,
    },
    /// Print the number of keys in the configured database
    Dbsize,
    /// Print server information as JSON
    Info {
        /// INFO section (default, memory, cpu, keyspace, ...)
        #[arg(default_value = "default")]
        section: String,
    },
    /// Print connected clients as JSON
    Clients,
    /// Print keyspace info and the database count for the current database as JSON
    Current,
    /// Print key counts for every logical database as JSON
    Databases,
    /// Check that another database can be selected and report the result
    Switch {
        /// Database index
        #[arg(allow_hyphen_values = true)]
        db: i64,
    },
}

/// Runs a command against the loaded configuration.
pub async fn run(cli: Cli, config: ServerConfig) -> Result<ExitCode> {
    debug!(transport = %config.transport, settings = ?config.redis, "Configuration loaded");
    let settings = Arc::new(config.redis);

    match cli.command {
        Commands::Uri { reveal } => {
            let uri = if reveal {
                settings.connection_uri()
            } else {
                settings.redacted_uri()
            };
            println!("{uri}");
        }
        Commands::Blocked => {
            for db in settings.blocked_databases() {
                println!("{db}");
            }
        }
        Commands::Check { db } => {
            if settings.is_database_blocked(db) {
                println!("Database {db} is blocked");
                return Ok(ExitCode::FAILURE);
            }
            println!("Database {db} is not blocked");
        }
        Commands::Dbsize => {
            let client = StoreClient::new(settings);
            let size = client.dbsize().await.context("Error getting database size")?;
            println!("{size}");
        }
        Commands::Info { section } => {
            let client = StoreClient::new(settings);
            let info = client
                .info(&section)
                .await
                .context("Error retrieving Redis info")?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Clients => {
            let client = StoreClient::new(settings);
            let clients = client
                .client_list()
                .await
                .context("Error retrieving client list")?;
            println!("{}", serde_json::to_string_pretty(&clients)?);
        }
        Commands::Current => {
            let client = StoreClient::new(settings);
            let overview = client
                .database_overview()
                .await
                .context("Error getting database info")?;
            println!("{}", serde_json::to_string_pretty(&overview)?);
        }
        Commands::Databases => {
            let client = StoreClient::new(settings);
            let listing = client
                .list_all_databases()
                .await
                .context("Error listing databases")?;
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        Commands::Switch { db } => {
            let client = StoreClient::new(settings);
            client
                .switch_database(db)
                .await
                .with_context(|| format!("Error switching to database {db}"))?;
            info!(redis.db = db, "Database switch verified");
            println!("Database {db} is selectable");
        }
    }

    Ok(ExitCode::SUCCESS)
}
