use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use redlink::cli::{self, Cli};
use redlink::config::ServerConfig;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv().ok();

    let cli = Cli::parse();
    let _guard = redlink::logging::init_tracing();

    let config = ServerConfig::from_env().context("Invalid Redis configuration")?;

    cli::run(cli, config).await
}
