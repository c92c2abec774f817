//! git-json-api binary: process bootstrap.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use git_json_api::core::config::Config;
use git_json_api::http;
use git_json_api::repo::Repo;

/// Read/write HTTP API over a git repository of JSON files.
#[derive(Debug, Parser)]
#[command(name = "git-json-api", version, about)]
struct Cli {
    /// Path to a TOML config file (defaults to $GIT_JSON_API_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen port (overrides config and $PORT).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    let repo = Repo::open(&config)
        .await
        .with_context(|| format!("opening repository clone of '{}'", config.repo_uri))?;

    let app = http::router(repo);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("binding port {}", config.port))?;

    info!(port = config.port, repo = %config.repo_uri, "up and running");
    axum::serve(listener, app).await.context("serving")?;

    Ok(())
}
