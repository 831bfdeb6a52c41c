//! Tern Orchestrator
//!
//! Serves the HTTP API, owns the database, and runs dispatched jobs in
//! process through the job runner.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tern_runner::{ContainerStepExecutor, GitFetcher, JobRunner, PodmanGateway, RunnerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;

use config::Cli;
use repository::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tern_orchestrator=debug,tern_runner=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    tracing::info!("Starting Tern Orchestrator...");

    let runner_config = RunnerConfig::from_env().context("Invalid runner configuration")?;
    runner_config
        .validate()
        .context("Invalid runner configuration")?;

    tracing::info!("Connecting to database...");

    let pool = db::create_pool(&cli.database_url, cli.max_connections)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Database connection pool created");

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let gateway = PodmanGateway::new(runner_config.container_engine.clone());
    if let Err(e) = gateway.check_available().await {
        tracing::warn!("Container engine not usable, every step will fail: {:#}", e);
    }

    let store = Arc::new(PgStore::new(pool.clone()));
    let steps = ContainerStepExecutor::new(
        Arc::new(gateway),
        runner_config.container_workdir.clone(),
    );
    let fetcher = GitFetcher::new(runner_config.git_binary.clone());

    tracing::info!(
        "Runs will use workspaces under {}",
        runner_config.workspace_base.display()
    );

    let runner = Arc::new(JobRunner::new(
        runner_config,
        Arc::new(fetcher),
        Arc::new(steps),
        store.clone(),
        store,
    ));

    // Build router with all API endpoints
    let app = api::create_router(api::AppState { pool, runner });

    tracing::info!("Listening on {}", cli.bind_addr);

    let listener = tokio::net::TcpListener::bind(&cli.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", cli.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
