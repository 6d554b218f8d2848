mod cli;
mod config;
mod feed;
mod http;
mod jobs;
mod state;
mod wiring;

use clap::Parser;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::{AppConfig, ConfigError};
use crate::http::HttpError;
use crate::jobs::JobError;
use crate::state::AppState;
use crate::wiring::WiringError;
use quottit_infra::db::{run_migrations, DbPoolError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid cli: {0}")]
    InvalidCli(String),
    #[error("wiring error: {0}")]
    Wiring(#[from] WiringError),
    #[error("db error: {0}")]
    Db(#[from] DbPoolError),
    #[error("http error: {0}")]
    Http(#[from] HttpError),
    #[error("job error: {0}")]
    Jobs(#[from] JobError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    config::load_dotenv()?;
    let config = AppConfig::from_env()?;
    if cli.import.is_some() && config.database_url.is_none() {
        return Err(AppError::InvalidCli(
            "--import requires QUOTTIT_DATABASE_URL".to_string(),
        ));
    }

    let state = wiring::build_state(config)?;
    if let Some(pool) = state.db.as_ref() {
        run_migrations(pool).await?;
        info!("database migrations applied");
    }

    if let Some(location) = cli.import.as_deref() {
        let stats = jobs::tasks::import::run(&state, location).await?;
        info!(
            found = stats.found,
            imported = stats.imported,
            failed = stats.failed,
            "quote import finished"
        );
        return Ok(());
    }

    run_services(&cli, state).await
}

/// Runs the selected services until one of them stops or ctrl-c arrives.
/// Dropping the set on return aborts whatever is still running.
async fn run_services(cli: &Cli, state: AppState) -> Result<(), AppError> {
    let mut services: JoinSet<Result<&'static str, AppError>> = JoinSet::new();
    if cli.mode.run_api() {
        let addr = state.config.http_addr;
        let api_state = state.clone();
        services.spawn(async move {
            http::serve(addr, api_state).await?;
            Ok("api")
        });
    }
    if cli.mode.run_worker() {
        let rebuild = cli.rebuild;
        let worker_state = state.clone();
        services.spawn(async move {
            info!(rebuild, "worker scheduler starting");
            jobs::start(worker_state, rebuild).await?;
            Ok("worker")
        });
    }
    if services.is_empty() {
        info!("no mode selected; exiting");
        return Ok(());
    }

    tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
        Some(finished) = services.join_next() => {
            let service = finished??;
            warn!(service, "service stopped unexpectedly");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
}
