pub mod scheduler;
pub mod tasks;

use thiserror::Error;
use tracing::{info, warn};

use crate::state::AppState;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("search index error: {0}")]
    Search(#[from] quottit_infra::search::SearchIndexError),
    #[error("quotes db error: {0}")]
    Quotes(#[from] quottit_infra::db::QuotesRepoError),
    #[error("import error: {0}")]
    Import(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("db not configured")]
    DbUnavailable,
}

pub async fn start(state: AppState, rebuild: bool) -> Result<(), JobError> {
    if rebuild {
        info!("rebuilding search index before scheduler");
        let stats = tasks::search_index::run(&state, true).await?;
        info!(?stats, "search index rebuild complete");
    }

    let refresh_interval = state.config.index_refresh_interval;
    if state.db.is_none() || refresh_interval.is_zero() {
        warn!(
            db_configured = state.db.is_some(),
            "search index refresh disabled; worker idle"
        );
        std::future::pending::<()>().await;
        return Ok(());
    }

    let refresh_state = state.clone();
    scheduler::run_interval("search_index_refresh", refresh_interval, move || {
        let state = refresh_state.clone();
        async move {
            match tasks::search_index::run(&state, false).await {
                Ok(stats) => info!(?stats, "search index refresh complete"),
                Err(err) => warn!(error = %err, "search index refresh failed"),
            }
            Ok(())
        }
    })
    .await
}
