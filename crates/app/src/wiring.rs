use std::sync::Arc;

use reqwest::Client;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::feed::ChangeFeed;
use crate::state::{AppState, JobHealth};
use quottit_infra::db::{connect_lazy, DbPoolError};
use quottit_infra::search::{SearchIndex, SearchIndexError};

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("search index error: {0}")]
    SearchIndex(#[from] SearchIndexError),
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("db pool error: {0}")]
    Db(#[from] DbPoolError),
}

pub fn build_state(config: AppConfig) -> Result<AppState, WiringError> {
    let search = SearchIndex::open_or_create(&config.index_dir)?;
    let client = Client::builder().timeout(config.request_timeout).build()?;
    let db = match config.database_url.as_deref() {
        Some(url) => Some(connect_lazy(url, config.db_max_connections)?),
        None => {
            warn!("QUOTTIT_DATABASE_URL not set; quote and comment routes are disabled");
            None
        }
    };
    let feed = ChangeFeed::new(config.feed_capacity);
    info!(
        index_dir = %config.index_dir.display(),
        db_configured = db.is_some(),
        "application state wired"
    );
    Ok(AppState {
        config: Arc::new(config),
        search: Arc::new(search),
        http_client: client,
        db,
        feed: Arc::new(feed),
        job_health: Arc::new(Mutex::new(JobHealth::default())),
    })
}
