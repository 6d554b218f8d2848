use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::feed::ChangeFeed;
use quottit_infra::db::DbPool;
use quottit_infra::search::SearchIndex;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub search: Arc<SearchIndex>,
    pub http_client: Client,
    pub db: Option<DbPool>,
    pub feed: Arc<ChangeFeed>,
    pub job_health: Arc<Mutex<JobHealth>>,
}

#[derive(Debug, Default, Clone)]
pub struct JobHealth {
    pub index_refresh_last_run: Option<DateTime<Utc>>,
    pub index_refresh_last_success: Option<DateTime<Utc>>,
}
