use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::http::routes::ErrorBody;
use crate::jobs::tasks::search_index::{self, JobStats};
use crate::jobs::JobError;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum SearchAdminError {
    #[error("{0}")]
    Job(#[from] JobError),
}

#[derive(Debug, Serialize)]
pub struct SearchIndexActionResponse {
    action: &'static str,
    stats: SearchJobStats,
}

#[derive(Debug, Serialize)]
pub struct SearchJobStats {
    fetched: usize,
    indexed: usize,
    skipped: usize,
    removed: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchIndexStatusResponse {
    index_dir: String,
    doc_count: u64,
    segment_count: usize,
    last_run: Option<DateTime<Utc>>,
    last_success: Option<DateTime<Utc>>,
}

pub async fn post_search_reindex(
    State(state): State<AppState>,
) -> Result<Json<SearchIndexActionResponse>, SearchAdminError> {
    let stats = search_index::run(&state, true).await?;
    info!(?stats, "admin search reindex complete");
    Ok(Json(SearchIndexActionResponse {
        action: "reindex",
        stats: stats.into(),
    }))
}

pub async fn post_search_refresh(
    State(state): State<AppState>,
) -> Result<Json<SearchIndexActionResponse>, SearchAdminError> {
    let stats = search_index::run(&state, false).await?;
    info!(?stats, "admin search refresh complete");
    Ok(Json(SearchIndexActionResponse {
        action: "refresh",
        stats: stats.into(),
    }))
}

pub async fn get_search_status(State(state): State<AppState>) -> Json<SearchIndexStatusResponse> {
    let stats = state.search.stats();
    let health = state.job_health.lock().await.clone();
    Json(SearchIndexStatusResponse {
        index_dir: state.config.index_dir.display().to_string(),
        doc_count: stats.num_docs,
        segment_count: stats.num_segments,
        last_run: health.index_refresh_last_run,
        last_success: health.index_refresh_last_success,
    })
}

impl From<JobStats> for SearchJobStats {
    fn from(stats: JobStats) -> Self {
        SearchJobStats {
            fetched: stats.fetched,
            indexed: stats.indexed,
            skipped: stats.skipped,
            removed: stats.removed,
        }
    }
}

impl IntoResponse for SearchAdminError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            SearchAdminError::Job(JobError::DbUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
            SearchAdminError::Job(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
