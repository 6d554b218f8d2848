use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub modules: HealthModules,
}

#[derive(Debug, Serialize)]
pub struct HealthModules {
    pub search: SearchStatus,
    pub database: DatabaseStatus,
    pub quotes: QuotesStatus,
    pub admin: AdminStatus,
    pub feed: FeedStatus,
}

#[derive(Debug, Serialize)]
pub struct SearchStatus {
    pub enabled: bool,
    pub doc_count: u64,
}

#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct QuotesStatus {
    /// Reads work with a database; writes also need the visitor cookie.
    pub readable: bool,
    pub writable: bool,
    pub cookie_ready: bool,
}

#[derive(Debug, Serialize)]
pub struct AdminStatus {
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct FeedStatus {
    pub subscribers: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_configured = state.db.is_some();
    let cookie_ready = is_set(state.config.cookie_secret.as_deref());
    let admin_configured = is_set(state.config.admin_password_hash.as_deref())
        && is_set(state.config.admin_token_secret.as_deref());

    Json(HealthResponse {
        status: "ok",
        modules: HealthModules {
            search: SearchStatus {
                enabled: true,
                doc_count: state.search.stats().num_docs,
            },
            database: DatabaseStatus {
                configured: db_configured,
            },
            quotes: QuotesStatus {
                readable: db_configured,
                writable: db_configured && cookie_ready,
                cookie_ready,
            },
            admin: AdminStatus {
                configured: admin_configured,
            },
            feed: FeedStatus {
                subscribers: state.feed.subscriber_count(),
            },
        },
    })
}

fn is_set(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.is_empty())
}
