use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::http::routes::ErrorBody;
use crate::state::AppState;
use quottit_core::domain::search::SearchResult;
use quottit_infra::search::{parse_query, QueryParseError, SearchIndexError};

const MAX_QUERY_LEN: usize = 256;
const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Error)]
pub enum SearchApiError {
    #[error("invalid query: {0}")]
    Query(#[from] QueryParseError),
    #[error("query too long (max {0} chars)")]
    QueryTooLong(usize),
    #[error("search failure: {0}")]
    Search(#[from] SearchIndexError),
}

/// Full-text quote search. `q` accepts keywords plus `tags:`, `author:`
/// and `range:` filters.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResult>, SearchApiError> {
    let query_text = params.q.unwrap_or_default();
    enforce_query_length(&query_text)?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIMIT)
        .min(state.config.max_search_limit);
    let offset = params.offset.unwrap_or(0);

    let query = parse_query(&query_text)?;
    debug!(query_text = %query_text, ?query, limit, offset, "parsed search query");
    let result = state.search.search(&query, limit, offset)?;
    Ok(Json(result))
}

fn enforce_query_length(query_text: &str) -> Result<(), SearchApiError> {
    if query_text.chars().count() > MAX_QUERY_LEN {
        return Err(SearchApiError::QueryTooLong(MAX_QUERY_LEN));
    }
    Ok(())
}

impl IntoResponse for SearchApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            SearchApiError::Query(_) | SearchApiError::QueryTooLong(_) => StatusCode::BAD_REQUEST,
            SearchApiError::Search(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::{enforce_query_length, SearchApiError, MAX_QUERY_LEN};
    use quottit_infra::search::QueryParseError;

    #[test]
    fn query_length_counts_chars_not_bytes() {
        let query = "é".repeat(MAX_QUERY_LEN);
        enforce_query_length(&query).unwrap();
        let err = enforce_query_length(&format!("{query}a")).unwrap_err();
        assert!(matches!(err, SearchApiError::QueryTooLong(_)));
    }

    #[test]
    fn parse_errors_are_bad_requests() {
        let response = SearchApiError::from(QueryParseError::EmptyQuery).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
