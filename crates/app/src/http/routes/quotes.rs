use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::feed::QuoteEvent;
use crate::http::middleware::visitor_cookie::Visitor;
use crate::http::routes::{validate_record_id, ErrorBody, VoteRequest, VoteResponse};
use crate::state::AppState;
use quottit_core::domain::identity::Identity;
use quottit_core::domain::quotes::{
    quote_of_the_day, sort_quotes, NewQuote, Quote, QuoteFilter, QuoteSort,
};
use quottit_core::error::CoreError;
use quottit_core::types::vote::VoteDelta;
use quottit_infra::db::{adjust_quote_votes, find_quote, insert_quote, QuotesRepoError};
use quottit_infra::search::document_for_quote;

const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub sort: Option<String>,
    pub tag: Option<String>,
    pub author: Option<String>,
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct QuoteListResponse {
    pub total: usize,
    pub quotes: Vec<RankedQuote>,
}

/// A quote with its 1-based position in the sorted, filtered list.
#[derive(Debug, Serialize)]
pub struct RankedQuote {
    pub rank: usize,
    #[serde(flatten)]
    pub quote: Quote,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuoteRequest {
    pub text: String,
    pub author: Option<String>,
    pub source: Option<String>,
    pub tags: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DailyParams {
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DailyQuoteResponse {
    pub date: String,
    pub quote: Quote,
}

#[derive(Debug, Error)]
pub enum QuotesApiError {
    #[error("{0}")]
    Invalid(#[from] CoreError),
    #[error("invalid quote id")]
    InvalidId,
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("quote not found")]
    NotFound,
    #[error("no quotes yet")]
    NoQuotes,
    #[error("db not configured")]
    DbUnavailable,
    #[error("db error: {0}")]
    Db(#[from] QuotesRepoError),
}

pub async fn list_quotes(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<QuoteListResponse>, QuotesApiError> {
    let sort = QuoteSort::parse(params.sort.as_deref())?;
    let filter = QuoteFilter::new(
        params.tag.as_deref(),
        params.author.as_deref(),
        params.q.as_deref(),
    )?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(state.config.max_list_limit);
    let offset = params.offset.unwrap_or(0);
    let pool = state.db.as_ref().ok_or(QuotesApiError::DbUnavailable)?;
    let quotes = quottit_infra::db::list_quotes(pool).await?;
    Ok(Json(select_quotes(quotes, sort, &filter, offset, limit)))
}

pub async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Quote>, QuotesApiError> {
    let id = validate_record_id(&id).ok_or(QuotesApiError::InvalidId)?;
    let pool = state.db.as_ref().ok_or(QuotesApiError::DbUnavailable)?;
    let quote = find_quote(pool, id).await?.ok_or(QuotesApiError::NotFound)?;
    Ok(Json(quote))
}

pub async fn create_quote(
    State(state): State<AppState>,
    Extension(visitor): Extension<Visitor>,
    Json(payload): Json<CreateQuoteRequest>,
) -> Result<Response, QuotesApiError> {
    let new_quote = NewQuote::normalize(
        &payload.text,
        payload.author.as_deref(),
        payload.source.as_deref(),
        payload.tags.as_deref(),
    )?;
    let submitter = Identity::visitor(
        visitor.id(),
        payload.display_name.as_deref(),
        payload.avatar_url.as_deref(),
    )?;
    let pool = state.db.as_ref().ok_or(QuotesApiError::DbUnavailable)?;
    let quote = insert_quote(pool, &new_quote, Some(&submitter), Utc::now()).await?;
    info!(quote_id = %quote.id, author = %quote.author, "quote submitted");

    if let Err(err) = state.search.upsert_documents(&[document_for_quote(&quote)]) {
        warn!(error = %err, quote_id = %quote.id, "failed to index new quote");
    }
    state.feed.publish(QuoteEvent::QuotesChanged);
    Ok((StatusCode::CREATED, Json(quote)).into_response())
}

pub async fn vote_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, QuotesApiError> {
    let id = validate_record_id(&id).ok_or(QuotesApiError::InvalidId)?;
    let delta = VoteDelta::try_from(payload.delta)?;
    let pool = state.db.as_ref().ok_or(QuotesApiError::DbUnavailable)?;
    let votes = adjust_quote_votes(pool, id, delta)
        .await?
        .ok_or(QuotesApiError::NotFound)?;
    state.feed.publish(QuoteEvent::QuotesChanged);
    Ok(Json(VoteResponse {
        id: id.to_string(),
        votes,
    }))
}

pub async fn daily_quote(
    State(state): State<AppState>,
    Query(params): Query<DailyParams>,
) -> Result<Json<DailyQuoteResponse>, QuotesApiError> {
    let date = resolve_date(params.date.as_deref())?;
    let pool = state.db.as_ref().ok_or(QuotesApiError::DbUnavailable)?;
    let quotes = quottit_infra::db::list_quotes(pool).await?;
    let quote = quote_of_the_day(&quotes, date)
        .cloned()
        .ok_or(QuotesApiError::NoQuotes)?;
    Ok(Json(DailyQuoteResponse {
        date: date.to_string(),
        quote,
    }))
}

/// Filters, sorts, then pages; `total` counts matches before paging.
pub(crate) fn select_quotes(
    mut quotes: Vec<Quote>,
    sort: QuoteSort,
    filter: &QuoteFilter,
    offset: usize,
    limit: usize,
) -> QuoteListResponse {
    if !filter.is_empty() {
        quotes.retain(|quote| filter.matches(quote));
    }
    sort_quotes(&mut quotes, sort);
    let total = quotes.len();
    let quotes = quotes
        .into_iter()
        .enumerate()
        .skip(offset)
        .take(limit)
        .map(|(idx, quote)| RankedQuote {
            rank: idx + 1,
            quote,
        })
        .collect();
    QuoteListResponse { total, quotes }
}

fn resolve_date(raw: Option<&str>) -> Result<NaiveDate, QuotesApiError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| QuotesApiError::InvalidDate(value.to_string())),
        None => Ok(Utc::now().date_naive()),
    }
}

impl IntoResponse for QuotesApiError {
    fn into_response(self) -> Response {
        let status = match self {
            QuotesApiError::Invalid(_)
            | QuotesApiError::InvalidId
            | QuotesApiError::InvalidDate(_) => StatusCode::BAD_REQUEST,
            QuotesApiError::NotFound | QuotesApiError::NoQuotes => StatusCode::NOT_FOUND,
            QuotesApiError::DbUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            QuotesApiError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;

    fn quote(id: &str, votes: i64, ms: i64, tags: &str) -> Quote {
        Quote {
            id: id.to_string(),
            text: format!("text of {id}"),
            author: "Marcus Aurelius".to_string(),
            source: None,
            tags: Some(tags.to_string()),
            votes,
            created_at: DateTime::<Utc>::from_timestamp_millis(ms).unwrap(),
            submitted_by: None,
        }
    }

    fn sample() -> Vec<Quote> {
        vec![
            quote("a", 1, 10, "stoicism"),
            quote("b", 5, 20, "life"),
            quote("c", 5, 30, "stoicism, life"),
            quote("d", -2, 40, "stoicism"),
        ]
    }

    fn ids(response: &QuoteListResponse) -> Vec<&str> {
        response
            .quotes
            .iter()
            .map(|ranked| ranked.quote.id.as_str())
            .collect()
    }

    #[test]
    fn votes_sort_is_stable_and_ranked() {
        let response = select_quotes(sample(), QuoteSort::Votes, &QuoteFilter::default(), 0, 10);
        assert_eq!(response.total, 4);
        assert_eq!(ids(&response), vec!["b", "c", "a", "d"]);
        let ranks: Vec<usize> = response.quotes.iter().map(|ranked| ranked.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn latest_sort_puts_newest_first() {
        let response = select_quotes(sample(), QuoteSort::Latest, &QuoteFilter::default(), 0, 10);
        assert_eq!(ids(&response), vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn filter_applies_before_paging() {
        let filter = QuoteFilter::new(Some("Stoicism"), None, None).unwrap();
        let response = select_quotes(sample(), QuoteSort::Votes, &filter, 1, 1);
        assert_eq!(response.total, 3);
        assert_eq!(ids(&response), vec!["a"]);
        assert_eq!(response.quotes[0].rank, 2);
    }

    #[test]
    fn offset_past_end_is_empty() {
        let response = select_quotes(sample(), QuoteSort::Votes, &QuoteFilter::default(), 9, 5);
        assert_eq!(response.total, 4);
        assert!(response.quotes.is_empty());
    }

    #[test]
    fn ranked_quote_serializes_flat() {
        let response = select_quotes(sample(), QuoteSort::Votes, &QuoteFilter::default(), 0, 1);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["quotes"][0]["rank"], 1);
        assert_eq!(value["quotes"][0]["id"], "b");
        assert_eq!(value["quotes"][0]["timestamp"], 20);
    }

    #[test]
    fn resolve_date_parses_or_defaults() {
        assert_eq!(
            resolve_date(Some("2024-02-29")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(resolve_date(None).unwrap(), Utc::now().date_naive());
        assert!(matches!(
            resolve_date(Some("2024-13-01")),
            Err(QuotesApiError::InvalidDate(_))
        ));
    }
}
