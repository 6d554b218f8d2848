use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::feed::QuoteEvent;
use crate::http::middleware::visitor_cookie::Visitor;
use crate::http::routes::{validate_record_id, ErrorBody, VoteRequest, VoteResponse};
use crate::state::AppState;
use quottit_core::domain::comments::{
    reply_depth, Comment, CommentThread, NewComment, MAX_REPLY_DEPTH,
};
use quottit_core::domain::identity::Identity;
use quottit_core::error::CoreError;
use quottit_core::types::vote::VoteDelta;
use quottit_infra::db::{
    adjust_comment_votes, find_quote, insert_comment, list_comments,
    new_record_id, CommentsRepoError, DbPool, QuotesRepoError,
};

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
    pub parent_id: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum CommentsApiError {
    #[error("{0}")]
    Invalid(#[from] CoreError),
    #[error("invalid id")]
    InvalidId,
    #[error("quote not found")]
    QuoteNotFound,
    #[error("parent comment not found")]
    ParentNotFound,
    #[error("comment not found")]
    CommentNotFound,
    #[error("db not configured")]
    DbUnavailable,
    #[error("db error: {0}")]
    Comments(#[from] CommentsRepoError),
    #[error("db error: {0}")]
    Quotes(#[from] QuotesRepoError),
}

pub async fn get_comments(
    State(state): State<AppState>,
    Path(quote_id): Path<String>,
) -> Result<Json<CommentThread>, CommentsApiError> {
    let quote_id = validate_record_id(&quote_id).ok_or(CommentsApiError::InvalidId)?;
    let pool = state.db.as_ref().ok_or(CommentsApiError::DbUnavailable)?;
    ensure_quote(pool, quote_id).await?;
    let snapshot = list_comments(pool, quote_id).await?;
    Ok(Json(CommentThread::from_snapshot(quote_id, &snapshot)))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(quote_id): Path<String>,
    Extension(visitor): Extension<Visitor>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Response, CommentsApiError> {
    let quote_id = validate_record_id(&quote_id).ok_or(CommentsApiError::InvalidId)?;
    let new_comment = NewComment::normalize(&payload.text, payload.parent_id.as_deref())?;
    let author = Identity::visitor(
        visitor.id(),
        payload.display_name.as_deref(),
        payload.avatar_url.as_deref(),
    )?;
    let pool = state.db.as_ref().ok_or(CommentsApiError::DbUnavailable)?;
    ensure_quote(pool, quote_id).await?;
    if let Some(parent_id) = new_comment.parent_id.as_deref() {
        let parent_id = validate_record_id(parent_id).ok_or(CommentsApiError::InvalidId)?;
        let snapshot = list_comments(pool, quote_id).await?;
        let depth = reply_depth(&snapshot, parent_id).ok_or(CommentsApiError::ParentNotFound)?;
        check_reply_depth(depth)?;
    }

    let comment = Comment {
        id: new_record_id(),
        quote_id: quote_id.to_string(),
        text: new_comment.text,
        author,
        votes: 0,
        created_at: Utc::now(),
        parent_id: new_comment.parent_id,
    };
    insert_comment(pool, &comment).await?;
    info!(
        quote_id = %comment.quote_id,
        comment_id = %comment.id,
        reply = comment.parent_id.is_some(),
        "comment posted"
    );
    state.feed.publish(QuoteEvent::CommentsChanged {
        quote_id: comment.quote_id.clone(),
    });
    Ok((StatusCode::CREATED, Json(comment)).into_response())
}

pub async fn vote_comment(
    State(state): State<AppState>,
    Path((quote_id, comment_id)): Path<(String, String)>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, CommentsApiError> {
    let quote_id = validate_record_id(&quote_id).ok_or(CommentsApiError::InvalidId)?;
    let comment_id = validate_record_id(&comment_id).ok_or(CommentsApiError::InvalidId)?;
    let delta = VoteDelta::try_from(payload.delta)?;
    let pool = state.db.as_ref().ok_or(CommentsApiError::DbUnavailable)?;
    let votes = adjust_comment_votes(pool, quote_id, comment_id, delta)
        .await?
        .ok_or(CommentsApiError::CommentNotFound)?;
    state.feed.publish(QuoteEvent::CommentsChanged {
        quote_id: quote_id.to_string(),
    });
    Ok(Json(VoteResponse {
        id: comment_id.to_string(),
        votes,
    }))
}

async fn ensure_quote(pool: &DbPool, quote_id: &str) -> Result<(), CommentsApiError> {
    match find_quote(pool, quote_id).await? {
        Some(_) => Ok(()),
        None => Err(CommentsApiError::QuoteNotFound),
    }
}

fn check_reply_depth(depth: usize) -> Result<(), CommentsApiError> {
    if depth > MAX_REPLY_DEPTH {
        return Err(CoreError::TooDeep(MAX_REPLY_DEPTH).into());
    }
    Ok(())
}

impl IntoResponse for CommentsApiError {
    fn into_response(self) -> Response {
        let status = match self {
            CommentsApiError::Invalid(_) | CommentsApiError::InvalidId => StatusCode::BAD_REQUEST,
            CommentsApiError::QuoteNotFound
            | CommentsApiError::ParentNotFound
            | CommentsApiError::CommentNotFound => StatusCode::NOT_FOUND,
            CommentsApiError::DbUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            CommentsApiError::Comments(_) | CommentsApiError::Quotes(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
