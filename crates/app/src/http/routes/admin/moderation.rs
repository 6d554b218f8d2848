use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::feed::QuoteEvent;
use crate::http::routes::{validate_record_id, ErrorBody};
use crate::state::AppState;
use quottit_infra::db::{CommentsRepoError, QuotesRepoError};

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: String,
}

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("invalid id")]
    InvalidId,
    #[error("quote not found")]
    QuoteNotFound,
    #[error("comment not found")]
    CommentNotFound,
    #[error("db not configured")]
    DbUnavailable,
    #[error("db error: {0}")]
    Quotes(#[from] QuotesRepoError),
    #[error("db error: {0}")]
    Comments(#[from] CommentsRepoError),
}

/// Removes a quote together with its whole thread and drops it from search.
pub async fn delete_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ModerationError> {
    let id = validate_record_id(&id).ok_or(ModerationError::InvalidId)?;
    let pool = state.db.as_ref().ok_or(ModerationError::DbUnavailable)?;
    if !quottit_infra::db::delete_quote(pool, id).await? {
        return Err(ModerationError::QuoteNotFound);
    }
    info!(quote_id = id, "quote deleted by admin");
    if let Err(err) = state.search.delete_documents(&[id.to_string()]) {
        warn!(error = %err, quote_id = id, "failed to remove quote from search index");
    }
    state.feed.publish(QuoteEvent::QuotesChanged);
    state.feed.publish(QuoteEvent::CommentsChanged {
        quote_id: id.to_string(),
    });
    Ok(Json(DeletedResponse {
        deleted: id.to_string(),
    }))
}

/// Removes one comment; its replies stay and surface as roots.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((quote_id, comment_id)): Path<(String, String)>,
) -> Result<Json<DeletedResponse>, ModerationError> {
    let quote_id = validate_record_id(&quote_id).ok_or(ModerationError::InvalidId)?;
    let comment_id = validate_record_id(&comment_id).ok_or(ModerationError::InvalidId)?;
    let pool = state.db.as_ref().ok_or(ModerationError::DbUnavailable)?;
    if !quottit_infra::db::delete_comment(pool, quote_id, comment_id).await? {
        return Err(ModerationError::CommentNotFound);
    }
    info!(quote_id, comment_id, "comment deleted by admin");
    state.feed.publish(QuoteEvent::CommentsChanged {
        quote_id: quote_id.to_string(),
    });
    Ok(Json(DeletedResponse {
        deleted: comment_id.to_string(),
    }))
}

impl IntoResponse for ModerationError {
    fn into_response(self) -> Response {
        let status = match self {
            ModerationError::InvalidId => StatusCode::BAD_REQUEST,
            ModerationError::QuoteNotFound | ModerationError::CommentNotFound => {
                StatusCode::NOT_FOUND
            }
            ModerationError::DbUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ModerationError::Quotes(_) | ModerationError::Comments(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
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

    use super::ModerationError;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            ModerationError::InvalidId.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ModerationError::CommentNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ModerationError::DbUnavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
