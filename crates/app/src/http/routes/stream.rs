use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream::{self, Stream};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, warn};

use crate::feed::QuoteEvent;
use crate::http::routes::quotes::select_quotes;
use crate::http::routes::{validate_record_id, ErrorBody};
use crate::state::AppState;
use quottit_core::domain::comments::CommentThread;
use quottit_core::domain::quotes::{QuoteFilter, QuoteSort};
use quottit_core::error::CoreError;
use quottit_infra::db::{find_quote, list_comments, list_quotes, QuotesRepoError};

#[derive(Debug, Deserialize)]
pub struct QuoteStreamParams {
    pub sort: Option<String>,
}

#[derive(Debug, Error)]
pub enum StreamApiError {
    #[error("{0}")]
    Invalid(#[from] CoreError),
    #[error("invalid quote id")]
    InvalidId,
    #[error("quote not found")]
    QuoteNotFound,
    #[error("db not configured")]
    DbUnavailable,
    #[error("db error: {0}")]
    Db(#[from] QuotesRepoError),
}

/// What a live stream is watching.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Topic {
    Quotes(QuoteSort),
    Thread(String),
}

impl Topic {
    fn is_touched_by(&self, event: &QuoteEvent) -> bool {
        match self {
            Topic::Quotes(_) => event.touches_quote_list(),
            Topic::Thread(quote_id) => event.touches_thread(quote_id),
        }
    }
}

struct Subscription {
    state: AppState,
    rx: Receiver<QuoteEvent>,
    topic: Topic,
    resync: bool,
}

/// Pushes the sorted quote list now and again after every quote change.
pub async fn quotes_stream(
    State(state): State<AppState>,
    Query(params): Query<QuoteStreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StreamApiError> {
    let sort = QuoteSort::parse(params.sort.as_deref())?;
    if state.db.is_none() {
        return Err(StreamApiError::DbUnavailable);
    }
    Ok(Sse::new(snapshot_stream(state, Topic::Quotes(sort))).keep_alive(KeepAlive::default()))
}

/// Pushes the rebuilt comment forest now and again after every change to
/// the quote's comments.
pub async fn comments_stream(
    State(state): State<AppState>,
    Path(quote_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StreamApiError> {
    let quote_id = validate_record_id(&quote_id)
        .ok_or(StreamApiError::InvalidId)?
        .to_string();
    let pool = state.db.as_ref().ok_or(StreamApiError::DbUnavailable)?;
    if find_quote(pool, &quote_id).await?.is_none() {
        return Err(StreamApiError::QuoteNotFound);
    }
    let events = snapshot_stream(state, Topic::Thread(quote_id));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn snapshot_stream(
    state: AppState,
    topic: Topic,
) -> impl Stream<Item = Result<Event, Infallible>> {
    // Subscribe before the first read so no write slips between the two.
    let rx = state.feed.subscribe();
    let subscription = Subscription {
        state,
        rx,
        topic,
        resync: true,
    };
    stream::unfold(subscription, |mut sub| async move {
        loop {
            if sub.resync {
                sub.resync = false;
                let event = snapshot_event(&sub.state, &sub.topic).await;
                return Some((Ok(event), sub));
            }
            match sub.rx.recv().await {
                Ok(event) if sub.topic.is_touched_by(&event) => sub.resync = true,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, topic = ?sub.topic, "stream lagged; resyncing");
                    sub.resync = true;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

async fn snapshot_event(state: &AppState, topic: &Topic) -> Event {
    let Some(pool) = state.db.as_ref() else {
        return error_event("db not configured");
    };
    let payload = match topic {
        Topic::Quotes(sort) => list_quotes(pool)
            .await
            .map_err(|err| err.to_string())
            .and_then(|quotes| {
                let limit = state.config.max_list_limit;
                let view = select_quotes(quotes, *sort, &QuoteFilter::default(), 0, limit);
                Event::default()
                    .event("snapshot")
                    .json_data(view)
                    .map_err(|err| err.to_string())
            }),
        Topic::Thread(quote_id) => list_comments(pool, quote_id)
            .await
            .map_err(|err| err.to_string())
            .and_then(|snapshot| {
                let thread = CommentThread::from_snapshot(quote_id.as_str(), &snapshot);
                Event::default()
                    .event("snapshot")
                    .json_data(thread)
                    .map_err(|err| err.to_string())
            }),
    };
    payload.unwrap_or_else(|message| {
        warn!(error = %message, ?topic, "failed to build stream snapshot");
        error_event(&message)
    })
}

fn error_event(message: &str) -> Event {
    Event::default().event("error").data(message)
}

impl IntoResponse for StreamApiError {
    fn into_response(self) -> Response {
        let status = match self {
            StreamApiError::Invalid(_) | StreamApiError::InvalidId => StatusCode::BAD_REQUEST,
            StreamApiError::QuoteNotFound => StatusCode::NOT_FOUND,
            StreamApiError::DbUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            StreamApiError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
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

    use super::{StreamApiError, Topic};
    use crate::feed::QuoteEvent;
    use quottit_core::domain::quotes::QuoteSort;

    #[test]
    fn unknown_quote_stream_is_not_found() {
        assert_eq!(
            StreamApiError::QuoteNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            StreamApiError::InvalidId.into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn quote_list_topic_ignores_comment_events() {
        let topic = Topic::Quotes(QuoteSort::Votes);
        assert!(topic.is_touched_by(&QuoteEvent::QuotesChanged));
        assert!(!topic.is_touched_by(&QuoteEvent::CommentsChanged {
            quote_id: "q1".to_string()
        }));
    }

    #[test]
    fn thread_topic_only_follows_its_quote() {
        let topic = Topic::Thread("q1".to_string());
        assert!(topic.is_touched_by(&QuoteEvent::CommentsChanged {
            quote_id: "q1".to_string()
        }));
        assert!(!topic.is_touched_by(&QuoteEvent::CommentsChanged {
            quote_id: "q2".to_string()
        }));
        assert!(!topic.is_touched_by(&QuoteEvent::QuotesChanged));
    }
}
