use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

const MAX_QUERY_STRING_LEN: usize = 1024;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Rejects oversized query strings on list and search routes before any
/// parsing happens.
pub async fn enforce_query_length(req: Request, next: Next) -> Response {
    if is_query_too_long(req.uri().query()) {
        let body = ErrorBody {
            error: format!("query string too long (max {MAX_QUERY_STRING_LEN} chars)"),
        };
        return (StatusCode::URI_TOO_LONG, axum::Json(body)).into_response();
    }
    next.run(req).await
}

fn is_query_too_long(query: Option<&str>) -> bool {
    query.is_some_and(|value| value.len() > MAX_QUERY_STRING_LEN)
}

#[cfg(test)]
mod tests {
    use super::{is_query_too_long, MAX_QUERY_STRING_LEN};

    #[test]
    fn missing_or_short_query_passes() {
        assert!(!is_query_too_long(None));
        assert!(!is_query_too_long(Some(&"q".repeat(MAX_QUERY_STRING_LEN))));
    }

    #[test]
    fn long_query_is_rejected() {
        assert!(is_query_too_long(Some(&"q".repeat(MAX_QUERY_STRING_LEN + 1))));
    }
}
