use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::http::middleware::{admin_auth, query_limit, visitor_cookie};
use crate::http::routes::{admin, comments, health, quotes, search, stream};
use crate::state::AppState;

pub fn build(state: AppState) -> Router {
    let cors = build_cors(&state);
    let mut router = Router::new()
        .route("/health", get(health::health))
        .route(
            "/v2/quotes",
            get(quotes::list_quotes)
                .layer(middleware::from_fn(query_limit::enforce_query_length))
                .post(quotes::create_quote),
        )
        .route("/v2/quotes/daily", get(quotes::daily_quote))
        .route("/v2/quotes/stream", get(stream::quotes_stream))
        .route("/v2/quotes/{id}", get(quotes::get_quote))
        .route("/v2/quotes/{id}/vote", put(quotes::vote_quote))
        .route(
            "/v2/quotes/{id}/comments",
            get(comments::get_comments).post(comments::create_comment),
        )
        .route(
            "/v2/quotes/{id}/comments/stream",
            get(stream::comments_stream),
        )
        .route(
            "/v2/quotes/{id}/comments/{comment_id}/vote",
            put(comments::vote_comment),
        )
        .route(
            "/v2/search",
            get(search::search).layer(middleware::from_fn(query_limit::enforce_query_length)),
        )
        .route("/v2/admin/login", post(admin::auth::login))
        .route(
            "/v2/admin/quotes/{id}",
            delete(admin::moderation::delete_quote),
        )
        .route(
            "/v2/admin/quotes/{id}/comments/{comment_id}",
            delete(admin::moderation::delete_comment),
        )
        .route(
            "/v2/admin/search/reindex",
            post(admin::search_index::post_search_reindex),
        )
        .route(
            "/v2/admin/search/refresh",
            post(admin::search_index::post_search_refresh),
        )
        .route(
            "/v2/admin/search/status",
            get(admin::search_index::get_search_status),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            visitor_cookie::ensure_visitor_cookie,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth::require_admin,
        ))
        .with_state(state);
    if let Some(cors) = cors {
        router = router.layer(cors);
    }
    router
}

fn build_cors(state: &AppState) -> Option<CorsLayer> {
    let (allow_any, origins) = collect_origins(&state.config.cors_allow_origins);
    if !allow_any && origins.is_empty() {
        return None;
    }
    let cors = CorsLayer::new().allow_methods([
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ]);
    if allow_any {
        Some(cors.allow_origin(Any).allow_headers(Any))
    } else {
        Some(
            cors.allow_origin(AllowOrigin::list(origins))
                .allow_credentials(true)
                .allow_headers([CONTENT_TYPE, AUTHORIZATION]),
        )
    }
}

/// A `*` entry anywhere wins over explicit origins.
fn collect_origins(configured: &[String]) -> (bool, Vec<HeaderValue>) {
    let mut origins = Vec::new();
    for origin in configured {
        let origin = origin.trim();
        if origin == "*" {
            return (true, Vec::new());
        }
        match HeaderValue::from_str(origin) {
            Ok(value) => origins.push(value),
            Err(_) => tracing::warn!(origin, "invalid CORS origin ignored"),
        }
    }
    (false, origins)
}

#[cfg(test)]
mod tests {
    use super::collect_origins;

    #[test]
    fn wildcard_origin_allows_any() {
        let (allow_any, origins) =
            collect_origins(&["https://a.example".to_string(), " * ".to_string()]);
        assert!(allow_any);
        assert!(origins.is_empty());
    }

    #[test]
    fn explicit_origins_are_kept() {
        let (allow_any, origins) = collect_origins(&["https://a.example".to_string()]);
        assert!(!allow_any);
        assert_eq!(origins.len(), 1);
    }

    #[test]
    fn no_origins_disables_cors() {
        let (allow_any, origins) = collect_origins(&[]);
        assert!(!allow_any);
        assert!(origins.is_empty());
    }
}
