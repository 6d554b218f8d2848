use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;

use crate::http::routes::ErrorBody;
use crate::state::AppState;

const ADMIN_COOKIE_NAME: &str = "quottit_admin";
const ADMIN_PREFIX: &str = "/v2/admin";
const LOGIN_PATH: &str = "/v2/admin/login";

#[derive(Debug, Error)]
pub enum AdminAuthError {
    #[error("admin auth not configured")]
    MissingConfig,
    #[error("admin token required")]
    MissingToken,
    #[error("admin token invalid")]
    InvalidToken,
}

#[derive(Debug, Serialize, Deserialize)]
struct AdminTokenPayload {
    exp: i64,
}

/// Guards every moderation route; the login route stays open.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AdminAuthError> {
    let path = request.uri().path();
    if !path.starts_with(ADMIN_PREFIX) || path == LOGIN_PATH {
        return Ok(next.run(request).await);
    }

    let secret = state
        .config
        .admin_token_secret
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or(AdminAuthError::MissingConfig)?;

    let token = extract_bearer_token(request.headers())
        .or_else(|| extract_cookie(request.headers(), ADMIN_COOKIE_NAME))
        .ok_or(AdminAuthError::MissingToken)?;
    if !verify_token(secret, &token, Utc::now().timestamp()) {
        warn!(path, "rejected admin token");
        return Err(AdminAuthError::InvalidToken);
    }
    Ok(next.run(request).await)
}

/// `<payload>.<signature>` where the payload is base64url JSON `{exp}`.
pub fn issue_token(secret: &str, max_age_secs: i64) -> Result<String, AdminAuthError> {
    let exp = Utc::now().timestamp().saturating_add(max_age_secs);
    let json =
        serde_json::to_vec(&AdminTokenPayload { exp }).map_err(|_| AdminAuthError::InvalidToken)?;
    let payload_b64 = URL_SAFE_NO_PAD.encode(json);
    let signature = URL_SAFE_NO_PAD.encode(token_mac(secret, &payload_b64).finalize().into_bytes());
    Ok(format!("{payload_b64}.{signature}"))
}

pub fn build_cookie_value(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{ADMIN_COOKIE_NAME}={token}; Path={ADMIN_PREFIX}; HttpOnly; SameSite=Strict; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn attach_cookie(mut response: Response, cookie_value: String) -> Response {
    if let Ok(value) = cookie_value.parse() {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

/// True when a fronting proxy reports the original request as https.
pub fn is_https(headers: &HeaderMap) -> bool {
    let forwarded_proto = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .split(',')
                .any(|part| part.trim().eq_ignore_ascii_case("https"))
        });
    let forwarded = headers
        .get("forwarded")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .split([';', ','])
                .filter_map(|part| part.trim().strip_prefix("proto="))
                .any(|proto| proto.trim().eq_ignore_ascii_case("https"))
        });
    forwarded_proto || forwarded
}

fn token_mac(secret: &str, payload_b64: &str) -> Hmac<Sha256> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("hmac can take key of any size");
    mac.update(payload_b64.as_bytes());
    mac
}

fn verify_token(secret: &str, token: &str, now: i64) -> bool {
    let Some((payload_b64, sig)) = token.split_once('.') else {
        return false;
    };
    let Ok(sig) = URL_SAFE_NO_PAD.decode(sig.as_bytes()) else {
        return false;
    };
    if token_mac(secret, payload_b64).verify_slice(&sig).is_err() {
        return false;
    }
    decode_payload(payload_b64).is_some_and(|payload| payload.exp > now)
}

fn decode_payload(payload_b64: &str) -> Option<AdminTokenPayload> {
    let bytes = URL_SAFE_NO_PAD.decode(payload_b64.as_bytes()).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let value = header.trim().strip_prefix("Bearer ")?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim().to_string())
    })
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AdminAuthError::MissingConfig => StatusCode::SERVICE_UNAVAILABLE,
            AdminAuthError::MissingToken | AdminAuthError::InvalidToken => StatusCode::UNAUTHORIZED,
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn issued_token_verifies_until_expiry() {
        let token = issue_token("secret", 60).unwrap();
        let now = Utc::now().timestamp();
        assert!(verify_token("secret", &token, now));
        assert!(!verify_token("secret", &token, now + 120));
        assert!(!verify_token("other", &token, now));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let now = Utc::now().timestamp();
        assert!(!verify_token("secret", "", now));
        assert!(!verify_token("secret", "abc", now));
        assert!(!verify_token("secret", "abc.!!!", now));
    }

    #[test]
    fn cookie_is_scoped_to_admin_routes() {
        let cookie = build_cookie_value("token", 60, false);
        assert!(cookie.starts_with("quottit_admin=token;"));
        assert!(cookie.contains("Path=/v2/admin"));
        assert!(cookie.contains("Max-Age=60"));
        assert!(!cookie.contains("Secure"));
        assert!(build_cookie_value("token", 60, true).ends_with("; Secure"));
    }

    #[test]
    fn bearer_header_takes_trimmed_value() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  abc "));
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_none());
    }

    #[test]
    fn https_detection_reads_proxy_headers() {
        let mut headers = HeaderMap::new();
        assert!(!is_https(&headers));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("http, HTTPS"));
        assert!(is_https(&headers));
        let mut headers = HeaderMap::new();
        headers.insert("forwarded", HeaderValue::from_static("for=1.2.3.4;proto=https"));
        assert!(is_https(&headers));
    }
}
