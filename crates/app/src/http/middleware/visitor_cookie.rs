use axum::body::Body;
use axum::extract::State;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{Method, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use crate::http::routes::ErrorBody;
use crate::state::AppState;

const COOKIE_NAME: &str = "qid";
const TOKEN_BYTES: usize = 16;
const SIGNATURE_BYTES: usize = 16;
const COOKIE_MAX_AGE_SECS: i64 = 31_536_000;

/// Anonymous visitor identity carried by the signed `qid` cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visitor {
    token: Vec<u8>,
}

impl Visitor {
    /// Stable author/submitter id for this visitor.
    pub fn id(&self) -> String {
        hex::encode(&self.token)
    }
}

#[derive(Debug, Error)]
pub enum VisitorCookieError {
    #[error("cookie secret not configured")]
    MissingCookieSecret,
    #[error("visitor cookie required")]
    CookieRequired,
}

pub async fn ensure_visitor_cookie(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, VisitorCookieError> {
    if !should_handle_cookie(&request) {
        return Ok(next.run(request).await);
    }
    let write = is_write(&request);
    let Some(secret) = state
        .config
        .cookie_secret
        .as_deref()
        .filter(|value| !value.is_empty())
    else {
        if write {
            return Err(VisitorCookieError::MissingCookieSecret);
        }
        return Ok(next.run(request).await);
    };

    let mut set_cookie = None;
    let token = match extract_cookie(&request, COOKIE_NAME)
        .and_then(|value| verify_cookie_value(secret, &value))
    {
        Some(token) => token,
        None => {
            if write {
                return Err(VisitorCookieError::CookieRequired);
            }
            let token = generate_token_bytes();
            set_cookie = Some(build_cookie_value(
                &sign_cookie_value(secret, &token),
                state.config.cookie_secure,
            ));
            debug!("issued visitor cookie");
            token
        }
    };
    request.extensions_mut().insert(Visitor { token });

    let mut response = next.run(request).await;
    if let Some(cookie_value) = set_cookie {
        if let Ok(value) = cookie_value.parse() {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    Ok(response)
}

fn should_handle_cookie<B>(request: &Request<B>) -> bool {
    request.uri().path().starts_with("/v2/quotes")
}

fn is_write<B>(request: &Request<B>) -> bool {
    matches!(*request.method(), Method::POST | Method::PUT | Method::DELETE)
}

fn extract_cookie<B>(request: &Request<B>, name: &str) -> Option<String> {
    let header = request.headers().get(COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim().to_string())
    })
}

fn generate_token_bytes() -> Vec<u8> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.to_vec()
}

fn visitor_mac(secret: &str, token: &[u8]) -> Hmac<Sha256> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("hmac can take key of any size");
    mac.update(token);
    mac
}

/// `<token>.<signature>`, both base64url without padding.
fn sign_cookie_value(secret: &str, token: &[u8]) -> String {
    let raw = visitor_mac(secret, token).finalize().into_bytes();
    format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(token),
        URL_SAFE_NO_PAD.encode(&raw[..SIGNATURE_BYTES])
    )
}

fn verify_cookie_value(secret: &str, value: &str) -> Option<Vec<u8>> {
    let (token, sig) = value.split_once('.')?;
    let token = URL_SAFE_NO_PAD.decode(token.as_bytes()).ok()?;
    let sig = URL_SAFE_NO_PAD.decode(sig.as_bytes()).ok()?;
    if token.len() != TOKEN_BYTES || sig.len() != SIGNATURE_BYTES {
        return None;
    }
    visitor_mac(secret, &token)
        .verify_truncated_left(&sig)
        .ok()
        .map(|_| token)
}

fn build_cookie_value(value: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={COOKIE_MAX_AGE_SECS}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

impl IntoResponse for VisitorCookieError {
    fn into_response(self) -> Response {
        let status = match self {
            VisitorCookieError::CookieRequired => axum::http::StatusCode::UNAUTHORIZED,
            VisitorCookieError::MissingCookieSecret => {
                axum::http::StatusCode::SERVICE_UNAVAILABLE
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
    use axum::http::Request;

    use super::*;

    fn request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).expect("request")
    }

    #[test]
    fn signed_value_round_trips() {
        let token = generate_token_bytes();
        let value = sign_cookie_value("secret", &token);
        assert_eq!(verify_cookie_value("secret", &value), Some(token));
    }

    #[test]
    fn tampered_or_foreign_values_are_rejected() {
        let token = generate_token_bytes();
        let value = sign_cookie_value("secret", &token);
        assert!(verify_cookie_value("other-secret", &value).is_none());
        let forged = sign_cookie_value("secret", &[7u8; TOKEN_BYTES]);
        let (_, forged_sig) = forged.split_once('.').unwrap();
        let (real_token, _) = value.split_once('.').unwrap();
        assert!(verify_cookie_value("secret", &format!("{real_token}.{forged_sig}")).is_none());
        assert!(verify_cookie_value("secret", "garbage").is_none());
    }

    #[test]
    fn visitor_id_is_hex_of_token() {
        let visitor = Visitor {
            token: vec![0xab, 0x01],
        };
        assert_eq!(visitor.id(), "ab01");
    }

    #[test]
    fn extract_cookie_finds_named_value() {
        let req = request("GET", "/v2/quotes", Some("theme=dark; qid=abc.def"));
        assert_eq!(extract_cookie(&req, COOKIE_NAME).as_deref(), Some("abc.def"));
        let req = request("GET", "/v2/quotes", Some("theme=dark"));
        assert!(extract_cookie(&req, COOKIE_NAME).is_none());
    }

    #[test]
    fn only_quote_routes_are_handled() {
        assert!(should_handle_cookie(&request("GET", "/v2/quotes/abc/comments", None)));
        assert!(!should_handle_cookie(&request("GET", "/v2/search?q=x", None)));
        assert!(!should_handle_cookie(&request("GET", "/health", None)));
    }

    #[test]
    fn writes_require_cookie() {
        assert!(is_write(&request("POST", "/v2/quotes", None)));
        assert!(is_write(&request("PUT", "/v2/quotes/a/vote", None)));
        assert!(!is_write(&request("GET", "/v2/quotes", None)));
    }

    #[test]
    fn cookie_flags_follow_config() {
        assert!(build_cookie_value("v", true).ends_with("; Secure"));
        assert!(!build_cookie_value("v", false).contains("Secure"));
    }

    #[tokio::test]
    async fn rejection_uses_shared_json_error_body() {
        let response = VisitorCookieError::CookieRequired.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(json, serde_json::json!({ "error": "visitor cookie required" }));
    }
}
