use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::http::middleware::admin_auth;
use crate::http::routes::ErrorBody;
use crate::state::AppState;

const DEFAULT_SESSION_DAYS: i64 = 1;
const MAX_SESSION_DAYS: i64 = 14;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub password: String,
    pub session_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub token: String,
    pub expires_at: String,
    pub max_age_secs: i64,
}

#[derive(Debug, Error)]
pub enum AdminLoginError {
    #[error("admin auth not configured")]
    MissingConfig,
    #[error("password is required")]
    MissingPassword,
    #[error("session_days must be between 1 and 14")]
    InvalidSessionDays,
    #[error("invalid password")]
    InvalidPassword,
    #[error("invalid admin password hash")]
    InvalidHash,
    #[error("token issuance failed")]
    TokenIssue,
}

/// Exchanges the moderator password for a signed admin token, returned in
/// the body for bearer use and as a cookie scoped to the admin routes.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<Response, AdminLoginError> {
    let password = payload.password.trim();
    if password.is_empty() {
        return Err(AdminLoginError::MissingPassword);
    }
    let session_days = resolve_session_days(payload.session_days)?;

    let hash = state
        .config
        .admin_password_hash
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or(AdminLoginError::MissingConfig)?;
    let secret = state
        .config
        .admin_token_secret
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or(AdminLoginError::MissingConfig)?;

    let parsed_hash = PasswordHash::new(hash).map_err(|_| AdminLoginError::InvalidHash)?;
    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        warn!("admin login rejected");
        return Err(AdminLoginError::InvalidPassword);
    }

    let max_age_secs = session_days.saturating_mul(24 * 60 * 60);
    let token =
        admin_auth::issue_token(secret, max_age_secs).map_err(|_| AdminLoginError::TokenIssue)?;
    let secure = state.config.cookie_secure || admin_auth::is_https(&headers);
    let cookie = admin_auth::build_cookie_value(&token, max_age_secs, secure);
    info!(session_days, "admin logged in");

    let expires_at = (Utc::now() + Duration::seconds(max_age_secs)).to_rfc3339();
    let response = Json(AdminLoginResponse {
        token,
        expires_at,
        max_age_secs,
    })
    .into_response();
    Ok(admin_auth::attach_cookie(response, cookie))
}

fn resolve_session_days(value: Option<i64>) -> Result<i64, AdminLoginError> {
    match value.unwrap_or(DEFAULT_SESSION_DAYS) {
        days @ 1..=MAX_SESSION_DAYS => Ok(days),
        _ => Err(AdminLoginError::InvalidSessionDays),
    }
}

impl IntoResponse for AdminLoginError {
    fn into_response(self) -> Response {
        let status = match self {
            AdminLoginError::MissingConfig | AdminLoginError::InvalidHash => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AdminLoginError::MissingPassword | AdminLoginError::InvalidSessionDays => {
                StatusCode::BAD_REQUEST
            }
            AdminLoginError::InvalidPassword => StatusCode::UNAUTHORIZED,
            AdminLoginError::TokenIssue => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_session_days, AdminLoginError, MAX_SESSION_DAYS};

    #[test]
    fn session_defaults_to_one_day() {
        assert_eq!(resolve_session_days(None).unwrap(), 1);
    }

    #[test]
    fn session_accepts_range_bounds() {
        assert_eq!(resolve_session_days(Some(1)).unwrap(), 1);
        assert_eq!(
            resolve_session_days(Some(MAX_SESSION_DAYS)).unwrap(),
            MAX_SESSION_DAYS
        );
    }

    #[test]
    fn session_rejects_out_of_range() {
        for days in [0, -3, MAX_SESSION_DAYS + 1] {
            let err = resolve_session_days(Some(days)).unwrap_err();
            assert!(matches!(err, AdminLoginError::InvalidSessionDays));
        }
    }
}
