use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ANONYMOUS: &str = "Anonymous";

const MAX_DISPLAY_NAME_LEN: usize = 60;
const MAX_AVATAR_URL_LEN: usize = 512;

/// Who wrote a comment or submitted a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl Identity {
    /// Builds an identity for a visitor. A blank display name falls back to
    /// [`ANONYMOUS`]; an avatar that is not an http(s) URL is dropped.
    pub fn visitor(
        id: impl Into<String>,
        display_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<Self, CoreError> {
        let display_name = match display_name.map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => ANONYMOUS,
        };
        if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(CoreError::TooLong("display_name", MAX_DISPLAY_NAME_LEN));
        }
        Ok(Identity {
            id: id.into(),
            display_name: display_name.to_string(),
            avatar_url: avatar_url.and_then(normalize_avatar_url),
        })
    }
}

fn normalize_avatar_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() > MAX_AVATAR_URL_LEN || trimmed.chars().any(char::is_whitespace) {
        return None;
    }
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        Some(trimmed.to_string())
    } else {
        None
    }
}
