pub mod admin;
pub mod comments;
pub mod health;
pub mod quotes;
pub mod search;
pub mod stream;

use serde::{Deserialize, Serialize};

const MAX_RECORD_ID_LEN: usize = 64;

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub delta: i64,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub id: String,
    pub votes: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

/// Record ids come straight from the path; reject anything that could not
/// have been generated by the store.
pub(crate) fn validate_record_id(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let valid = !trimmed.is_empty()
        && trimmed.len() <= MAX_RECORD_ID_LEN
        && trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    valid.then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::validate_record_id;

    #[test]
    fn record_ids_accept_generated_shapes() {
        assert_eq!(
            validate_record_id("3f2a9c0e5b7d4e1a8c6b0d2f4e6a8c0b"),
            Some("3f2a9c0e5b7d4e1a8c6b0d2f4e6a8c0b")
        );
        assert_eq!(validate_record_id(" c-1_a "), Some("c-1_a"));
    }

    #[test]
    fn record_ids_reject_blank_long_or_odd() {
        assert!(validate_record_id("  ").is_none());
        assert!(validate_record_id(&"a".repeat(65)).is_none());
        assert!(validate_record_id("../etc").is_none());
        assert!(validate_record_id("a b").is_none());
    }
}
