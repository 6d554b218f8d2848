use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),
    #[error("invalid tag: {0}")]
    InvalidTag(String),
    #[error("invalid vote delta: {0} (expected 1 or -1)")]
    InvalidVote(i64),
    #[error("{0} is required")]
    Empty(&'static str),
    #[error("{0} is too long (max {1} chars)")]
    TooLong(&'static str, usize),
    #[error("replies nest at most {0} levels deep")]
    TooDeep(usize),
    #[error("invalid sort: {0}")]
    InvalidSort(String),
}
