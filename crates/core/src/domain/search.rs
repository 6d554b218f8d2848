use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::time_range::TimeRange;

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub keywords: Vec<String>,
    pub range: Option<TimeRange>,
    pub tags: Vec<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchDocument {
    pub id: String,
    pub text: String,
    pub author: String,
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub author: String,
    pub source: Option<String>,
    pub tags: Vec<String>,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub total: usize,
    pub hits: Vec<SearchHit>,
}
