use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::feed::QuoteEvent;
use crate::jobs::JobError;
use crate::state::AppState;
use quottit_core::domain::quotes::NewQuote;
use quottit_core::error::CoreError;
use quottit_infra::db::insert_quote;
use quottit_infra::search::document_for_quote;

const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub found: usize,
    pub imported: usize,
    pub failed: usize,
}

#[derive(Debug, Deserialize)]
struct ImportEntry {
    text: String,
    author: Option<String>,
    #[serde(default)]
    tags: Option<ImportTags>,
}

impl ImportEntry {
    fn to_new_quote(&self) -> Result<NewQuote, CoreError> {
        let tags = self.tags.as_ref().map(ImportTags::joined);
        NewQuote::imported(&self.text, self.author.as_deref(), tags.as_deref())
    }
}

/// Tags arrive either as one comma-separated string or as a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportTags {
    Joined(String),
    List(Vec<String>),
}

impl ImportTags {
    fn joined(&self) -> String {
        match self {
            ImportTags::Joined(raw) => raw.clone(),
            ImportTags::List(items) => items.join(","),
        }
    }
}

/// Loads a JSON array of quotes from a file or an http(s) URL and inserts
/// each one as a fresh quote with no votes.
pub async fn run(state: &AppState, location: &str) -> Result<ImportStats, JobError> {
    let pool = state.db.as_ref().ok_or(JobError::DbUnavailable)?;
    info!(location, "starting quote import");
    let body = if is_remote(location) {
        state
            .http_client
            .get(location)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?
    } else {
        tokio::fs::read_to_string(location).await?
    };
    let entries = parse_import(&body)?;
    let found = entries.len();
    info!(found, "quotes found for import");

    let mut stats = ImportStats {
        found,
        ..ImportStats::default()
    };
    let mut documents = Vec::new();
    for (position, entry) in entries.iter().enumerate() {
        let new_quote = match entry.to_new_quote() {
            Ok(new_quote) => new_quote,
            Err(err) => {
                stats.failed += 1;
                warn!(error = %err, position = position + 1, "skipping invalid quote");
                continue;
            }
        };
        match insert_quote(pool, &new_quote, None, Utc::now()).await {
            Ok(quote) => {
                stats.imported += 1;
                info!(
                    "imported {}/{}: \"{}\" - {}",
                    stats.imported,
                    found,
                    preview(&quote.text),
                    quote.author
                );
                documents.push(document_for_quote(&quote));
            }
            Err(err) => {
                stats.failed += 1;
                warn!(error = %err, position = position + 1, "failed to insert quote");
            }
        }
    }

    if !documents.is_empty() {
        state.search.upsert_documents(&documents)?;
        state.feed.publish(QuoteEvent::QuotesChanged);
    }
    Ok(stats)
}

fn is_remote(location: &str) -> bool {
    let lower = location.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn parse_import(body: &str) -> Result<Vec<ImportEntry>, JobError> {
    serde_json::from_str(body).map_err(|err| JobError::Import(err.to_string()))
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::{is_remote, parse_import, preview, ImportTags, PREVIEW_CHARS};
    use crate::jobs::JobError;

    #[test]
    fn parses_string_and_list_tags() {
        let entries = parse_import(
            r#"[
                {"text": "Know thyself.", "author": "Socrates", "tags": "wisdom, self"},
                {"text": "Carpe diem.", "tags": ["time", "life"]},
                {"text": "Untagged.", "author": null}
            ]"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].author.as_deref(), Some("Socrates"));
        assert_eq!(
            entries[0].tags.as_ref().map(ImportTags::joined).as_deref(),
            Some("wisdom, self")
        );
        assert_eq!(
            entries[1].tags.as_ref().map(ImportTags::joined).as_deref(),
            Some("time,life")
        );
        assert!(entries[2].author.is_none());
        assert!(entries[2].tags.is_none());
    }

    #[test]
    fn entry_with_unusual_tag_is_still_imported() {
        let entries = parse_import(
            r#"[{"text": "Fall seven times, stand up eight.", "tags": "wisdom, life's lessons"}]"#,
        )
        .unwrap();
        let quote = entries[0].to_new_quote().unwrap();
        assert_eq!(quote.text, "Fall seven times, stand up eight.");
        assert_eq!(quote.tags.as_deref(), Some("wisdom"));
    }

    #[test]
    fn rejects_non_array_payload() {
        let err = parse_import(r#"{"text": "alone"}"#).unwrap_err();
        assert!(matches!(err, JobError::Import(_)));
    }

    #[test]
    fn preview_truncates_long_text_only() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(PREVIEW_CHARS + 5);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn remote_locations_are_http_urls() {
        assert!(is_remote("https://example.com/quotes.json"));
        assert!(is_remote("HTTP://example.com/q.json"));
        assert!(!is_remote("./data/quotes.json"));
    }
}
