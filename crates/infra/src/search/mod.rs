pub mod query_parser;
pub mod tantivy_index;

use quottit_core::domain::quotes::Quote;
use quottit_core::domain::search::SearchDocument;
use quottit_core::types::tag::Tag;
use sha2::{Digest, Sha256};

pub use query_parser::{parse_query, QueryParseError};
pub use tantivy_index::{SearchIndex, SearchIndexError, SearchIndexStats};

/// Maps a stored quote to its index document. The checksum covers every
/// indexed field so unchanged quotes can be skipped on refresh.
pub fn document_for_quote(quote: &Quote) -> SearchDocument {
    let tags: Vec<String> = quote
        .tag_list()
        .iter()
        .map(Tag::as_str)
        .map(str::to_string)
        .collect();
    let mut hasher = Sha256::new();
    hasher.update(quote.text.as_bytes());
    hasher.update([0u8]);
    hasher.update(quote.author.as_bytes());
    hasher.update([0u8]);
    hasher.update(quote.source.as_deref().unwrap_or_default().as_bytes());
    hasher.update([0u8]);
    hasher.update(tags.join(",").as_bytes());
    hasher.update([0u8]);
    hasher.update(quote.created_at.timestamp_millis().to_be_bytes());
    SearchDocument {
        id: quote.id.clone(),
        text: quote.text.clone(),
        author: quote.author.clone(),
        source: quote.source.clone(),
        tags,
        created_at: quote.created_at,
        checksum: hex::encode(hasher.finalize()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use quottit_core::domain::quotes::Quote;

    use super::document_for_quote;

    fn quote(text: &str) -> Quote {
        Quote {
            id: "q1".to_string(),
            text: text.to_string(),
            author: "Epictetus".to_string(),
            source: None,
            tags: Some("Stoicism, control".to_string()),
            votes: 4,
            created_at: DateTime::<Utc>::from_timestamp_millis(1_000).unwrap(),
            submitted_by: None,
        }
    }

    #[test]
    fn document_carries_normalized_tags() {
        let doc = document_for_quote(&quote("It is not things that disturb us."));
        assert_eq!(doc.tags, vec!["stoicism", "control"]);
        assert_eq!(doc.checksum.len(), 64);
    }

    #[test]
    fn checksum_ignores_votes_but_tracks_text() {
        let base = quote("a");
        let mut voted = base.clone();
        voted.votes = 100;
        let edited = quote("b");
        assert_eq!(
            document_for_quote(&base).checksum,
            document_for_quote(&voted).checksum
        );
        assert_ne!(
            document_for_quote(&base).checksum,
            document_for_quote(&edited).checksum
        );
    }
}
