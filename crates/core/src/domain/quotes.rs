use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::identity::{Identity, ANONYMOUS};
use crate::error::CoreError;
use crate::types::tag::{join_tags, parse_tag_list, parse_tag_list_strict, Tag};

const MAX_QUOTE_LEN: usize = 1000;
const MAX_AUTHOR_LEN: usize = 120;
const MAX_SOURCE_LEN: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    pub text: String,
    pub author: String,
    pub source: Option<String>,
    /// Comma-separated, as submitted.
    pub tags: Option<String>,
    pub votes: i64,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub submitted_by: Option<Identity>,
}

impl Quote {
    pub fn tag_list(&self) -> Vec<Tag> {
        self.tags.as_deref().map(parse_tag_list).unwrap_or_default()
    }
}

/// Validated input for a new quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuote {
    pub text: String,
    pub author: String,
    pub source: Option<String>,
    pub tags: Option<String>,
}

impl NewQuote {
    pub fn normalize(
        text: &str,
        author: Option<&str>,
        source: Option<&str>,
        tags: Option<&str>,
    ) -> Result<Self, CoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::Empty("text"));
        }
        if text.chars().count() > MAX_QUOTE_LEN {
            return Err(CoreError::TooLong("text", MAX_QUOTE_LEN));
        }
        let author = non_blank(author).unwrap_or(ANONYMOUS);
        if author.chars().count() > MAX_AUTHOR_LEN {
            return Err(CoreError::TooLong("author", MAX_AUTHOR_LEN));
        }
        let source = non_blank(source);
        if source.is_some_and(|value| value.chars().count() > MAX_SOURCE_LEN) {
            return Err(CoreError::TooLong("source", MAX_SOURCE_LEN));
        }
        let tags = match non_blank(tags) {
            Some(raw) => {
                let parsed = parse_tag_list_strict(raw)?;
                (!parsed.is_empty()).then(|| join_tags(&parsed))
            }
            None => None,
        };
        Ok(NewQuote {
            text: text.to_string(),
            author: author.to_string(),
            source: source.map(str::to_string),
            tags,
        })
    }

    /// Bulk-import variant: only empty text is refused. Length limits do not
    /// apply and tag fragments that are not valid tags are dropped.
    pub fn imported(
        text: &str,
        author: Option<&str>,
        tags: Option<&str>,
    ) -> Result<Self, CoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::Empty("text"));
        }
        let tags = non_blank(tags)
            .map(parse_tag_list)
            .filter(|parsed| !parsed.is_empty())
            .map(|parsed| join_tags(&parsed));
        Ok(NewQuote {
            text: text.to_string(),
            author: non_blank(author).unwrap_or(ANONYMOUS).to_string(),
            source: None,
            tags,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuoteSort {
    #[default]
    Votes,
    Latest,
}

impl QuoteSort {
    pub fn parse(value: Option<&str>) -> Result<Self, CoreError> {
        match value.map(str::trim) {
            None | Some("") | Some("votes") | Some("top") => Ok(QuoteSort::Votes),
            Some("latest") | Some("new") => Ok(QuoteSort::Latest),
            Some(other) => Err(CoreError::InvalidSort(other.to_string())),
        }
    }
}

/// Stable sort; equal keys keep their incoming order.
pub fn sort_quotes(quotes: &mut [Quote], sort: QuoteSort) {
    match sort {
        QuoteSort::Votes => quotes.sort_by(|a, b| b.votes.cmp(&a.votes)),
        QuoteSort::Latest => quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
}

/// Case-insensitive list filter; every field that is set must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteFilter {
    pub tag: Option<Tag>,
    pub author: Option<String>,
    pub text: Option<String>,
}

impl QuoteFilter {
    pub fn new(
        tag: Option<&str>,
        author: Option<&str>,
        text: Option<&str>,
    ) -> Result<Self, CoreError> {
        let tag = non_blank(tag).map(Tag::try_from).transpose()?;
        Ok(QuoteFilter {
            tag,
            author: non_blank(author).map(str::to_lowercase),
            text: non_blank(text).map(str::to_lowercase),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.tag.is_none() && self.author.is_none() && self.text.is_none()
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        if let Some(tag) = &self.tag {
            if !quote.tag_list().contains(tag) {
                return false;
            }
        }
        if let Some(author) = &self.author {
            if !quote.author.to_lowercase().contains(author.as_str()) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            if !quote.text.to_lowercase().contains(text.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Picks the same quote for everyone on a given day: candidates are ordered
/// by id and indexed by the day number.
pub fn quote_of_the_day(quotes: &[Quote], date: NaiveDate) -> Option<&Quote> {
    let mut candidates: Vec<&Quote> = quotes.iter().collect();
    candidates.sort_by(|a, b| a.id.cmp(&b.id));
    let len = i64::try_from(candidates.len()).ok().filter(|len| *len > 0)?;
    let day = i64::from(date.num_days_from_ce());
    let idx = usize::try_from(day.rem_euclid(len)).ok()?;
    candidates.get(idx).copied()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(id: &str, votes: i64, ms: i64) -> Quote {
        Quote {
            id: id.to_string(),
            text: format!("quote {id}"),
            author: "Seneca".to_string(),
            source: None,
            tags: Some("Stoicism, life".to_string()),
            votes,
            created_at: DateTime::<Utc>::from_timestamp_millis(ms).unwrap(),
            submitted_by: None,
        }
    }

    #[test]
    fn normalize_defaults_author_and_drops_blanks() {
        let quote = NewQuote::normalize("  Be water. ", Some("  "), Some(""), Some(" , ")).unwrap();
        assert_eq!(quote.text, "Be water.");
        assert_eq!(quote.author, ANONYMOUS);
        assert!(quote.source.is_none());
        assert!(quote.tags.is_none());
    }

    #[test]
    fn normalize_rejects_empty_text_and_bad_tags() {
        assert!(NewQuote::normalize("   ", None, None, None).is_err());
        assert!(NewQuote::normalize("ok", None, None, Some("fine, bad$")).is_err());
    }

    #[test]
    fn normalize_canonicalizes_tags() {
        let quote =
            NewQuote::normalize("ok", Some("Lao Tzu"), None, Some("Tao,  Nature ,tao")).unwrap();
        assert_eq!(quote.author, "Lao Tzu");
        assert_eq!(quote.tags.as_deref(), Some("tao, nature"));
    }

    #[test]
    fn imported_quote_keeps_valid_tags_and_long_text() {
        let long = "y".repeat(MAX_QUOTE_LEN + 10);
        let quote =
            NewQuote::imported(&long, None, Some("wisdom, life's lessons, Wisdom")).unwrap();
        assert_eq!(quote.text.chars().count(), MAX_QUOTE_LEN + 10);
        assert_eq!(quote.author, ANONYMOUS);
        assert_eq!(quote.tags.as_deref(), Some("wisdom"));

        let untagged = NewQuote::imported("ok", Some("Seneca"), Some("!!!")).unwrap();
        assert!(untagged.tags.is_none());
        assert!(NewQuote::imported("  ", None, None).is_err());
    }

    #[test]
    fn sort_by_votes_is_stable() {
        let mut quotes = vec![
            quote("a", 1, 0),
            quote("b", 5, 0),
            quote("c", 1, 0),
            quote("d", -3, 0),
        ];
        sort_quotes(&mut quotes, QuoteSort::Votes);
        let ids: Vec<_> = quotes.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn sort_latest_puts_newest_first() {
        let mut quotes = vec![quote("old", 9, 10), quote("new", 0, 20)];
        sort_quotes(&mut quotes, QuoteSort::Latest);
        assert_eq!(quotes[0].id, "new");
    }

    #[test]
    fn sort_parse_accepts_aliases() {
        assert_eq!(QuoteSort::parse(None).unwrap(), QuoteSort::Votes);
        assert_eq!(QuoteSort::parse(Some("new")).unwrap(), QuoteSort::Latest);
        assert!(QuoteSort::parse(Some("random")).is_err());
    }

    #[test]
    fn filter_matches_tag_author_and_text() {
        let q = quote("a", 0, 0);
        assert!(QuoteFilter::new(Some("STOICISM"), None, None).unwrap().matches(&q));
        assert!(QuoteFilter::new(None, Some("sen"), Some("QUOTE")).unwrap().matches(&q));
        assert!(!QuoteFilter::new(Some("zen"), None, None).unwrap().matches(&q));
        assert!(!QuoteFilter::new(None, Some("marcus"), None).unwrap().matches(&q));
        assert!(QuoteFilter::new(None, Some(" "), None).unwrap().is_empty());
    }

    #[test]
    fn quote_of_the_day_is_deterministic() {
        let quotes = vec![quote("c", 0, 0), quote("a", 0, 0), quote("b", 0, 0)];
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        let first = quote_of_the_day(&quotes, date).unwrap();
        let mut shuffled = quotes.clone();
        shuffled.reverse();
        let second = quote_of_the_day(&shuffled, date).unwrap();
        assert_eq!(first.id, second.id);

        let next_day = date.succ_opt().unwrap();
        let next = quote_of_the_day(&quotes, next_day).unwrap();
        assert_ne!(first.id, next.id);
    }

    #[test]
    fn quote_of_the_day_empty() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        assert!(quote_of_the_day(&[], date).is_none());
    }
}
