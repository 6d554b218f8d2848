use quottit_core::domain::search::SearchQuery;
use quottit_core::types::tag::Tag;
use quottit_core::types::time_range::TimeRange;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryParseError {
    #[error("empty search query")]
    EmptyQuery,
    #[error("invalid range filter: {0}")]
    InvalidRange(String),
    #[error("duplicate filter: {0}")]
    DuplicateFilter(&'static str),
    #[error("invalid tags filter: {0}")]
    InvalidTags(String),
    #[error("invalid author filter: {0}")]
    InvalidAuthor(String),
}

/// Parses `keywords tags:a,b author:name range:start~end`.
pub fn parse_query(input: &str) -> Result<SearchQuery, QueryParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(QueryParseError::EmptyQuery);
    }

    let mut query = SearchQuery::default();
    for token in trimmed.split_whitespace() {
        if let Some(value) = token.strip_prefix("range:") {
            if query.range.is_some() {
                return Err(QueryParseError::DuplicateFilter("range"));
            }
            let range = TimeRange::parse(value)
                .map_err(|_| QueryParseError::InvalidRange(value.to_string()))?;
            query.range = Some(range);
        } else if let Some(value) = token.strip_prefix("tags:") {
            let tags = parse_tags(value)
                .ok_or_else(|| QueryParseError::InvalidTags(value.to_string()))?;
            for tag in tags {
                if !query.tags.contains(&tag) {
                    query.tags.push(tag);
                }
            }
        } else if let Some(value) = token.strip_prefix("author:") {
            if query.author.is_some() {
                return Err(QueryParseError::DuplicateFilter("author"));
            }
            query.author = Some(parse_author(value)?);
        } else {
            query.keywords.push(token.to_string());
        }
    }

    Ok(query)
}

/// Tags inside one token are comma-separated; `_` stands in for a space.
fn parse_tags(input: &str) -> Option<Vec<String>> {
    let mut tags = Vec::new();
    for item in input.split(',') {
        if item.trim().is_empty() {
            continue;
        }
        let tag = Tag::try_from(item.replace('_', " ").as_str()).ok()?;
        tags.push(tag.as_str().to_string());
    }
    if tags.is_empty() { None } else { Some(tags) }
}

fn parse_author(input: &str) -> Result<String, QueryParseError> {
    let words: Vec<&str> = input
        .split(['_', '-'])
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .collect();
    if words.is_empty() || words.iter().any(|word| word.contains('"')) {
        return Err(QueryParseError::InvalidAuthor(input.to_string()));
    }
    Ok(words.join(" ").to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keywords_only() {
        let query = parse_query("courage  fear").unwrap();
        assert_eq!(query.keywords, vec!["courage", "fear"]);
        assert!(query.tags.is_empty());
    }

    #[test]
    fn parse_tags_filter_normalizes() {
        let query = parse_query("tags:Stoicism,life_lessons tags:stoicism").unwrap();
        assert_eq!(query.tags, vec!["stoicism", "life lessons"]);
    }

    #[test]
    fn parse_author_filter() {
        let query = parse_query("author:Marcus_Aurelius mind").unwrap();
        assert_eq!(query.author.as_deref(), Some("marcus aurelius"));
        assert_eq!(query.keywords, vec!["mind"]);
    }

    #[test]
    fn parse_range_filter() {
        let query = parse_query("range:2024-01-01~").unwrap();
        assert!(query.range.is_some());
        assert!(query.keywords.is_empty());
    }

    #[test]
    fn duplicate_filters_rejected() {
        let err = parse_query("author:a author:b").unwrap_err();
        assert!(matches!(err, QueryParseError::DuplicateFilter("author")));
        let err = parse_query("range:2024-01-01~ range:~2024-02-01").unwrap_err();
        assert!(matches!(err, QueryParseError::DuplicateFilter("range")));
    }

    #[test]
    fn invalid_filters_rejected() {
        assert!(matches!(
            parse_query("tags:,,").unwrap_err(),
            QueryParseError::InvalidTags(_)
        ));
        assert!(matches!(
            parse_query("author:__").unwrap_err(),
            QueryParseError::InvalidAuthor(_)
        ));
        assert!(matches!(
            parse_query("range:soon~").unwrap_err(),
            QueryParseError::InvalidRange(_)
        ));
    }

    #[test]
    fn parse_empty_query_returns_error() {
        let err = parse_query("   ").unwrap_err();
        assert!(matches!(err, QueryParseError::EmptyQuery));
    }
}
