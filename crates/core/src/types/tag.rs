use std::fmt;

use crate::error::CoreError;

const MAX_TAG_LEN: usize = 32;

/// Lowercased, whitespace-collapsed quote tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Tag {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if normalized.is_empty() {
            return Err(CoreError::InvalidTag("empty tag".to_string()));
        }
        if normalized.chars().count() > MAX_TAG_LEN {
            return Err(CoreError::InvalidTag(normalized));
        }
        if !normalized
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '-' || ch == '_' || ch == ' ')
        {
            return Err(CoreError::InvalidTag(normalized));
        }
        Ok(Tag(normalized))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads a stored comma-separated tag string. Fragments that are not valid
/// tags are skipped, duplicates keep their first position.
pub fn parse_tag_list(raw: &str) -> Vec<Tag> {
    let mut tags: Vec<Tag> = Vec::new();
    for fragment in raw.split(',') {
        let Ok(tag) = Tag::try_from(fragment) else {
            continue;
        };
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Write-path variant of [`parse_tag_list`]: blank fragments are ignored but
/// any other invalid fragment is an error.
pub fn parse_tag_list_strict(raw: &str) -> Result<Vec<Tag>, CoreError> {
    let mut tags: Vec<Tag> = Vec::new();
    for fragment in raw.split(',') {
        if fragment.trim().is_empty() {
            continue;
        }
        let tag = Tag::try_from(fragment)?;
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

pub fn join_tags(tags: &[Tag]) -> String {
    tags.iter()
        .map(Tag::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
