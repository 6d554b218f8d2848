use chrono::{DateTime, Utc};
use quottit_core::domain::identity::{Identity, ANONYMOUS};
use quottit_core::domain::quotes::{NewQuote, Quote};
use quottit_core::types::vote::VoteDelta;
use sqlx::{PgPool, Row};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum QuotesRepoError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

pub fn new_record_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub async fn insert_quote(
    pool: &PgPool,
    quote: &NewQuote,
    submitted_by: Option<&Identity>,
    created_at: DateTime<Utc>,
) -> Result<Quote, QuotesRepoError> {
    let id = new_record_id();
    sqlx::query(
        r#"
        INSERT INTO quotes (
            id,
            text,
            author,
            source,
            tags,
            votes,
            created_at,
            submitter_id,
            submitter_name,
            submitter_avatar
        )
        VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $8, $9)
        "#,
    )
    .bind(&id)
    .bind(&quote.text)
    .bind(&quote.author)
    .bind(&quote.source)
    .bind(&quote.tags)
    .bind(created_at)
    .bind(submitted_by.map(|identity| identity.id.as_str()))
    .bind(submitted_by.map(|identity| identity.display_name.as_str()))
    .bind(submitted_by.and_then(|identity| identity.avatar_url.as_deref()))
    .execute(pool)
    .await?;
    Ok(Quote {
        id,
        text: quote.text.clone(),
        author: quote.author.clone(),
        source: quote.source.clone(),
        tags: quote.tags.clone(),
        votes: 0,
        created_at,
        submitted_by: submitted_by.cloned(),
    })
}

pub async fn find_quote(pool: &PgPool, id: &str) -> Result<Option<Quote>, QuotesRepoError> {
    let row = sqlx::query(
        r#"
        SELECT id, text, author, source, tags, votes, created_at,
               submitter_id, submitter_name, submitter_avatar
        FROM quotes
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(map_quote).transpose()
}

/// Snapshot of every quote in insertion order.
pub async fn list_quotes(pool: &PgPool) -> Result<Vec<Quote>, QuotesRepoError> {
    let rows = sqlx::query(
        r#"
        SELECT id, text, author, source, tags, votes, created_at,
               submitter_id, submitter_name, submitter_avatar
        FROM quotes
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    let mut quotes = Vec::with_capacity(rows.len());
    for row in rows {
        quotes.push(map_quote(row)?);
    }
    Ok(quotes)
}

/// Applies the delta in a single statement and returns the new total, or
/// `None` when the quote does not exist.
pub async fn adjust_quote_votes(
    pool: &PgPool,
    id: &str,
    delta: VoteDelta,
) -> Result<Option<i64>, QuotesRepoError> {
    let row = sqlx::query(
        r#"
        UPDATE quotes
        SET votes = votes + $2
        WHERE id = $1
        RETURNING votes
        "#,
    )
    .bind(id)
    .bind(delta.value())
    .fetch_optional(pool)
    .await?;
    row.map(|row| row.try_get("votes"))
        .transpose()
        .map_err(QuotesRepoError::from)
}

/// Comments go with the quote through the foreign-key cascade.
pub async fn delete_quote(pool: &PgPool, id: &str) -> Result<bool, QuotesRepoError> {
    let result = sqlx::query(
        r#"
        DELETE FROM quotes
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

fn map_quote(row: sqlx::postgres::PgRow) -> Result<Quote, QuotesRepoError> {
    let submitter_id: Option<String> = row.try_get("submitter_id")?;
    let submitter_name: Option<String> = row.try_get("submitter_name")?;
    let submitter_avatar: Option<String> = row.try_get("submitter_avatar")?;
    let submitted_by = submitter_id.map(|id| Identity {
        id,
        display_name: submitter_name.unwrap_or_else(|| ANONYMOUS.to_string()),
        avatar_url: submitter_avatar,
    });
    Ok(Quote {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        author: row.try_get("author")?,
        source: row.try_get("source")?,
        tags: row.try_get("tags")?,
        votes: row.try_get("votes")?,
        created_at: row.try_get("created_at")?,
        submitted_by,
    })
}

#[cfg(test)]
mod tests {
    use super::new_record_id;

    #[test]
    fn record_ids_are_unique_hex() {
        let a = new_record_id();
        let b = new_record_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
