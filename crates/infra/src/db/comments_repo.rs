use quottit_core::domain::comments::Comment;
use quottit_core::domain::identity::Identity;
use quottit_core::types::vote::VoteDelta;
use sqlx::{PgPool, Row};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommentsRepoError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

pub async fn insert_comment(pool: &PgPool, comment: &Comment) -> Result<(), CommentsRepoError> {
    sqlx::query(
        r#"
        INSERT INTO comments (
            quote_id,
            id,
            parent_id,
            text,
            author_id,
            author_name,
            author_avatar,
            votes,
            created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(&comment.quote_id)
    .bind(&comment.id)
    .bind(&comment.parent_id)
    .bind(&comment.text)
    .bind(&comment.author.id)
    .bind(&comment.author.display_name)
    .bind(&comment.author.avatar_url)
    .bind(comment.votes)
    .bind(comment.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Flat snapshot of one quote's comments, oldest first.
pub async fn list_comments(
    pool: &PgPool,
    quote_id: &str,
) -> Result<Vec<Comment>, CommentsRepoError> {
    let rows = sqlx::query(
        r#"
        SELECT quote_id,
               id,
               parent_id,
               text,
               author_id,
               author_name,
               author_avatar,
               votes,
               created_at
        FROM comments
        WHERE quote_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(quote_id)
    .fetch_all(pool)
    .await?;
    let mut comments = Vec::with_capacity(rows.len());
    for row in rows {
        comments.push(Comment {
            id: row.try_get("id")?,
            quote_id: row.try_get("quote_id")?,
            text: row.try_get("text")?,
            author: Identity {
                id: row.try_get("author_id")?,
                display_name: row.try_get("author_name")?,
                avatar_url: row.try_get("author_avatar")?,
            },
            votes: row.try_get("votes")?,
            created_at: row.try_get("created_at")?,
            parent_id: row.try_get("parent_id")?,
        });
    }
    Ok(comments)
}

pub async fn adjust_comment_votes(
    pool: &PgPool,
    quote_id: &str,
    comment_id: &str,
    delta: VoteDelta,
) -> Result<Option<i64>, CommentsRepoError> {
    let row = sqlx::query(
        r#"
        UPDATE comments
        SET votes = votes + $3
        WHERE quote_id = $1 AND id = $2
        RETURNING votes
        "#,
    )
    .bind(quote_id)
    .bind(comment_id)
    .bind(delta.value())
    .fetch_optional(pool)
    .await?;
    match row {
        Some(row) => Ok(Some(row.try_get("votes")?)),
        None => Ok(None),
    }
}

/// Replies to the deleted comment stay in place and surface as roots.
pub async fn delete_comment(
    pool: &PgPool,
    quote_id: &str,
    comment_id: &str,
) -> Result<bool, CommentsRepoError> {
    let result = sqlx::query(
        r#"
        DELETE FROM comments
        WHERE quote_id = $1 AND id = $2
        "#,
    )
    .bind(quote_id)
    .bind(comment_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
