//! Database operations for the `replies` table.
//!
//! Human replies are written by the account-facing CRUD surface, which
//! lives outside this service. The pipeline reads them for similarity
//! retrieval and appends the platform-confirmed copy after a successful
//! reply submission.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `replies` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReplyRow {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub message: String,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Inserts a reply for a comment and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_reply(
    pool: &PgPool,
    comment_id: Uuid,
    message: &str,
    author_name: Option<&str>,
) -> Result<ReplyRow, DbError> {
    let id = Uuid::new_v4();

    let row = sqlx::query_as::<_, ReplyRow>(
        "INSERT INTO replies (id, comment_id, message, author_name) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, comment_id, message, author_name, created_at",
    )
    .bind(id)
    .bind(comment_id)
    .bind(message)
    .bind(author_name)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a comment's replies, most recent first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_replies(pool: &PgPool, comment_id: Uuid) -> Result<Vec<ReplyRow>, DbError> {
    let rows = sqlx::query_as::<_, ReplyRow>(
        "SELECT id, comment_id, message, author_name, created_at \
         FROM replies \
         WHERE comment_id = $1 \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(comment_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
