//! Database operations for the `suggestions` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `suggestions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SuggestionRow {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub suggested_reply: String,
    pub score: f64,
    pub model_used: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// One validated suggestion ready for storage.
#[derive(Debug, Clone)]
pub struct NewSuggestion {
    pub text: String,
    pub score: f64,
}

/// Inserts a batch of suggestions for a comment inside one transaction and
/// returns the stored rows in insertion order.
///
/// Suggestions are immutable once written; repeated generation for the same
/// comment appends a new batch rather than replacing the old one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; the whole batch rolls
/// back.
pub async fn insert_suggestions(
    pool: &PgPool,
    comment_id: Uuid,
    suggestions: &[NewSuggestion],
    model_used: &str,
) -> Result<Vec<SuggestionRow>, DbError> {
    let mut tx = pool.begin().await?;
    let mut rows = Vec::with_capacity(suggestions.len());

    for suggestion in suggestions {
        let id = Uuid::new_v4();

        let row = sqlx::query_as::<_, SuggestionRow>(
            "INSERT INTO suggestions (id, comment_id, suggested_reply, score, model_used) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, comment_id, suggested_reply, score, model_used, generated_at",
        )
        .bind(id)
        .bind(comment_id)
        .bind(&suggestion.text)
        .bind(suggestion.score)
        .bind(model_used)
        .fetch_one(&mut *tx)
        .await?;

        rows.push(row);
    }

    tx.commit().await?;
    Ok(rows)
}

/// Returns a comment's suggestions, most recent batch first, best score
/// first within a batch.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_suggestions(
    pool: &PgPool,
    comment_id: Uuid,
) -> Result<Vec<SuggestionRow>, DbError> {
    let rows = sqlx::query_as::<_, SuggestionRow>(
        "SELECT id, comment_id, suggested_reply, score, model_used, generated_at \
         FROM suggestions \
         WHERE comment_id = $1 \
         ORDER BY generated_at DESC, score DESC",
    )
    .bind(comment_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
