//! Cosine-similarity retrieval over embedded comments.
//!
//! Feeds suggestion prompts with past comment/reply pairs that worked. Only
//! comments that already have an embedding and at least one human reply are
//! eligible; each eligible comment contributes its most recent reply.

use pgvector::Vector;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// One retrieved comment/reply pair with its cosine distance to the query.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SimilarReplyRow {
    pub comment_id: Uuid,
    pub comment_message: String,
    pub platform: String,
    pub reply_message: String,
    pub replier_name: Option<String>,
    pub distance: f64,
}

impl SimilarReplyRow {
    /// Similarity on the [0, 1] scale prompts expect (1 = identical).
    #[must_use]
    pub fn similarity(&self) -> f64 {
        (1.0 - self.distance).clamp(0.0, 1.0)
    }
}

/// Returns the tenant's nearest replied-to comments by cosine distance
/// (`<=>`), closest first, ties broken by the most recent reply.
///
/// Rows at or beyond `max_distance` are excluded, as is the query comment
/// itself.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_similar(
    pool: &PgPool,
    tenant_id: Uuid,
    query: &Vector,
    exclude_comment_id: Uuid,
    limit: i64,
    max_distance: f64,
) -> Result<Vec<SimilarReplyRow>, DbError> {
    let rows = sqlx::query_as::<_, SimilarReplyRow>(
        "SELECT c.id AS comment_id, \
                c.message AS comment_message, \
                c.platform, \
                r.message AS reply_message, \
                r.author_name AS replier_name, \
                (c.embedding <=> $2) AS distance \
         FROM comments c \
         JOIN LATERAL ( \
             SELECT message, author_name, created_at \
             FROM replies \
             WHERE comment_id = c.id \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1) r ON TRUE \
         WHERE c.tenant_id = $1 \
           AND c.embedding IS NOT NULL \
           AND c.id <> $3 \
           AND (c.embedding <=> $2) < $4 \
         ORDER BY c.embedding <=> $2, r.created_at DESC \
         LIMIT $5",
    )
    .bind(tenant_id)
    .bind(query)
    .bind(exclude_comment_id)
    .bind(max_distance)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
