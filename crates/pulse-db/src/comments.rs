//! Database operations for the `comments` table.

use chrono::{DateTime, Utc};
use pgvector::Vector;
use pulse_core::canonical::Classification;
use pulse_core::{CanonicalComment, EditPolicy};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `comments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub platform: String,
    pub external_id: String,
    pub message: String,
    pub author: Value,
    pub post: Option<Value>,
    pub comment_created_at: DateTime<Utc>,
    pub comment_updated_at: Option<DateTime<Utc>>,
    pub parent_external_id: Option<String>,
    pub language: Option<String>,
    pub engagement: Option<Value>,
    pub metadata: Value,
    pub embedding: Option<Vector>,
    pub sentiment: Option<String>,
    pub emotion: Option<String>,
    pub category: Option<String>,
    pub classification_confidence: Option<f64>,
    pub archived: bool,
    pub flagged: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct UpsertedCommentRow {
    #[sqlx(flatten)]
    comment: CommentRow,
    created: bool,
}

/// Insert or refresh the tenant's copy of a canonical comment.
///
/// Conflicts on `(tenant_id, platform, external_id)` refresh the mutable
/// ingestion columns in place. Embedding and classification survive a
/// refresh under [`EditPolicy::Preserve`]; under [`EditPolicy::Invalidate`]
/// they are cleared when the refresh changes the message text, so the
/// fan-out jobs recompute them.
///
/// Returns the stored row and `true` when the row was newly created.
///
/// # Errors
///
/// Returns [`DbError::Json`] if the canonical author or post cannot be
/// serialized, or [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_comment(
    pool: &PgPool,
    tenant_id: Uuid,
    comment: &CanonicalComment,
    edit_policy: EditPolicy,
) -> Result<(CommentRow, bool), DbError> {
    let id = Uuid::new_v4();
    let author = serde_json::to_value(&comment.author)?;
    let post = serde_json::to_value(&comment.post)?;
    let engagement = Value::Object(comment.engagement_metrics.clone());
    let metadata = Value::Object(comment.platform_metadata.clone());
    let invalidate = edit_policy == EditPolicy::Invalidate;

    let row = sqlx::query_as::<_, UpsertedCommentRow>(
        "INSERT INTO comments \
             (id, tenant_id, platform, external_id, message, author, post, \
              comment_created_at, comment_updated_at, parent_external_id, \
              language, engagement, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         ON CONFLICT (tenant_id, platform, external_id) DO UPDATE SET \
             message            = EXCLUDED.message, \
             author             = EXCLUDED.author, \
             post               = EXCLUDED.post, \
             comment_created_at = EXCLUDED.comment_created_at, \
             comment_updated_at = EXCLUDED.comment_updated_at, \
             parent_external_id = EXCLUDED.parent_external_id, \
             language           = EXCLUDED.language, \
             engagement         = EXCLUDED.engagement, \
             metadata           = EXCLUDED.metadata, \
             updated_at         = NOW(), \
             embedding = CASE WHEN $14 AND comments.message IS DISTINCT FROM EXCLUDED.message \
                              THEN NULL ELSE comments.embedding END, \
             sentiment = CASE WHEN $14 AND comments.message IS DISTINCT FROM EXCLUDED.message \
                              THEN NULL ELSE comments.sentiment END, \
             emotion   = CASE WHEN $14 AND comments.message IS DISTINCT FROM EXCLUDED.message \
                              THEN NULL ELSE comments.emotion END, \
             category  = CASE WHEN $14 AND comments.message IS DISTINCT FROM EXCLUDED.message \
                              THEN NULL ELSE comments.category END, \
             classification_confidence = \
                 CASE WHEN $14 AND comments.message IS DISTINCT FROM EXCLUDED.message \
                      THEN NULL ELSE comments.classification_confidence END \
         RETURNING id, tenant_id, platform, external_id, message, author, post, \
                   comment_created_at, comment_updated_at, parent_external_id, language, \
                   engagement, metadata, embedding, sentiment, emotion, category, \
                   classification_confidence, archived, flagged, created_at, updated_at, \
                   (xmax = 0) AS created",
    )
    .bind(id)
    .bind(tenant_id)
    .bind(comment.platform.as_str())
    .bind(&comment.external_id)
    .bind(&comment.message)
    .bind(author)
    .bind(post)
    .bind(comment.created_at)
    .bind(comment.updated_at)
    .bind(&comment.parent_comment_id)
    .bind(&comment.language)
    .bind(engagement)
    .bind(metadata)
    .bind(invalidate)
    .fetch_one(pool)
    .await?;

    Ok((row.comment, row.created))
}

/// Fetches a single comment by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_comment(pool: &PgPool, id: Uuid) -> Result<CommentRow, DbError> {
    let row = sqlx::query_as::<_, CommentRow>(
        "SELECT id, tenant_id, platform, external_id, message, author, post, \
                comment_created_at, comment_updated_at, parent_external_id, language, \
                engagement, metadata, embedding, sentiment, emotion, category, \
                classification_confidence, archived, flagged, created_at, updated_at \
         FROM comments \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Stores the comment's embedding vector.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_embedding(pool: &PgPool, id: Uuid, embedding: &Vector) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE comments SET embedding = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(embedding)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Stores the comment's classification triple and confidence.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_classification(
    pool: &PgPool,
    id: Uuid,
    classification: Classification,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE comments \
         SET sentiment = $1, emotion = $2, category = $3, \
             classification_confidence = $4, updated_at = NOW() \
         WHERE id = $5",
    )
    .bind(classification.sentiment.as_str())
    .bind(classification.emotion.as_str())
    .bind(classification.category.as_str())
    .bind(classification.confidence)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
