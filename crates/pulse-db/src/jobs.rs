//! Postgres-backed job queue for the comment pipeline.
//!
//! Lifecycle: `queued` → `running` → `succeeded` | `failed`. A failed
//! attempt with budget left goes back to `queued` with a later `run_after`;
//! exhausting the budget parks the job in `failed` with `last_error` set,
//! visible through the jobs API and CLI. Claiming uses
//! `FOR UPDATE SKIP LOCKED` so any number of workers can pull concurrently
//! without coordination.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// The four kinds of background work the pipeline schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    EmbeddingGeneration,
    Classification,
    SuggestionGeneration,
    ReplySubmission,
}

impl JobKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::EmbeddingGeneration => "embedding_generation",
            JobKind::Classification => "classification",
            JobKind::SuggestionGeneration => "suggestion_generation",
            JobKind::ReplySubmission => "reply_submission",
        }
    }

    /// Parse a stored kind string; `None` for anything unrecognized.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "embedding_generation" => Some(JobKind::EmbeddingGeneration),
            "classification" => Some(JobKind::Classification),
            "suggestion_generation" => Some(JobKind::SuggestionGeneration),
            "reply_submission" => Some(JobKind::ReplySubmission),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row from the `jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub kind: String,
    pub comment_id: Uuid,
    pub tenant_id: Uuid,
    pub payload: Value,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub run_after: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Enqueues a new job in `queued` status, runnable immediately.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn enqueue_job(
    pool: &PgPool,
    kind: JobKind,
    comment_id: Uuid,
    tenant_id: Uuid,
    payload: Value,
    max_attempts: i32,
) -> Result<JobRow, DbError> {
    let id = Uuid::new_v4();

    let row = sqlx::query_as::<_, JobRow>(
        "INSERT INTO jobs (id, kind, comment_id, tenant_id, payload, max_attempts) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id, kind, comment_id, tenant_id, payload, status, attempts, \
                   max_attempts, last_error, run_after, created_at, started_at, finished_at",
    )
    .bind(id)
    .bind(kind.as_str())
    .bind(comment_id)
    .bind(tenant_id)
    .bind(payload)
    .bind(max_attempts)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Claims the next runnable job, or `None` when the queue is empty.
///
/// The claim marks the job `running`, stamps `started_at`, and counts the
/// attempt, all in one statement. `FOR UPDATE SKIP LOCKED` in the inner
/// select keeps concurrent workers from blocking on or double-claiming the
/// same row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn claim_next_job(pool: &PgPool) -> Result<Option<JobRow>, DbError> {
    let row = sqlx::query_as::<_, JobRow>(
        "UPDATE jobs \
         SET status = 'running', started_at = NOW(), attempts = attempts + 1 \
         WHERE id = ( \
             SELECT id FROM jobs \
             WHERE status = 'queued' AND run_after <= NOW() \
             ORDER BY run_after, created_at \
             FOR UPDATE SKIP LOCKED \
             LIMIT 1) \
         RETURNING id, kind, comment_id, tenant_id, payload, status, attempts, \
                   max_attempts, last_error, run_after, created_at, started_at, finished_at",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Marks a running job `succeeded` and stamps `finished_at`.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not currently
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_job(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE jobs \
         SET status = 'succeeded', finished_at = NOW() \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Returns a running job to `queued` for a later attempt.
///
/// `run_after` sets when the job becomes runnable again; the caller computes
/// it from its retry policy. `started_at` is cleared so the stale-job reaper
/// never mistakes a queued job for an abandoned running one.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not currently
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn retry_job(
    pool: &PgPool,
    id: Uuid,
    error: &str,
    run_after: DateTime<Utc>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE jobs \
         SET status = 'queued', last_error = $1, run_after = $2, started_at = NULL \
         WHERE id = $3 AND status = 'running'",
    )
    .bind(error)
    .bind(run_after)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a running job terminally `failed` with its final error.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not currently
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_job(pool: &PgPool, id: Uuid, error: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE jobs \
         SET status = 'failed', last_error = $1, finished_at = NOW() \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Returns running jobs whose `started_at` is older than the visibility
/// timeout back to `queued`, so a crashed worker never strands work.
/// Returns the number of jobs requeued.
///
/// The attempt counted at claim time is kept; the job simply becomes
/// claimable again.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn requeue_stale_jobs(
    pool: &PgPool,
    visibility_timeout_secs: i64,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE jobs \
         SET status = 'queued', started_at = NULL, run_after = NOW() \
         WHERE status = 'running' \
           AND started_at <= NOW() - $1 * INTERVAL '1 second'",
    )
    .bind(visibility_timeout_secs)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Fetches a single job by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_job(pool: &PgPool, id: Uuid) -> Result<JobRow, DbError> {
    let row = sqlx::query_as::<_, JobRow>(
        "SELECT id, kind, comment_id, tenant_id, payload, status, attempts, \
                max_attempts, last_error, run_after, created_at, started_at, finished_at \
         FROM jobs \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent job of the given kind for a comment, if any.
///
/// The suggestions endpoint uses this to tell "generation in flight" from
/// "generation failed" from "never requested".
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_job_for_comment(
    pool: &PgPool,
    comment_id: Uuid,
    kind: JobKind,
) -> Result<Option<JobRow>, DbError> {
    let row = sqlx::query_as::<_, JobRow>(
        "SELECT id, kind, comment_id, tenant_id, payload, status, attempts, \
                max_attempts, last_error, run_after, created_at, started_at, finished_at \
         FROM jobs \
         WHERE comment_id = $1 AND kind = $2 \
         ORDER BY created_at DESC, id DESC \
         LIMIT 1",
    )
    .bind(comment_id)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the most recent `limit` jobs, optionally filtered by status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_jobs(
    pool: &PgPool,
    status: Option<&str>,
    limit: i64,
) -> Result<Vec<JobRow>, DbError> {
    let rows = sqlx::query_as::<_, JobRow>(
        "SELECT id, kind, comment_id, tenant_id, payload, status, attempts, \
                max_attempts, last_error, run_after, created_at, started_at, finished_at \
         FROM jobs \
         WHERE ($1::TEXT IS NULL OR status = $1) \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
