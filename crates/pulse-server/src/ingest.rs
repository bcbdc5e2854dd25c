//! Delivery processing behind the webhook endpoints.
//!
//! A delivery is one signed HTTP POST from a platform; it may carry zero or
//! more comment events. Each event runs through the same pipeline: normalize,
//! dedup check, upsert, claim the dedup ledger, and fan out background jobs.
//! Only the request that wins the ledger claim enqueues jobs, so a redelivered
//! payload never doubles the queue.

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use pulse_core::{AppConfig, PlatformType};
use pulse_db::{DbError, JobKind};

/// Per-delivery tally returned to the webhook handler.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    /// Events normalized and upserted.
    pub processed: usize,
    /// Events dropped as duplicates inside the dedup window.
    pub duplicates: usize,
    /// Events that failed normalization and were logged and dropped.
    pub skipped: usize,
    /// First job enqueued by this delivery, if any.
    pub job_id: Option<Uuid>,
}

/// Run one verified delivery through the ingestion pipeline.
///
/// The payload hash is computed once over the whole delivery; combined with
/// each comment's external id it forms the dedup key, so two events in the
/// same POST never collide and a redelivery of the same POST always does.
///
/// # Errors
///
/// Returns [`DbError`] when a database operation fails. Normalization
/// failures are not errors; they are counted in
/// [`IngestOutcome::skipped`].
pub async fn process_delivery(
    pool: &PgPool,
    config: &AppConfig,
    tenant_id: Uuid,
    platform: PlatformType,
    payload: &Value,
) -> Result<IngestOutcome, DbError> {
    let hash = pulse_ingest::payload_hash(payload);
    let events = pulse_ingest::extract_events(platform, payload);
    let window = config.dedup_window_hours;

    let mut outcome = IngestOutcome::default();

    for event in &events {
        let comment = match pulse_ingest::normalize(platform, event) {
            Ok(comment) => comment,
            Err(e) => {
                tracing::warn!(
                    platform = platform.as_str(),
                    error = %e,
                    "dropping event that failed normalization"
                );
                outcome.skipped += 1;
                continue;
            }
        };

        if pulse_db::is_duplicate_event(pool, platform.as_str(), &comment.external_id, &hash, window)
            .await?
        {
            tracing::debug!(
                platform = platform.as_str(),
                external_id = %comment.external_id,
                "duplicate delivery inside dedup window"
            );
            outcome.duplicates += 1;
            continue;
        }

        let (row, created) =
            pulse_db::upsert_comment(pool, tenant_id, &comment, config.on_comment_edit).await?;

        let claimed = pulse_db::record_event(
            pool,
            platform.as_str(),
            &comment.external_id,
            &hash,
            Some("comment"),
            Some(tenant_id),
            window,
        )
        .await?;

        if claimed {
            if row.embedding.is_none() {
                let job = pulse_db::enqueue_job(
                    pool,
                    JobKind::EmbeddingGeneration,
                    row.id,
                    tenant_id,
                    serde_json::json!({}),
                    config.job_max_attempts,
                )
                .await?;
                outcome.job_id.get_or_insert(job.id);
            }
            if row.sentiment.is_none() {
                let job = pulse_db::enqueue_job(
                    pool,
                    JobKind::Classification,
                    row.id,
                    tenant_id,
                    serde_json::json!({}),
                    config.job_max_attempts,
                )
                .await?;
                outcome.job_id.get_or_insert(job.id);
            }
        }

        tracing::info!(
            platform = platform.as_str(),
            external_id = %comment.external_id,
            comment_id = %row.id,
            created,
            "ingested comment"
        );
        outcome.processed += 1;
    }

    Ok(outcome)
}
