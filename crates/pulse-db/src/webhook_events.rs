//! Database operations for the `webhook_events` dedup ledger.
//!
//! Platforms redeliver webhooks freely, so every delivery is identified by
//! `(platform, external_event_id, payload_hash)` and checked against this
//! table before any side effects run. The primary key is the mutual
//! exclusion: when two identical deliveries race, exactly one insert wins
//! and only that request fans out jobs.

use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Returns `true` when the delivery has already been seen inside the dedup
/// window. Used as the cheap pre-check before normalization; the
/// authoritative claim happens in [`record_event`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn is_duplicate_event(
    pool: &PgPool,
    platform: &str,
    external_event_id: &str,
    payload_hash: &str,
    window_hours: i64,
) -> Result<bool, DbError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS ( \
             SELECT 1 FROM webhook_events \
             WHERE platform = $1 \
               AND external_event_id = $2 \
               AND payload_hash = $3 \
               AND received_at > NOW() - $4 * INTERVAL '1 hour')",
    )
    .bind(platform)
    .bind(external_event_id)
    .bind(payload_hash)
    .bind(window_hours)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Claims a delivery in the dedup ledger.
///
/// Returns `true` when this call recorded the event (first delivery, or a
/// redelivery after the window expired; both proceed to fan-out) and
/// `false` when a fresh row already existed (duplicate inside the window;
/// the caller must skip side effects).
///
/// A stale row is reclaimed in place rather than re-inserted, so the sweep
/// never races a redelivery.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn record_event(
    pool: &PgPool,
    platform: &str,
    external_event_id: &str,
    payload_hash: &str,
    event_type: Option<&str>,
    tenant_id: Option<Uuid>,
    window_hours: i64,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO webhook_events \
             (platform, external_event_id, payload_hash, event_type, tenant_id) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (platform, external_event_id, payload_hash) DO UPDATE SET \
             received_at = NOW(), \
             event_type  = EXCLUDED.event_type, \
             tenant_id   = EXCLUDED.tenant_id \
         WHERE webhook_events.received_at <= NOW() - $6 * INTERVAL '1 hour'",
    )
    .bind(platform)
    .bind(external_event_id)
    .bind(payload_hash)
    .bind(event_type)
    .bind(tenant_id)
    .bind(window_hours)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Deletes ledger rows older than the dedup window. Returns the number of
/// rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn sweep_events(pool: &PgPool, window_hours: i64) -> Result<u64, DbError> {
    let result = sqlx::query(
        "DELETE FROM webhook_events WHERE received_at <= NOW() - $1 * INTERVAL '1 hour'",
    )
    .bind(window_hours)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
