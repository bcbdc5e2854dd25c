//! Database operations for the `connections` table.
//!
//! Connections hold the per-tenant platform credentials used when
//! submitting approved replies back to the platform. Obtaining and
//! refreshing tokens happens outside this service; rows land here
//! already usable.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `connections` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConnectionRow {
    pub id: i64,
    pub tenant_id: Uuid,
    pub platform: String,
    pub access_token: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Returns the tenant's connection for a platform when it exists and is in
/// status `connected`; `None` otherwise.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_connected(
    pool: &PgPool,
    tenant_id: Uuid,
    platform: &str,
) -> Result<Option<ConnectionRow>, DbError> {
    let row = sqlx::query_as::<_, ConnectionRow>(
        "SELECT id, tenant_id, platform, access_token, status, created_at, updated_at \
         FROM connections \
         WHERE tenant_id = $1 AND platform = $2 AND status = 'connected'",
    )
    .bind(tenant_id)
    .bind(platform)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts or replaces the tenant's connection for a platform.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_connection(
    pool: &PgPool,
    tenant_id: Uuid,
    platform: &str,
    access_token: &str,
    status: &str,
) -> Result<ConnectionRow, DbError> {
    let row = sqlx::query_as::<_, ConnectionRow>(
        "INSERT INTO connections (tenant_id, platform, access_token, status) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (tenant_id, platform) DO UPDATE SET \
             access_token = EXCLUDED.access_token, \
             status       = EXCLUDED.status, \
             updated_at   = NOW() \
         RETURNING id, tenant_id, platform, access_token, status, created_at, updated_at",
    )
    .bind(tenant_id)
    .bind(platform)
    .bind(access_token)
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
