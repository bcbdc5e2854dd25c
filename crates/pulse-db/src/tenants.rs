//! Database operations for the `tenants` table.

use chrono::{DateTime, Utc};
use pulse_core::TenantPersona;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `tenants` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TenantRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub persona: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantRow {
    /// The tenant's reply persona, falling back to the professional default
    /// when the column is NULL or does not parse as a persona object.
    #[must_use]
    pub fn persona(&self) -> TenantPersona {
        self.persona
            .clone()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }
}

/// Fetches a single tenant by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_tenant(pool: &PgPool, id: Uuid) -> Result<TenantRow, DbError> {
    let row = sqlx::query_as::<_, TenantRow>(
        "SELECT id, name, slug, persona, created_at, updated_at \
         FROM tenants \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Looks up a tenant by its URL slug, or `None` if no such tenant exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_tenant_by_slug(pool: &PgPool, slug: &str) -> Result<Option<TenantRow>, DbError> {
    let row = sqlx::query_as::<_, TenantRow>(
        "SELECT id, name, slug, persona, created_at, updated_at \
         FROM tenants \
         WHERE slug = $1",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns all tenants ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tenants(pool: &PgPool) -> Result<Vec<TenantRow>, DbError> {
    let rows = sqlx::query_as::<_, TenantRow>(
        "SELECT id, name, slug, persona, created_at, updated_at \
         FROM tenants \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
