use pulse_core::{PricingSeed, TenantSeed};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Upsert pricing rows from config into the database.
///
/// Returns the number of rows processed (inserted or updated). All upserts
/// run inside a single transaction; if any operation fails the entire batch
/// is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_pricing(pool: &PgPool, pricing: &[PricingSeed]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for entry in pricing {
        sqlx::query(
            "INSERT INTO pricing (usage_type, price_per_token) \
             VALUES ($1, $2) \
             ON CONFLICT (usage_type) DO UPDATE SET \
                 price_per_token = EXCLUDED.price_per_token, \
                 updated_at      = NOW()",
        )
        .bind(&entry.usage_type)
        .bind(entry.price_per_token)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}

/// Upsert tenants from config into the database, including their personas
/// and subscriptions.
///
/// Tenants are keyed by slug; an existing tenant keeps its id. A tenant
/// with a `monthly_token_quota` gets an active subscription (plan defaults
/// to `starter`); the quota of an existing active subscription is updated
/// in place.
///
/// Returns the number of tenants processed. All upserts run inside a
/// single transaction; if any operation fails the entire batch is rolled
/// back.
///
/// # Errors
///
/// Returns [`DbError::Json`] if a persona cannot be serialized, or
/// [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_tenants(pool: &PgPool, tenants: &[TenantSeed]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for tenant in tenants {
        let slug = tenant.slug();
        let persona = tenant
            .persona
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let tenant_id: Uuid = sqlx::query_scalar(
            "INSERT INTO tenants (id, name, slug, persona) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (slug) DO UPDATE SET \
                 name       = EXCLUDED.name, \
                 persona    = EXCLUDED.persona, \
                 updated_at = NOW() \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(&tenant.name)
        .bind(&slug)
        .bind(persona)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(quota) = tenant.monthly_token_quota {
            let plan = tenant.plan.clone().unwrap_or_else(|| "starter".to_string());

            sqlx::query(
                "INSERT INTO subscriptions (tenant_id, plan, monthly_token_quota) \
                 VALUES ($1, $2, $3) \
                 ON CONFLICT (tenant_id) WHERE status = 'active' DO UPDATE SET \
                     plan                = EXCLUDED.plan, \
                     monthly_token_quota = EXCLUDED.monthly_token_quota, \
                     updated_at          = NOW()",
            )
            .bind(tenant_id)
            .bind(&plan)
            .bind(quota)
            .execute(&mut *tx)
            .await?;
        }

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
