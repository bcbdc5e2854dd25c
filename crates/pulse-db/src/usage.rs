//! Usage metering: the append-only ledger, pricing lookups, and the
//! monthly quota report.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `usage_records` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UsageRecordRow {
    pub id: i64,
    pub tenant_id: Uuid,
    pub usage_type: String,
    pub tokens_used: i64,
    pub cost: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A row from the `subscriptions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscriptionRow {
    pub id: i64,
    pub tenant_id: Uuid,
    pub plan: String,
    pub monthly_token_quota: i64,
    pub status: String,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-operation aggregate for the current calendar month.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UsageBreakdown {
    pub usage_type: String,
    pub tokens: i64,
    pub cost: Decimal,
    pub count: i64,
}

/// Quota standing for a tenant over the current calendar month.
///
/// `has_quota` is `false` when the tenant has no active subscription; that
/// is a soft signal for dashboards, never a hard block on pipeline work.
#[derive(Debug, Clone)]
pub struct QuotaReport {
    pub has_quota: bool,
    pub plan: Option<String>,
    pub quota_limit: i64,
    pub tokens_used: i64,
    pub tokens_remaining: i64,
    pub quota_exceeded: bool,
    pub breakdown: Vec<UsageBreakdown>,
}

/// Appends one usage record to the ledger.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_usage_record(
    pool: &PgPool,
    tenant_id: Uuid,
    usage_type: &str,
    tokens_used: i64,
    cost: Decimal,
) -> Result<UsageRecordRow, DbError> {
    let row = sqlx::query_as::<_, UsageRecordRow>(
        "INSERT INTO usage_records (tenant_id, usage_type, tokens_used, cost) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, tenant_id, usage_type, tokens_used, cost, created_at",
    )
    .bind(tenant_id)
    .bind(usage_type)
    .bind(tokens_used)
    .bind(cost)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Looks up the configured per-token price for an operation type, or `None`
/// when the pricing table has no row for it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn price_per_token(
    pool: &PgPool,
    usage_type: &str,
) -> Result<Option<Decimal>, DbError> {
    let price = sqlx::query_scalar::<_, Decimal>(
        "SELECT price_per_token FROM pricing WHERE usage_type = $1",
    )
    .bind(usage_type)
    .fetch_optional(pool)
    .await?;

    Ok(price)
}

/// Fallback per-token prices for operation types missing from the pricing
/// table. Metering must never fail on an unpriced operation.
fn default_price_per_token(usage_type: &str) -> Decimal {
    match usage_type {
        "embedding" => Decimal::new(1, 4),      // 0.0001
        "classification" => Decimal::new(2, 4), // 0.0002
        "generation" => Decimal::new(2, 3),     // 0.002
        _ => Decimal::new(1, 3),                // 0.001
    }
}

/// Meters one operation: resolves the cost and appends the ledger record.
///
/// An explicit `cost` (e.g. computed from per-model LLM rates) is stored
/// as-is. Otherwise the cost is `tokens × price_per_token` from the pricing
/// table, falling back to built-in defaults when the table has no row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn record_usage(
    pool: &PgPool,
    tenant_id: Uuid,
    usage_type: &str,
    tokens_used: i64,
    cost: Option<Decimal>,
) -> Result<UsageRecordRow, DbError> {
    let cost = match cost {
        Some(cost) => cost,
        None => {
            let price = price_per_token(pool, usage_type)
                .await?
                .unwrap_or_else(|| default_price_per_token(usage_type));
            price * Decimal::from(tokens_used)
        }
    };

    insert_usage_record(pool, tenant_id, usage_type, tokens_used, cost).await
}

/// Returns the tenant's active subscription, or `None` when it has none.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn active_subscription(
    pool: &PgPool,
    tenant_id: Uuid,
) -> Result<Option<SubscriptionRow>, DbError> {
    let row = sqlx::query_as::<_, SubscriptionRow>(
        "SELECT id, tenant_id, plan, monthly_token_quota, status, \
                current_period_start, current_period_end, created_at, updated_at \
         FROM subscriptions \
         WHERE tenant_id = $1 AND status = 'active'",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Aggregates the tenant's current-calendar-month usage per operation type.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn month_usage_breakdown(
    pool: &PgPool,
    tenant_id: Uuid,
) -> Result<Vec<UsageBreakdown>, DbError> {
    let rows = sqlx::query_as::<_, UsageBreakdown>(
        "SELECT usage_type, \
                COALESCE(SUM(tokens_used), 0)::BIGINT AS tokens, \
                COALESCE(SUM(cost), 0) AS cost, \
                COUNT(*) AS count \
         FROM usage_records \
         WHERE tenant_id = $1 AND created_at >= date_trunc('month', NOW()) \
         GROUP BY usage_type \
         ORDER BY usage_type",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Builds the tenant's quota report for the current calendar month.
///
/// Without an active subscription the report is all zeros with
/// `has_quota = false`. With one, `tokens_remaining` is clamped at zero and
/// `quota_exceeded` flips once usage passes the limit.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn quota_report(pool: &PgPool, tenant_id: Uuid) -> Result<QuotaReport, DbError> {
    let Some(subscription) = active_subscription(pool, tenant_id).await? else {
        return Ok(QuotaReport {
            has_quota: false,
            plan: None,
            quota_limit: 0,
            tokens_used: 0,
            tokens_remaining: 0,
            quota_exceeded: false,
            breakdown: Vec::new(),
        });
    };

    let breakdown = month_usage_breakdown(pool, tenant_id).await?;
    let tokens_used: i64 = breakdown.iter().map(|b| b.tokens).sum();
    let quota_limit = subscription.monthly_token_quota;

    Ok(QuotaReport {
        has_quota: true,
        plan: Some(subscription.plan),
        quota_limit,
        tokens_used,
        tokens_remaining: (quota_limit - tokens_used).max(0),
        quota_exceeded: tokens_used > quota_limit,
        breakdown,
    })
}
