use axum::{
    extract::{Path, State},
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct UsageReport {
    pub tenant_id: Uuid,
    pub plan: Option<String>,
    pub has_quota: bool,
    pub quota_limit: i64,
    pub tokens_used: i64,
    pub tokens_remaining: i64,
    pub quota_exceeded: bool,
    pub breakdown: Vec<UsageBreakdownItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct UsageBreakdownItem {
    pub usage_type: String,
    pub tokens: i64,
    pub cost: Decimal,
    pub count: i64,
}

/// Current-month usage and quota standing for one tenant.
pub(super) async fn tenant_usage(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ApiResponse<UsageReport>>, ApiError> {
    pulse_db::get_tenant(&state.pool, tenant_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let report = pulse_db::quota_report(&state.pool, tenant_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = UsageReport {
        tenant_id,
        plan: report.plan,
        has_quota: report.has_quota,
        quota_limit: report.quota_limit,
        tokens_used: report.tokens_used,
        tokens_remaining: report.tokens_remaining,
        quota_exceeded: report.quota_exceeded,
        breakdown: report
            .breakdown
            .into_iter()
            .map(|b| UsageBreakdownItem {
                usage_type: b.usage_type,
                tokens: b.tokens,
                cost: b.cost,
                count: b.count,
            })
            .collect(),
    };

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
