use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

const JOB_STATUSES: [&str; 4] = ["queued", "running", "succeeded", "failed"];

#[derive(Debug, Serialize)]
pub(super) struct JobItem {
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

impl From<pulse_db::JobRow> for JobItem {
    fn from(row: pulse_db::JobRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            comment_id: row.comment_id,
            tenant_id: row.tenant_id,
            payload: row.payload,
            status: row.status,
            attempts: row.attempts,
            max_attempts: row.max_attempts,
            last_error: row.last_error,
            run_after: row.run_after,
            created_at: row.created_at,
            started_at: row.started_at,
            finished_at: row.finished_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct JobsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub(super) async fn list_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<ApiResponse<Vec<JobItem>>>, ApiError> {
    if let Some(status) = query.status.as_deref() {
        if !JOB_STATUSES.contains(&status) {
            return Err(ApiError::new(
                req_id.0,
                "bad_request",
                format!("unknown job status '{status}'"),
            ));
        }
    }

    let rows = pulse_db::list_jobs(&state.pool, query.status.as_deref(), normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(JobItem::from).collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
