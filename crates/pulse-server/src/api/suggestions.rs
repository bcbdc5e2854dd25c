use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SuggestionList {
    pub comment_id: Uuid,
    pub status: &'static str,
    pub job_id: Option<Uuid>,
    pub suggestions: Vec<SuggestionItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct SuggestionItem {
    pub id: Uuid,
    pub text: String,
    pub score: f64,
    pub confidence: &'static str,
    pub model_used: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Fetch reply suggestions for a comment, generating them on first request.
///
/// Suggestions are produced by a background job rather than inline, so the
/// first call typically answers `pending` with the job id and a later call
/// finds them `ready`. A `failed` status means the job exhausted its retries;
/// a fresh attempt is queued behind that report, so the next poll finds it
/// `pending` again.
pub(super) async fn list_comment_suggestions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<ApiResponse<SuggestionList>>, ApiError> {
    let comment = pulse_db::get_comment(&state.pool, comment_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let rows = pulse_db::list_suggestions(&state.pool, comment_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if !rows.is_empty() {
        let suggestions = rows
            .into_iter()
            .map(|row| SuggestionItem {
                id: row.id,
                text: row.suggested_reply,
                score: row.score,
                confidence: pulse_ai::confidence_band(row.score),
                model_used: row.model_used,
                generated_at: row.generated_at,
            })
            .collect();

        return Ok(Json(ApiResponse {
            data: SuggestionList {
                comment_id,
                status: "ready",
                job_id: None,
                suggestions,
            },
            meta: ResponseMeta::new(req_id.0),
        }));
    }

    let latest = pulse_db::latest_job_for_comment(
        &state.pool,
        comment_id,
        pulse_db::JobKind::SuggestionGeneration,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let (status, job_id) = match latest {
        Some(job) if job.status == "queued" || job.status == "running" => ("pending", job.id),
        Some(job) if job.status == "failed" => {
            // Report the exhausted job, but queue a fresh attempt so the
            // next poll picks it up as pending instead of staying stuck.
            enqueue_generation(&state, comment_id, comment.tenant_id)
                .await
                .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
            ("failed", job.id)
        }
        // Either nothing was ever enqueued or a previous run finished without
        // persisting rows; start a new generation either way.
        _ => {
            let job = enqueue_generation(&state, comment_id, comment.tenant_id)
                .await
                .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
            ("pending", job.id)
        }
    };

    Ok(Json(ApiResponse {
        data: SuggestionList {
            comment_id,
            status,
            job_id: Some(job_id),
            suggestions: Vec::new(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

async fn enqueue_generation(
    state: &AppState,
    comment_id: Uuid,
    tenant_id: Uuid,
) -> Result<pulse_db::JobRow, pulse_db::DbError> {
    pulse_db::enqueue_job(
        &state.pool,
        pulse_db::JobKind::SuggestionGeneration,
        comment_id,
        tenant_id,
        serde_json::json!({ "num_suggestions": state.config.suggestion_count }),
        state.config.job_max_attempts,
    )
    .await
}
