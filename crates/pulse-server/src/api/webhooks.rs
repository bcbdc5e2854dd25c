use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pulse_core::PlatformType;
use pulse_ingest::WebhookSecrets;

use crate::ingest;
use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct WebhookQuery {
    pub tenant: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct WebhookAck {
    pub status: &'static str,
    pub message: String,
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub(super) struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
}

/// Signed webhook delivery from a platform.
///
/// Verification runs over the raw bytes before JSON parsing. The tenant is
/// picked by the `?tenant=<slug>` query parameter, falling back to the
/// configured default tenant; a delivery that resolves to neither is
/// rejected rather than guessed at.
pub(super) async fn receive_webhook(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(platform): Path<String>,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<WebhookAck>>), ApiError> {
    let Ok(platform) = platform.parse::<PlatformType>() else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("unknown platform '{platform}'"),
        ));
    };

    let secrets = WebhookSecrets::from_config(&state.config);
    let verified = pulse_ingest::verify_signature(
        platform,
        &body,
        |name| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        },
        &secrets,
    );
    if !verified {
        tracing::warn!(platform = platform.as_str(), "webhook signature rejected");
        return Err(ApiError::new(
            req_id.0,
            "unauthorized",
            "invalid webhook signature",
        ));
    }

    let payload: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            format!("malformed JSON payload: {e}"),
        )
    })?;

    let tenant_id = resolve_tenant(&state, &req_id.0, query.tenant.as_deref()).await?;

    let outcome = ingest::process_delivery(&state.pool, &state.config, tenant_id, platform, &payload)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let total = outcome.processed + outcome.duplicates + outcome.skipped;
    if total > 0 && outcome.processed == 0 && outcome.duplicates == 0 {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "no event in the delivery could be normalized",
        ));
    }

    let status = if total > 0 && outcome.processed == 0 {
        "duplicate"
    } else {
        "accepted"
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: WebhookAck {
                status,
                message: format!(
                    "Processed {} comments from {}",
                    outcome.processed,
                    platform.as_str()
                ),
                job_id: outcome.job_id,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// Subscription verification handshake (`hub.challenge` echo).
///
/// Instagram and YouTube probe the endpoint with a GET carrying a mode, a
/// challenge, and the token the operator configured with the platform; the
/// endpoint must echo the challenge as plain text only when the token
/// matches.
pub(super) async fn verify_subscription(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(platform): Path<String>,
    Query(query): Query<VerifyQuery>,
) -> Result<String, ApiError> {
    if platform.parse::<PlatformType>().is_err() {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("unknown platform '{platform}'"),
        ));
    }

    let subscribe = query.mode.as_deref() == Some("subscribe");
    let token_matches = match (&state.config.webhook_verify_token, &query.verify_token) {
        (Some(expected), Some(provided)) => expected == provided,
        _ => false,
    };

    if subscribe && token_matches {
        Ok(query.challenge.unwrap_or_default())
    } else {
        tracing::warn!(platform = %platform, "webhook verification handshake rejected");
        Err(ApiError::new(
            req_id.0,
            "forbidden",
            "verification token mismatch",
        ))
    }
}

async fn resolve_tenant(
    state: &AppState,
    req_id: &str,
    slug: Option<&str>,
) -> Result<Uuid, ApiError> {
    if let Some(slug) = slug {
        let tenant = pulse_db::get_tenant_by_slug(&state.pool, slug)
            .await
            .map_err(|e| map_db_error(req_id.to_string(), &e))?;
        return tenant.map(|t| t.id).ok_or_else(|| {
            ApiError::new(
                req_id.to_string(),
                "not_found",
                format!("unknown tenant '{slug}'"),
            )
        });
    }

    let Some(default_slug) = state.config.default_tenant.as_deref() else {
        return Err(ApiError::new(
            req_id.to_string(),
            "validation_error",
            "no tenant specified and no default tenant configured",
        ));
    };

    let tenant = pulse_db::get_tenant_by_slug(&state.pool, default_slug)
        .await
        .map_err(|e| map_db_error(req_id.to_string(), &e))?;
    tenant.map(|t| t.id).ok_or_else(|| {
        ApiError::new(
            req_id.to_string(),
            "validation_error",
            format!("default tenant '{default_slug}' does not exist"),
        )
    })
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use tower::ServiceExt;

    use crate::api::test_support::{seed_tenant, test_state};
    use crate::api::{build_app, default_rate_limit_state, AppState};
    use crate::middleware::AuthState;

    fn hex(bytes: &[u8]) -> String {
        use std::fmt::Write;
        bytes.iter().fold(String::new(), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
    }

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac key");
        mac.update(body);
        format!("sha256={}", hex(&mac.finalize().into_bytes()))
    }

    fn instagram_body(comment_id: &str, text: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "entry": [{
                "id": "page_1",
                "changes": [{
                    "field": "comments",
                    "value": {
                        "id": comment_id,
                        "text": text,
                        "from": {"id": "u1", "username": "alice"},
                        "media": {"id": "m1", "permalink": "https://instagram.com/p/m1"},
                        "timestamp": "2024-01-15T10:30:00Z"
                    }
                }]
            }]
        }))
        .expect("serialize body")
    }

    fn test_app(state: AppState) -> axum::Router {
        let auth = AuthState::from_env(true).expect("auth");
        build_app(state, auth, default_rate_limit_state())
    }

    async fn post_signed(
        app: axum::Router,
        uri: &str,
        body: Vec<u8>,
        signature: &str,
    ) -> (axum::http::StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .header("x-hub-signature-256", signature)
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn signed_delivery_is_accepted(pool: sqlx::PgPool) {
        seed_tenant(&pool, "acme").await;
        let app = test_app(test_state(pool.clone()));

        let body = instagram_body("wh_c_1", "This looks great");
        let sig = sign("ig-test-secret", &body);
        let (status, json) =
            post_signed(app, "/webhooks/instagram?tenant=acme", body, &sig).await;

        assert_eq!(status, axum::http::StatusCode::ACCEPTED);
        assert_eq!(json["data"]["status"].as_str(), Some("accepted"));
        assert_eq!(
            json["data"]["message"].as_str(),
            Some("Processed 1 comments from instagram")
        );
        assert!(json["data"]["job_id"].is_string());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 1);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn bad_signature_is_rejected(pool: sqlx::PgPool) {
        seed_tenant(&pool, "acme").await;
        let app = test_app(test_state(pool.clone()));

        let body = instagram_body("wh_c_2", "tampered");
        let sig = sign("wrong-secret", &body);
        let (status, json) =
            post_signed(app, "/webhooks/instagram?tenant=acme", body, &sig).await;

        assert_eq!(status, axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"].as_str(), Some("unauthorized"));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn unknown_platform_is_404(pool: sqlx::PgPool) {
        let app = test_app(test_state(pool));
        let (status, json) = post_signed(app, "/webhooks/myspace", b"{}".to_vec(), "x").await;

        assert_eq!(status, axum::http::StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"].as_str(), Some("not_found"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn malformed_json_is_422(pool: sqlx::PgPool) {
        seed_tenant(&pool, "acme").await;
        let app = test_app(test_state(pool));

        let body = b"{not json".to_vec();
        let sig = sign("ig-test-secret", &body);
        let (status, json) =
            post_signed(app, "/webhooks/instagram?tenant=acme", body, &sig).await;

        assert_eq!(status, axum::http::StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn unknown_tenant_slug_is_404(pool: sqlx::PgPool) {
        let app = test_app(test_state(pool));

        let body = instagram_body("wh_c_3", "hi");
        let sig = sign("ig-test-secret", &body);
        let (status, json) =
            post_signed(app, "/webhooks/instagram?tenant=nobody", body, &sig).await;

        assert_eq!(status, axum::http::StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"].as_str(), Some("not_found"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn missing_tenant_without_default_is_422(pool: sqlx::PgPool) {
        let app = test_app(test_state(pool));

        let body = instagram_body("wh_c_4", "hi");
        let sig = sign("ig-test-secret", &body);
        let (status, json) = post_signed(app, "/webhooks/instagram", body, &sig).await;

        assert_eq!(status, axum::http::StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn default_tenant_fallback_applies(pool: sqlx::PgPool) {
        seed_tenant(&pool, "fallback-tenant").await;
        let mut config = crate::api::test_support::test_config();
        config.default_tenant = Some("fallback-tenant".to_string());
        let state = AppState {
            pool: pool.clone(),
            config: std::sync::Arc::new(config),
        };
        let app = test_app(state);

        let body = instagram_body("wh_c_5", "default tenant route");
        let sig = sign("ig-test-secret", &body);
        let (status, json) = post_signed(app, "/webhooks/instagram", body, &sig).await;

        assert_eq!(status, axum::http::StatusCode::ACCEPTED);
        assert_eq!(json["data"]["status"].as_str(), Some("accepted"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn redelivery_answers_duplicate(pool: sqlx::PgPool) {
        seed_tenant(&pool, "acme").await;
        let state = test_state(pool.clone());

        let body = instagram_body("wh_c_6", "same bytes");
        let sig = sign("ig-test-secret", &body);
        let (first_status, _) = post_signed(
            test_app(state.clone()),
            "/webhooks/instagram?tenant=acme",
            body.clone(),
            &sig,
        )
        .await;
        let (second_status, json) = post_signed(
            test_app(state),
            "/webhooks/instagram?tenant=acme",
            body,
            &sig,
        )
        .await;

        assert_eq!(first_status, axum::http::StatusCode::ACCEPTED);
        assert_eq!(second_status, axum::http::StatusCode::ACCEPTED);
        assert_eq!(json["data"]["status"].as_str(), Some("duplicate"));
        assert_eq!(json["data"]["job_id"], serde_json::Value::Null);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn empty_envelope_is_accepted_with_zero_count(pool: sqlx::PgPool) {
        seed_tenant(&pool, "acme").await;
        let app = test_app(test_state(pool));

        let body = serde_json::to_vec(&serde_json::json!({"entry": []})).expect("body");
        let sig = sign("ig-test-secret", &body);
        let (status, json) =
            post_signed(app, "/webhooks/instagram?tenant=acme", body, &sig).await;

        assert_eq!(status, axum::http::StatusCode::ACCEPTED);
        assert_eq!(
            json["data"]["message"].as_str(),
            Some("Processed 0 comments from instagram")
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn all_invalid_events_is_422(pool: sqlx::PgPool) {
        seed_tenant(&pool, "acme").await;
        let app = test_app(test_state(pool));

        let body = serde_json::to_vec(&serde_json::json!({
            "entry": [{
                "changes": [{"field": "comments", "value": {"text": "no id here"}}]
            }]
        }))
        .expect("body");
        let sig = sign("ig-test-secret", &body);
        let (status, json) =
            post_signed(app, "/webhooks/instagram?tenant=acme", body, &sig).await;

        assert_eq!(status, axum::http::StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn verify_handshake_echoes_challenge(pool: sqlx::PgPool) {
        let app = test_app(test_state(pool));
        let response = app
            .oneshot(
                Request::builder()
                    .uri(
                        "/webhooks/instagram/verify?hub.mode=subscribe\
                         &hub.challenge=challenge-123&hub.verify_token=verify-me",
                    )
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        assert_eq!(&bytes[..], b"challenge-123");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn verify_handshake_rejects_wrong_token(pool: sqlx::PgPool) {
        let app = test_app(test_state(pool));
        let response = app
            .oneshot(
                Request::builder()
                    .uri(
                        "/webhooks/instagram/verify?hub.mode=subscribe\
                         &hub.challenge=challenge-123&hub.verify_token=wrong",
                    )
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), axum::http::StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn youtube_delivery_needs_no_signature(pool: sqlx::PgPool) {
        seed_tenant(&pool, "acme").await;
        let app = test_app(test_state(pool));

        let body = serde_json::to_vec(&serde_json::json!({"items": []})).expect("body");
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks/youtube?tenant=acme")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), axum::http::StatusCode::ACCEPTED);
    }
}
