//! Offline unit tests for pulse-db pool configuration and row types.
//! These tests do not require a live database connection.

use pulse_core::{AppConfig, EditPolicy, Environment};
use pulse_db::{PoolConfig, ReplyRow, SubscriptionRow, SuggestionRow, TenantRow, UsageRecordRow};
use rust_decimal::Decimal;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use uuid::Uuid;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        pricing_path: PathBuf::from("./config/pricing.yaml"),
        tenants_path: PathBuf::from("./config/tenants.yaml"),
        default_tenant: None,
        instagram_app_secret: None,
        twitter_consumer_secret: None,
        linkedin_client_secret: None,
        webhook_verify_token: None,
        on_comment_edit: EditPolicy::Preserve,
        dedup_window_hours: 24,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        embedding_url: "http://localhost:8080".to_string(),
        llm_url: "https://api.openai.com/v1".to_string(),
        llm_api_key: None,
        llm_model: "gpt-4-turbo-preview".to_string(),
        instagram_graph_url: "https://graph.instagram.com".to_string(),
        ai_request_timeout_secs: 30,
        suggestion_count: 3,
        worker_concurrency: 4,
        worker_poll_interval_ms: 500,
        job_max_attempts: 3,
        job_backoff_base_secs: 5,
        job_visibility_timeout_secs: 300,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`TenantRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn tenant_row_has_expected_fields() {
    use chrono::Utc;

    let row = TenantRow {
        id: Uuid::new_v4(),
        name: "Acme Beverages".to_string(),
        slug: "acme-beverages".to_string(),
        persona: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert_eq!(row.slug, "acme-beverages");
    assert!(row.persona.is_none());
}

/// Compile-time smoke test for the reply and suggestion rows.
#[test]
fn reply_and_suggestion_rows_have_expected_fields() {
    use chrono::Utc;

    let comment_id = Uuid::new_v4();

    let reply = ReplyRow {
        id: Uuid::new_v4(),
        comment_id,
        message: "Thanks for the kind words!".to_string(),
        author_name: Some("Jordan".to_string()),
        created_at: Utc::now(),
    };
    assert_eq!(reply.comment_id, comment_id);
    assert_eq!(reply.author_name.as_deref(), Some("Jordan"));

    let suggestion = SuggestionRow {
        id: Uuid::new_v4(),
        comment_id,
        suggested_reply: "So glad you enjoyed it!".to_string(),
        score: 0.9,
        model_used: Some("gpt-4-turbo-preview".to_string()),
        generated_at: Utc::now(),
    };
    assert_eq!(suggestion.comment_id, comment_id);
    assert!((suggestion.score - 0.9).abs() < f64::EPSILON);
}

/// Compile-time smoke test for the billing rows.
#[test]
fn usage_and_subscription_rows_have_expected_fields() {
    use chrono::Utc;

    let tenant_id = Uuid::new_v4();

    let usage = UsageRecordRow {
        id: 1,
        tenant_id,
        usage_type: "embedding".to_string(),
        tokens_used: 12,
        cost: Decimal::new(12, 4),
        created_at: Utc::now(),
    };
    assert_eq!(usage.usage_type, "embedding");
    assert_eq!(usage.tokens_used, 12);

    let subscription = SubscriptionRow {
        id: 1,
        tenant_id,
        plan: "pro".to_string(),
        monthly_token_quota: 500_000,
        status: "active".to_string(),
        current_period_start: None,
        current_period_end: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    assert_eq!(subscription.plan, "pro");
    assert_eq!(subscription.monthly_token_quota, 500_000);
}
