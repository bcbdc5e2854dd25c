use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// What happens to derived fields when a webhook re-delivers an edited
/// comment with a changed message.
///
/// `Preserve` keeps the stored embedding and classification (recomputation is
/// a separate, deliberate decision); `Invalidate` clears both so the next
/// fan-out recomputes them from the new text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPolicy {
    Preserve,
    Invalidate,
}

impl std::fmt::Display for EditPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditPolicy::Preserve => write!(f, "preserve"),
            EditPolicy::Invalidate => write!(f, "invalidate"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub pricing_path: PathBuf,
    pub tenants_path: PathBuf,
    pub default_tenant: Option<String>,
    pub instagram_app_secret: Option<String>,
    pub twitter_consumer_secret: Option<String>,
    pub linkedin_client_secret: Option<String>,
    pub webhook_verify_token: Option<String>,
    pub on_comment_edit: EditPolicy,
    pub dedup_window_hours: i64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub embedding_url: String,
    pub llm_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub instagram_graph_url: String,
    pub ai_request_timeout_secs: u64,
    pub suggestion_count: usize,
    pub worker_concurrency: usize,
    pub worker_poll_interval_ms: u64,
    pub job_max_attempts: i32,
    pub job_backoff_base_secs: u64,
    pub job_visibility_timeout_secs: i64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("pricing_path", &self.pricing_path)
            .field("tenants_path", &self.tenants_path)
            .field("default_tenant", &self.default_tenant)
            .field("database_url", &"[redacted]")
            .field(
                "instagram_app_secret",
                &self.instagram_app_secret.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "twitter_consumer_secret",
                &self.twitter_consumer_secret.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "linkedin_client_secret",
                &self.linkedin_client_secret.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "webhook_verify_token",
                &self.webhook_verify_token.as_ref().map(|_| "[redacted]"),
            )
            .field("on_comment_edit", &self.on_comment_edit)
            .field("dedup_window_hours", &self.dedup_window_hours)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("embedding_url", &self.embedding_url)
            .field("llm_url", &self.llm_url)
            .field(
                "llm_api_key",
                &self.llm_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("llm_model", &self.llm_model)
            .field("instagram_graph_url", &self.instagram_graph_url)
            .field("ai_request_timeout_secs", &self.ai_request_timeout_secs)
            .field("suggestion_count", &self.suggestion_count)
            .field("worker_concurrency", &self.worker_concurrency)
            .field("worker_poll_interval_ms", &self.worker_poll_interval_ms)
            .field("job_max_attempts", &self.job_max_attempts)
            .field("job_backoff_base_secs", &self.job_backoff_base_secs)
            .field(
                "job_visibility_timeout_secs",
                &self.job_visibility_timeout_secs,
            )
            .finish()
    }
}
