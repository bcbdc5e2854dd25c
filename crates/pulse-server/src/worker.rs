//! Background workers draining the job queue.
//!
//! Each worker loops on [`pulse_db::claim_next_job`] and dispatches on the
//! job kind. A failed attempt with budget left goes back to the queue with an
//! exponential-backoff `run_after`; a terminal failure parks the job in
//! `failed`. Usage is metered only after the job's own writes and the
//! `succeeded` transition have both landed, so a retried attempt never bills
//! twice.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pgvector::Vector;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use uuid::Uuid;

use pulse_ai::{ChatClient, EmbeddingClient, ReplyExample};
use pulse_core::{AppConfig, CanonicalAuthor, PlatformType};
use pulse_db::{CommentRow, DbError, JobKind, JobRow, NewSuggestion};

use crate::connector::{ConnectorError, Connectors};

/// Cosine distance ceiling for RAG retrieval; pairs at or beyond it read as
/// unrelated and are excluded from the prompt.
const MAX_DISTANCE: f64 = 0.3;

/// Retrieval depth, aligned with [`pulse_ai::MAX_EXAMPLES`]; the prompt
/// composer drops anything beyond that cap anyway.
const EXAMPLE_LIMIT: i64 = 5;

/// Delay ceiling between attempts.
const MAX_DELAY_SECS: u64 = 600;

/// Backoff policy for failed job attempts.
///
/// The delay after the Nth failed attempt is `base × 2^(N-1)`, capped at
/// [`MAX_DELAY_SECS`], with ±25% jitter so a burst of failures does not
/// requeue in lockstep.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    base_secs: u64,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(base_secs: u64) -> Self {
        Self { base_secs }
    }

    /// Seconds to wait after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_secs(self, attempt: u32) -> i64 {
        let shift = attempt.saturating_sub(1).min(10);
        let computed = self.base_secs.saturating_mul(1u64 << shift);
        let capped = computed.min(MAX_DELAY_SECS);
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as i64;
        jittered
    }
}

/// Everything a worker needs to run any job kind.
pub struct WorkerContext {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub embeddings: EmbeddingClient,
    pub chat: ChatClient,
    pub connectors: Connectors,
    pub retry: RetryPolicy,
    pub poll_interval: Duration,
}

impl WorkerContext {
    /// Builds the shared context from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when one of the HTTP clients cannot be constructed.
    pub fn from_config(pool: PgPool, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let embeddings = EmbeddingClient::new(&config.embedding_url, config.ai_request_timeout_secs)?;
        let chat = ChatClient::new(
            &config.llm_url,
            config.llm_api_key.as_deref(),
            &config.llm_model,
            config.ai_request_timeout_secs,
        )?;
        let connectors = Connectors::from_config(&config)?;
        let retry = RetryPolicy::new(config.job_backoff_base_secs);
        let poll_interval = Duration::from_millis(config.worker_poll_interval_ms);

        Ok(Self {
            pool,
            config,
            embeddings,
            chat,
            connectors,
            retry,
            poll_interval,
        })
    }
}

/// Spawns the configured number of worker loops.
///
/// # Errors
///
/// Returns an error when the worker context cannot be built.
pub fn spawn_workers(pool: PgPool, config: Arc<AppConfig>) -> anyhow::Result<Vec<JoinHandle<()>>> {
    let ctx = Arc::new(WorkerContext::from_config(pool, config)?);

    let handles = (0..ctx.config.worker_concurrency)
        .map(|worker_id| {
            let ctx = Arc::clone(&ctx);
            tokio::spawn(run_worker(worker_id, ctx))
        })
        .collect();

    Ok(handles)
}

async fn run_worker(worker_id: usize, ctx: Arc<WorkerContext>) {
    tracing::debug!(worker_id, "worker started");
    loop {
        match pulse_db::claim_next_job(&ctx.pool).await {
            Ok(Some(job)) => process_job(&ctx, &job).await,
            Ok(None) => tokio::time::sleep(ctx.poll_interval).await,
            Err(e) => {
                tracing::error!(worker_id, error = %e, "job claim failed");
                tokio::time::sleep(ctx.poll_interval).await;
            }
        }
    }
}

/// A failed job attempt, flagged as worth retrying or not.
#[derive(Debug)]
struct JobError {
    message: String,
    retriable: bool,
}

impl JobError {
    fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retriable: true,
        }
    }

    fn terminal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retriable: false,
        }
    }
}

impl From<DbError> for JobError {
    fn from(e: DbError) -> Self {
        // A vanished row means the comment (or tenant) was deleted under the
        // job; waiting will not bring it back.
        match e {
            DbError::NotFound => JobError::terminal(e.to_string()),
            other => JobError::transient(other.to_string()),
        }
    }
}

impl From<pulse_ai::AiError> for JobError {
    fn from(e: pulse_ai::AiError) -> Self {
        JobError::transient(e.to_string())
    }
}

impl From<ConnectorError> for JobError {
    fn from(e: ConnectorError) -> Self {
        Self {
            retriable: e.is_retriable(),
            message: e.to_string(),
        }
    }
}

/// Runs one claimed job to a terminal state for this attempt.
pub async fn process_job(ctx: &WorkerContext, job: &JobRow) {
    let Some(kind) = JobKind::parse(&job.kind) else {
        tracing::error!(job_id = %job.id, kind = %job.kind, "unknown job kind");
        let message = format!("unknown job kind '{}'", job.kind);
        if let Err(e) = pulse_db::fail_job(&ctx.pool, job.id, &message).await {
            tracing::error!(job_id = %job.id, error = %e, "could not mark job failed");
        }
        return;
    };

    let result = match kind {
        JobKind::EmbeddingGeneration => run_embedding(ctx, job).await,
        JobKind::Classification => run_classification(ctx, job).await,
        JobKind::SuggestionGeneration => run_suggestion(ctx, job).await,
        JobKind::ReplySubmission => run_reply_submission(ctx, job).await,
    };

    match result {
        Ok(()) => {
            tracing::debug!(job_id = %job.id, kind = %kind, "job finished");
        }
        Err(e) if e.retriable && job.attempts < job.max_attempts => {
            let delay = ctx.retry.delay_secs(job.attempts.max(1).unsigned_abs());
            let run_after = Utc::now() + chrono::Duration::seconds(delay);
            tracing::warn!(
                job_id = %job.id,
                kind = %kind,
                attempt = job.attempts,
                delay_secs = delay,
                error = %e.message,
                "job attempt failed, requeued"
            );
            if let Err(db_err) = pulse_db::retry_job(&ctx.pool, job.id, &e.message, run_after).await
            {
                tracing::error!(job_id = %job.id, error = %db_err, "could not requeue job");
            }
        }
        Err(e) => {
            tracing::error!(
                job_id = %job.id,
                kind = %kind,
                attempts = job.attempts,
                error = %e.message,
                "job failed terminally"
            );
            if let Err(db_err) = pulse_db::fail_job(&ctx.pool, job.id, &e.message).await {
                tracing::error!(job_id = %job.id, error = %db_err, "could not mark job failed");
            }
        }
    }
}

/// Meter usage after a durably-succeeded attempt. A metering failure at this
/// point is logged, never propagated: the work itself is already committed.
async fn meter(
    ctx: &WorkerContext,
    tenant_id: Uuid,
    usage_type: &str,
    tokens: i64,
    cost: Option<Decimal>,
) {
    if let Err(e) = pulse_db::record_usage(&ctx.pool, tenant_id, usage_type, tokens, cost).await {
        tracing::error!(
            tenant_id = %tenant_id,
            usage_type,
            error = %e,
            "usage metering failed after job completion"
        );
    }
}

fn stored_platform(comment: &CommentRow) -> Result<PlatformType, JobError> {
    comment.platform.parse().map_err(|_| {
        JobError::terminal(format!(
            "comment {} has unknown platform '{}'",
            comment.id, comment.platform
        ))
    })
}

/// Display name for the prompt, resolved from the comment's author snapshot.
fn author_display_name(author: &Value) -> String {
    serde_json::from_value::<CanonicalAuthor>(author.clone())
        .ok()
        .and_then(|a| a.display_name.or(a.username))
        .unwrap_or_else(|| "unknown".to_string())
}

async fn run_embedding(ctx: &WorkerContext, job: &JobRow) -> Result<(), JobError> {
    let comment = pulse_db::get_comment(&ctx.pool, job.comment_id).await?;

    // A redelivered or reaped job whose work already landed: nothing to do.
    if comment.embedding.is_some() {
        pulse_db::complete_job(&ctx.pool, job.id).await?;
        return Ok(());
    }

    let raw = ctx.embeddings.embed_text(&comment.message).await?;
    pulse_db::set_embedding(&ctx.pool, comment.id, &Vector::from(raw)).await?;
    pulse_db::complete_job(&ctx.pool, job.id).await?;

    meter(
        ctx,
        job.tenant_id,
        "embedding",
        pulse_ai::estimate_tokens(&comment.message),
        None,
    )
    .await;
    Ok(())
}

async fn run_classification(ctx: &WorkerContext, job: &JobRow) -> Result<(), JobError> {
    let comment = pulse_db::get_comment(&ctx.pool, job.comment_id).await?;

    if comment.sentiment.is_some() {
        pulse_db::complete_job(&ctx.pool, job.id).await?;
        return Ok(());
    }

    let platform = stored_platform(&comment)?;
    let (classification, tokens) =
        pulse_ai::classify_comment(&ctx.chat, &comment.message, platform).await;

    pulse_db::set_classification(&ctx.pool, comment.id, classification).await?;
    pulse_db::complete_job(&ctx.pool, job.id).await?;

    // The neutral fallback after a failed call consumed nothing; the fallback
    // after an unparseable answer still did.
    if tokens > 0 {
        meter(ctx, job.tenant_id, "classification", tokens, None).await;
    }
    Ok(())
}

async fn run_suggestion(ctx: &WorkerContext, job: &JobRow) -> Result<(), JobError> {
    let comment = pulse_db::get_comment(&ctx.pool, job.comment_id).await?;
    let tenant = pulse_db::get_tenant(&ctx.pool, job.tenant_id).await?;
    let platform = stored_platform(&comment)?;
    let persona = tenant.persona();

    // Retrieval needs the query vector; when the embedding job has not run
    // yet, compute it here and meter it here. The embedding job then takes
    // its skip path and meters nothing.
    let mut inline_embed_tokens = 0i64;
    let query = match comment.embedding.clone() {
        Some(vector) => vector,
        None => {
            let raw = ctx.embeddings.embed_text(&comment.message).await?;
            let vector = Vector::from(raw);
            pulse_db::set_embedding(&ctx.pool, comment.id, &vector).await?;
            inline_embed_tokens = pulse_ai::estimate_tokens(&comment.message);
            vector
        }
    };

    let similar = pulse_db::find_similar(
        &ctx.pool,
        comment.tenant_id,
        &query,
        comment.id,
        EXAMPLE_LIMIT,
        MAX_DISTANCE,
    )
    .await?;
    let examples: Vec<ReplyExample> = similar
        .iter()
        .map(|row| ReplyExample {
            comment_message: row.comment_message.clone(),
            platform: row.platform.clone(),
            reply_message: row.reply_message.clone(),
            replier_name: row.replier_name.clone(),
            similarity: row.similarity(),
        })
        .collect();

    let author = author_display_name(&comment.author);
    let num_suggestions = job
        .payload
        .get("num_suggestions")
        .and_then(Value::as_u64)
        .map_or(ctx.config.suggestion_count, |n| n as usize);

    let prompt = pulse_ai::compose_suggestion_prompt(
        &comment.message,
        platform,
        &author,
        &persona,
        &examples,
        num_suggestions,
    );
    let completion = ctx
        .chat
        .complete(&prompt.messages(), pulse_ai::SUGGESTION_TEMPERATURE)
        .await?;
    let parsed = pulse_ai::parse_suggestions(&completion.content)?;

    let batch: Vec<NewSuggestion> = parsed
        .suggestions
        .into_iter()
        .map(|c| NewSuggestion {
            text: c.text,
            score: c.score,
        })
        .collect();
    let stored =
        pulse_db::insert_suggestions(&ctx.pool, comment.id, &batch, ctx.chat.model()).await?;
    pulse_db::complete_job(&ctx.pool, job.id).await?;

    let cost = pulse_ai::completion_cost(
        ctx.chat.model(),
        completion.prompt_tokens,
        completion.completion_tokens,
    );
    meter(
        ctx,
        job.tenant_id,
        "generation",
        completion.total_tokens(),
        Some(cost),
    )
    .await;
    if inline_embed_tokens > 0 {
        meter(ctx, job.tenant_id, "embedding", inline_embed_tokens, None).await;
    }

    tracing::info!(
        comment_id = %comment.id,
        count = stored.len(),
        examples = examples.len(),
        "stored suggestion batch"
    );
    Ok(())
}

async fn run_reply_submission(ctx: &WorkerContext, job: &JobRow) -> Result<(), JobError> {
    let message = job
        .payload
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| JobError::terminal("reply_submission payload has no message"))?
        .to_string();
    let author_name = job
        .payload
        .get("author_name")
        .and_then(Value::as_str)
        .map(String::from);

    let comment = pulse_db::get_comment(&ctx.pool, job.comment_id).await?;
    let platform = stored_platform(&comment)?;

    let connection = pulse_db::get_connected(&ctx.pool, job.tenant_id, platform.as_str())
        .await?
        .ok_or_else(|| {
            JobError::terminal(format!("tenant has no connected {platform} account"))
        })?;

    let posted = ctx
        .connectors
        .post_reply(
            platform,
            &comment.external_id,
            &message,
            &connection.access_token,
        )
        .await?;

    let reply = pulse_db::insert_reply(&ctx.pool, comment.id, &message, author_name.as_deref())
        .await?;
    pulse_db::complete_job(&ctx.pool, job.id).await?;

    // Count-only ledger row: reply submission is quota-relevant activity even
    // though no tokens are consumed.
    meter(ctx, job.tenant_id, "reply_processing", 0, None).await;

    tracing::info!(
        comment_id = %comment.id,
        reply_id = %reply.id,
        external_reply_id = ?posted.external_reply_id,
        platform = platform.as_str(),
        "reply submitted"
    );
    Ok(())
}
