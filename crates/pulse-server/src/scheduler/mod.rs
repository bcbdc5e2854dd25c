//! Recurring maintenance jobs.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! dedup-ledger sweep and the stale-job reaper.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background maintenance scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<pulse_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_ledger_sweep_job(&scheduler, pool.clone(), Arc::clone(&config)).await?;
    register_stale_job_reaper(&scheduler, pool, config).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the hourly webhook-ledger sweep.
///
/// Runs at the top of every hour (`0 0 * * * *`) and deletes ledger entries
/// older than the dedup window. Expired entries no longer suppress
/// redeliveries, so keeping them only grows the table.
async fn register_ledger_sweep_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<pulse_core::AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);

        Box::pin(async move {
            run_ledger_sweep(&pool, config.dedup_window_hours).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn run_ledger_sweep(pool: &PgPool, window_hours: i64) {
    match pulse_db::sweep_events(pool, window_hours).await {
        Ok(n) if n > 0 => {
            tracing::info!(removed = n, "scheduler: swept expired webhook ledger entries");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(error = %e, "scheduler: webhook ledger sweep failed");
        }
    }
}

/// Register the per-minute stale-job reaper.
///
/// Runs every minute (`0 * * * * *`) and returns jobs stuck in `running`
/// past the visibility timeout to `queued`. A worker that dies mid-job
/// leaves its claim behind; the reaper is what makes that claim expire.
async fn register_stale_job_reaper(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<pulse_core::AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);

        Box::pin(async move {
            run_stale_reaper(&pool, config.job_visibility_timeout_secs).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn run_stale_reaper(pool: &PgPool, visibility_timeout_secs: i64) {
    match pulse_db::requeue_stale_jobs(pool, visibility_timeout_secs).await {
        Ok(n) if n > 0 => {
            tracing::warn!(requeued = n, "scheduler: requeued stale running jobs");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(error = %e, "scheduler: stale job reaper failed");
        }
    }
}
