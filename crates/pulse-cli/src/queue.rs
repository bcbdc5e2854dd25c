//! Job queue and webhook ledger maintenance commands.

/// List recent jobs, optionally filtered by status.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_jobs_list(
    pool: &sqlx::PgPool,
    status_filter: Option<&str>,
    limit: i64,
) -> anyhow::Result<()> {
    let jobs = pulse_db::list_jobs(pool, status_filter, limit).await?;

    if jobs.is_empty() {
        println!(
            "no jobs found{}",
            status_filter
                .map(|s| format!(" with status {s}"))
                .unwrap_or_default()
        );
        return Ok(());
    }

    let header = format!(
        "{:<38}{:<24}{:<11}{:<9}{:<16}ERROR",
        "ID", "KIND", "STATUS", "ATTEMPT", "RUN AFTER"
    );
    println!("{header}");
    for job in &jobs {
        let attempt = format!("{}/{}", job.attempts, job.max_attempts);
        let run_after = job.run_after.format("%m-%d %H:%M:%S").to_string();
        let error = job
            .last_error
            .as_deref()
            .map_or_else(|| "-".to_string(), |e| truncate(e, 40));
        println!(
            "{:<38}{:<24}{:<11}{:<9}{:<16}{}",
            job.id, job.kind, job.status, attempt, run_after, error
        );
    }

    Ok(())
}

/// Return jobs stuck in `running` past the visibility timeout to the queue.
///
/// The server's scheduler does this every minute; the command covers
/// deployments where the server is down and the queue needs untangling by
/// hand.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub(crate) async fn run_jobs_requeue_stale(
    pool: &sqlx::PgPool,
    timeout_secs: i64,
) -> anyhow::Result<()> {
    let n = pulse_db::requeue_stale_jobs(pool, timeout_secs).await?;
    println!("requeued {n} stale jobs (visibility timeout {timeout_secs}s)");
    Ok(())
}

/// Delete webhook dedup ledger entries older than the window.
///
/// # Errors
///
/// Returns an error if the database delete fails.
pub(crate) async fn run_ledger_sweep(
    pool: &sqlx::PgPool,
    window_hours: i64,
) -> anyhow::Result<()> {
    let n = pulse_db::sweep_events(pool, window_hours).await?;
    println!("swept {n} ledger entries older than {window_hours}h");
    Ok(())
}

/// Shorten a string for single-line table display.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn truncate_leaves_short_strings_alone() {
        assert_eq!(truncate("connection refused", 40), "connection refused");
    }

    #[test]
    fn truncate_cuts_long_strings_with_ellipsis() {
        let long = "x".repeat(60);
        let cut = truncate(&long, 40);
        assert_eq!(cut.chars().count(), 43);
        assert!(cut.ends_with("..."));
    }
}
