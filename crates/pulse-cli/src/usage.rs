//! Tenant usage reporting commands.

use chrono::Utc;

/// Print the current-month usage and quota standing for one tenant.
///
/// A tenant without an active subscription has no quota, but its metered
/// usage is still shown.
///
/// # Errors
///
/// Returns an error if the tenant does not exist or a query fails.
pub(crate) async fn run_usage_report(pool: &sqlx::PgPool, slug: &str) -> anyhow::Result<()> {
    let tenant = pulse_db::get_tenant_by_slug(pool, slug)
        .await?
        .ok_or_else(|| anyhow::anyhow!("tenant '{slug}' not found; run `db seed` first"))?;

    let report = pulse_db::quota_report(pool, tenant.id).await?;
    // The quota report is all zeros without a subscription; the breakdown is
    // still worth showing, so fetch it directly in that case.
    let breakdown = if report.has_quota {
        report.breakdown.clone()
    } else {
        pulse_db::month_usage_breakdown(pool, tenant.id).await?
    };

    let now = Utc::now().format("%Y-%m-%d %H:%M UTC");
    println!("Usage report for {} ({slug})", tenant.name);
    println!("Generated: {now}");
    println!();

    if report.has_quota {
        let plan = report.plan.as_deref().unwrap_or("-");
        println!("Plan: {plan}");
        println!(
            "Tokens: {} used / {} quota ({} remaining)",
            report.tokens_used, report.quota_limit, report.tokens_remaining
        );
        if report.quota_exceeded {
            println!("QUOTA EXCEEDED");
        }
    } else {
        let tokens_used: i64 = breakdown.iter().map(|b| b.tokens).sum();
        println!("No active subscription; usage is tracked but not capped.");
        println!("Tokens: {tokens_used} used this month");
    }

    if breakdown.is_empty() {
        println!();
        println!("no usage recorded this month");
        return Ok(());
    }

    println!();
    let header = format!(
        "{:<18}{:>12}{:>8}{:>14}",
        "OPERATION", "TOKENS", "RUNS", "COST"
    );
    println!("{header}");
    for entry in &breakdown {
        println!(
            "{:<18}{:>12}{:>8}{:>14}",
            entry.usage_type,
            entry.tokens,
            entry.count,
            format!("${}", entry.cost)
        );
    }

    Ok(())
}
