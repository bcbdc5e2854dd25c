//! Database utility commands.

/// Check database connectivity with a trivial query.
///
/// # Errors
///
/// Returns an error if the database cannot be reached.
pub(crate) async fn run_db_ping(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    pulse_db::ping(pool).await?;
    println!("database reachable");
    Ok(())
}

/// Apply any pending migrations.
///
/// # Errors
///
/// Returns an error if a migration fails.
pub(crate) async fn run_db_migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = pulse_db::run_migrations(pool).await?;
    println!("applied {applied} migrations");
    Ok(())
}

/// Upsert the pricing and tenant seed files into the database.
///
/// Both seeds are idempotent, so re-running refreshes prices and personas
/// without duplicating rows. The server performs the same seeding on boot;
/// this command exists for updating a running deployment without a restart.
///
/// # Errors
///
/// Returns an error if a seed file cannot be read or an upsert fails.
pub(crate) async fn run_db_seed(
    pool: &sqlx::PgPool,
    config: &pulse_core::AppConfig,
) -> anyhow::Result<()> {
    let pricing = pulse_core::load_pricing(&config.pricing_path)?;
    let rows = pulse_db::seed_pricing(pool, &pricing.pricing).await?;
    println!(
        "seeded {rows} pricing rows from {}",
        config.pricing_path.display()
    );

    let tenants = pulse_core::load_tenants(&config.tenants_path)?;
    let rows = pulse_db::seed_tenants(pool, &tenants.tenants).await?;
    println!("seeded {rows} tenants from {}", config.tenants_path.display());

    Ok(())
}
