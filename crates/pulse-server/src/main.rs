mod api;
mod connector;
mod ingest;
mod middleware;
mod scheduler;
mod worker;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(pulse_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pulse_db::PoolConfig::from_app_config(&config);
    let pool = pulse_db::connect_pool(&config.database_url, pool_config).await?;
    pulse_db::run_migrations(&pool).await?;

    seed_from_config(&pool, &config).await?;

    let workers = worker::spawn_workers(pool.clone(), Arc::clone(&config))?;
    let _scheduler = scheduler::build_scheduler(pool.clone(), Arc::clone(&config)).await?;

    let auth = AuthState::from_env(matches!(config.env, pulse_core::Environment::Development))?;
    let app = build_app(
        AppState {
            pool,
            config: Arc::clone(&config),
        },
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Workers are idempotent mid-step and the stale-job reaper requeues
    // anything caught running, so aborting here is safe.
    for handle in workers {
        handle.abort();
    }
    Ok(())
}

/// Upsert the pricing and tenant seed files into the database.
///
/// Runs on every boot; both seeds are idempotent upserts, so a restart
/// refreshes prices and personas without duplicating rows.
async fn seed_from_config(
    pool: &sqlx::PgPool,
    config: &pulse_core::AppConfig,
) -> anyhow::Result<()> {
    let pricing = pulse_core::load_pricing(&config.pricing_path)?;
    let rows = pulse_db::seed_pricing(pool, &pricing.pricing).await?;
    tracing::info!(rows, path = %config.pricing_path.display(), "seeded pricing table");

    let tenants = pulse_core::load_tenants(&config.tenants_path)?;
    let rows = pulse_db::seed_tenants(pool, &tenants.tenants).await?;
    tracing::info!(rows, path = %config.tenants_path.display(), "seeded tenants");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
