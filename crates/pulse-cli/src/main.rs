mod db;
mod queue;
mod usage;


use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "pulse-cli")]
#[command(about = "PulsePilot operations command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database utilities
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Inspect and maintain the background job queue
    Jobs {
        #[command(subcommand)]
        command: JobsCommands,
    },
    /// Webhook dedup ledger maintenance
    Ledger {
        #[command(subcommand)]
        command: LedgerCommands,
    },
    /// Tenant usage and quota reporting
    Usage {
        #[command(subcommand)]
        command: UsageCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Run pending migrations
    Migrate,
    /// Upsert the pricing and tenant seed files into the database
    Seed,
}

#[derive(Debug, Subcommand)]
enum JobsCommands {
    /// List recent jobs
    List {
        /// Filter by status (queued, running, succeeded, failed)
        #[arg(long)]
        status: Option<String>,
        /// Maximum number of jobs to show
        #[arg(long, default_value = "50")]
        limit: i64,
    },
    /// Return jobs stuck in running to the queue
    RequeueStale {
        /// Visibility timeout in seconds (defaults to the configured value)
        #[arg(long)]
        timeout_secs: Option<i64>,
    },
}

#[derive(Debug, Subcommand)]
enum LedgerCommands {
    /// Delete dedup ledger entries older than the window
    Sweep {
        /// Retention window in hours (defaults to the configured value)
        #[arg(long)]
        window_hours: Option<i64>,
    },
}

#[derive(Debug, Subcommand)]
enum UsageCommands {
    /// Current-month usage and quota standing for one tenant
    Report {
        /// Tenant slug
        #[arg(long)]
        tenant: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("pulse-cli: no command given, try --help");
        return Ok(());
    };

    let config = pulse_core::load_app_config()?;
    let pool_config = pulse_db::PoolConfig::from_app_config(&config);
    let pool = pulse_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => db::run_db_ping(&pool).await,
            DbCommands::Migrate => db::run_db_migrate(&pool).await,
            DbCommands::Seed => db::run_db_seed(&pool, &config).await,
        },
        Commands::Jobs { command } => match command {
            JobsCommands::List { status, limit } => {
                queue::run_jobs_list(&pool, status.as_deref(), limit).await
            }
            JobsCommands::RequeueStale { timeout_secs } => {
                queue::run_jobs_requeue_stale(
                    &pool,
                    timeout_secs.unwrap_or(config.job_visibility_timeout_secs),
                )
                .await
            }
        },
        Commands::Ledger { command } => match command {
            LedgerCommands::Sweep { window_hours } => {
                queue::run_ledger_sweep(&pool, window_hours.unwrap_or(config.dedup_window_hours))
                    .await
            }
        },
        Commands::Usage { command } => match command {
            UsageCommands::Report { tenant } => usage::run_usage_report(&pool, &tenant).await,
        },
    }
}
