use std::process::ExitCode;
use std::sync::Arc;

use agile_server::services::{seed, AssetService, AuditService, DatasyncService};
use agile_server::{config::Config, db};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agile")]
#[command(version = env!("APP_VERSION"))]
#[command(about = "IT asset lending server", long_about = None)]
struct Cli {
    /// Host to bind to (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Database url (overrides DATABASE_URL)
    #[arg(short, long)]
    database: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Migrate, seed and run the HTTP server
    Serve,
    /// Apply pending migrations
    Migrate,
    /// Drop every table, migrate again and seed
    Reset,
    /// Run one ERP sync in the foreground
    Sync,
    /// Move available assets with an open lending to "in use"
    FixStatus,
}

/// `RUST_LOG` wins; otherwise `DEBUG=true` selects debug level.
fn init_tracing() {
    let debug = std::env::var("DEBUG")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn open_pool(config: &Config) -> anyhow::Result<SqlitePool> {
    db::create_pool(&config.database_url, config.max_connections)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))
}

async fn migrate(config: &Config) -> anyhow::Result<()> {
    let pool = open_pool(config).await?;
    db::run_migrations(&pool)
        .await
        .context("Failed to apply migrations")?;
    pool.close().await;
    Ok(())
}

async fn reset(config: &Config) -> anyhow::Result<()> {
    let pool = open_pool(config).await?;
    db::reset(&pool).await.context("Failed to reset database")?;
    seed::run(&pool, &config.super_user_password).await;
    pool.close().await;
    Ok(())
}

async fn sync(config: &Config) -> anyhow::Result<()> {
    let pool = open_pool(config).await?;
    db::run_migrations(&pool).await?;

    let Some(source) = agile_server::connect_totvs(config).await else {
        bail!("No ERP database available, set TOTVS_DATABASE_URL");
    };
    let report = DatasyncService::new(pool.clone(), source).run().await?;
    pool.close().await;

    for (kind, count) in &report.synced {
        println!("{}: {} changed", kind, count);
    }
    if !report.is_success() {
        bail!("Sync failed for {:?}", report.failed);
    }
    Ok(())
}

async fn fix_status(config: &Config) -> anyhow::Result<()> {
    let pool = open_pool(config).await?;
    db::run_migrations(&pool).await?;

    let audit = Arc::new(AuditService::new(pool.clone()));
    let fixed = AssetService::new(pool.clone(), audit)
        .fix_status()
        .await
        .context("Failed to fix asset statuses")?;
    pool.close().await;

    println!("{} assets fixed", fixed);
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    init_tracing();

    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(database) = cli.database {
        config.database_url = database;
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            tracing::info!("agile {}", env!("APP_VERSION"));
            agile_server::run_server(config)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))
        }
        Command::Migrate => match migrate(&config).await {
            Ok(()) => {
                println!("Migrations applied successfully");
                Ok(())
            }
            Err(e) => {
                println!("Migrations failed");
                Err(e)
            }
        },
        Command::Reset => reset(&config).await,
        Command::Sync => sync(&config).await,
        Command::FixStatus => fix_status(&config).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
