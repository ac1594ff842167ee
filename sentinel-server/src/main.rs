use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use sentinel_config::{Config, ConfigLoad, ConfigLoader, StoreBackend};
use sentinel_core::{
    database::{
        HazardEventRepository, InMemoryHazardEventRepository, PoolSettings, PostgresDatabase,
    },
    feeds::HttpTransport,
    sync::{SyncPipeline, SyncScheduler},
};
use sentinel_server::{AppState, DEFAULT_LOG_FILTER, create_app};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "sentinel-server")]
#[command(about = "Keeps the active hazard collection in step with upstream disaster feeds")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct GlobalArgs {
    /// Path to sentinel.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env when present)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, global = true)]
    host: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the scheduler and HTTP API (default)
    Serve,
    /// Run a single sync and print its report as JSON
    SyncOnce,
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_runtime_config(&cli.global)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
        Command::SyncOnce => run_sync_once(config).await,
        Command::Db(DbCommand::Migrate) => run_db_migrate(&config).await,
    }
}

fn load_runtime_config(args: &GlobalArgs) -> anyhow::Result<Config> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = &args.env_file {
        loader = loader.with_env_file(path);
    }
    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }

    tracing_subscriber::registry()
        .with(
            // Override via RUST_LOG.
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "configuration file loaded");
    }

    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }

    Ok(config)
}

async fn connect_postgres(config: &Config) -> anyhow::Result<PostgresDatabase> {
    let url = config
        .store
        .database_url
        .as_deref()
        .context("DATABASE_URL is not set")?;
    let settings = PoolSettings {
        max_connections: config.store.max_connections,
        ..PoolSettings::default()
    };
    PostgresDatabase::connect(url, settings)
        .await
        .context("failed to connect to PostgreSQL")
}

async fn build_repository(config: &Config) -> anyhow::Result<Arc<dyn HazardEventRepository>> {
    match config.store.backend {
        StoreBackend::Postgres => {
            let db = connect_postgres(config).await?;
            db.migrate().await.context("database migration failed")?;
            Ok(Arc::new(db.hazard_events()))
        }
        StoreBackend::Memory => Ok(Arc::new(InMemoryHazardEventRepository::new())),
    }
}

fn build_pipeline(
    config: &Config,
    repository: Arc<dyn HazardEventRepository>,
) -> anyhow::Result<Arc<SyncPipeline>> {
    let transport = HttpTransport::new(&config.sync.user_agent)
        .context("failed to build HTTP transport")?;

    for source in config.enabled_sources() {
        info!(
            source = %source.source,
            url = %source.url,
            relaxed_tls = source.relaxed_tls,
            "feed enabled"
        );
    }

    Ok(Arc::new(SyncPipeline::new(
        Arc::new(transport),
        repository,
        config.sources.clone(),
        config.sync.clone(),
    )))
}

async fn run_db_migrate(config: &Config) -> anyhow::Result<()> {
    let db = connect_postgres(config).await?;
    db.migrate().await.context("database migration failed")?;
    info!("Database migrations applied successfully");
    Ok(())
}

async fn run_sync_once(config: Config) -> anyhow::Result<()> {
    let repository = build_repository(&config).await?;
    let pipeline = build_pipeline(&config, repository)?;
    let report = pipeline.run_once().await;
    info!(outcome = %report.outcome, "sync run finished");
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.outcome.is_completed() {
        anyhow::bail!("sync run did not complete: {}", report.outcome);
    }
    Ok(())
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let repository = build_repository(&config).await?;
    let pipeline = build_pipeline(&config, Arc::clone(&repository))?;

    let shutdown = CancellationToken::new();
    let scheduler = SyncScheduler::new(Arc::clone(&pipeline));
    let state = AppState::new(repository, scheduler.handle());
    let scheduler_task = scheduler.spawn(shutdown.clone());

    let app = create_app(state);
    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Starting Sentinel on {addr}");

    let signal_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("failed to listen for ctrl-c; shutting down");
            }
            info!("shutdown requested");
            signal_token.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(err) = scheduler_task.await {
        warn!(error = %err, "scheduler task ended abnormally");
    }
    info!("Sentinel stopped");
    Ok(())
}
