//! # Red Sky Server
//!
//! Crisis coordination for community resource sharing: per-community
//! blue/red mode driven by member votes, an emergency ticket triage queue
//! that opens only in red mode, and a federation directory through which
//! platform admins relay Red Sky alerts to peer instances.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use redsky_core::{
    application::unit_of_work::AppUnitOfWork, database::PostgresDatabase,
    federation::ReqwestPeerClient,
};
use redsky_server::infra::{
    app_state::AppState,
    config::{Config, ConfigLoad, ConfigLoader},
    startup::{create_app, init_tracing, log_config_warnings, shutdown_signal},
};
use tracing::info;

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "redsky-server")]
#[command(about = "Crisis coordination and federated Red Sky alerts for community hubs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Path to a TOML config file
    #[arg(long, env = "REDSKY_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
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
    let config = load_runtime_config(&cli.serve)?;

    match cli.command {
        Some(Command::Db(DbCommand::Migrate)) => run_db_migrate(&config).await,
        None => run_server(config).await,
    }
}

fn load_runtime_config(args: &ServeArgs) -> anyhow::Result<Arc<Config>> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::new().with_config_path(path),
        None => ConfigLoader::new(),
    };
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

    init_tracing();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "configuration file loaded");
    }
    log_config_warnings(&warnings);

    info!(
        crisis.threshold_pct = config.crisis.threshold_pct,
        crisis.departed_voters = %config.crisis.departed_voters,
        federation.instance_url = %config.federation.instance.url,
        federation.peer_timeout_ms = config.federation.peer_timeout.as_millis() as u64,
        federation.fan_out = config.federation.fan_out_parallelism,
        federation.trust = %config.federation.trust,
        "configuration in effect"
    );

    Ok(Arc::new(config))
}

async fn connect_database(config: &Config) -> anyhow::Result<PostgresDatabase> {
    let database_url = config
        .database
        .primary_url
        .as_deref()
        .context("DATABASE_URL must be set")?;
    let db = PostgresDatabase::new(database_url)
        .await
        .context("failed to connect to PostgreSQL")?;
    let stats = db.pool_stats();
    info!(
        pool.max = stats.max_size,
        pool.min = stats.min_idle,
        "database pool ready"
    );
    Ok(db)
}

async fn run_db_migrate(config: &Config) -> anyhow::Result<()> {
    let db = connect_database(config).await?;
    db.initialize_schema()
        .await
        .context("database migration failed")?;
    info!("Database migrations applied successfully");
    Ok(())
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    let db = connect_database(&config).await?;
    db.initialize_schema()
        .await
        .context("database migration failed")?;

    let unit_of_work = Arc::new(AppUnitOfWork::from_postgres(&db));
    let peers = Arc::new(
        ReqwestPeerClient::new(config.federation.peer_timeout)
            .context("failed to build peer HTTP client")?,
    );
    let state = AppState::new(Arc::clone(&config), unit_of_work, peers)?;
    let router = create_app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;
    info!(
        "Starting Red Sky server on {}:{}",
        config.server.host, config.server.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}
