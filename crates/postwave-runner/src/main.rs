use std::sync::{Arc, Mutex};

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use postwave_channels::WebhookChannel;
use postwave_content::{ContentResolver, SqliteContentStore};
use postwave_core::config::PostwaveConfig;
use postwave_engine::{Assembler, Engine};
use postwave_media::{HttpObjectStore, ObjectStore, SwitchboardCompositor};
use postwave_queue::SqliteQueueStore;
use postwave_registry::Registry;

#[derive(Parser)]
#[command(name = "postwave", about = "Scheduled social-post execution engine")]
struct Cli {
    /// Path to postwave.toml (falls back to POSTWAVE_CONFIG, then
    /// ~/.postwave/postwave.toml).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and run all schema migrations.
    Init,
    /// Execute one pass over the schedule queue.
    Run,
    /// Execute passes on a fixed interval until interrupted.
    Watch {
        #[arg(long, default_value_t = 300)]
        interval_secs: u64,
    },
    /// Add a row to the schedule queue.
    Schedule {
        /// Due time, RFC 3339 (e.g. 2026-09-01T09:00:00Z).
        #[arg(long)]
        at: String,
        /// Key cell, e.g. "latest(days=3), manual(key=promo)".
        #[arg(long)]
        keys: String,
    },
    /// Delete hosted images older than the given age.
    Cleanup {
        #[arg(long, default_value_t = 48)]
        max_age_hours: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postwave=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = PostwaveConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Init => init(&config),
        Command::Run => {
            let engine = build_engine(&config)?;
            let report = engine.run(Utc::now()).await?;
            info!(
                processed = report.rows_processed,
                pending = report.rows_pending,
                failed = report.rows_failed,
                "pass complete"
            );
            Ok(())
        }
        Command::Watch { interval_secs } => watch(&config, interval_secs).await,
        Command::Schedule { at, keys } => schedule(&config, &at, &keys),
        Command::Cleanup { max_age_hours } => cleanup(&config, max_age_hours).await,
    }
}

fn init(config: &PostwaveConfig) -> anyhow::Result<()> {
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    postwave_catalog::db::init_db(&db)?;
    postwave_content::db::init_db(&db)?;
    postwave_queue::db::init_db(&db)?;
    info!("database migrations complete");
    Ok(())
}

fn build_engine(config: &PostwaveConfig) -> anyhow::Result<Engine> {
    init(config)?;
    let db_path = &config.database.path;

    // Each subsystem gets its own connection for thread safety.
    let catalog = Arc::new(postwave_catalog::SqliteCatalog::new(
        rusqlite::Connection::open(db_path)?,
    )?);
    let content_store = Arc::new(SqliteContentStore::new(rusqlite::Connection::open(
        db_path,
    )?)?);
    let queue = Arc::new(SqliteQueueStore::new(Arc::new(Mutex::new(
        rusqlite::Connection::open(db_path)?,
    ))));

    let storage: Option<Arc<dyn ObjectStore>> = match &config.storage {
        Some(cfg) => Some(Arc::new(HttpObjectStore::new(cfg.clone())?)),
        None => None,
    };
    let compositor = Arc::new(SwitchboardCompositor::new(
        config.compositor.clone(),
        storage,
    )?);
    let channel = Arc::new(WebhookChannel::new(config.webhooks.clone())?);

    let assembler = Assembler::new(
        compositor,
        content_store.clone(),
        config.compositor.clone(),
        config.posting.clone(),
    );

    Ok(Engine::new(
        catalog,
        queue,
        Registry::with_builtins(),
        ContentResolver::new(content_store),
        assembler,
        channel,
        config.webhooks.send_single,
    ))
}

async fn watch(config: &PostwaveConfig, interval_secs: u64) -> anyhow::Result<()> {
    let engine = build_engine(config)?;
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
    info!(interval_secs, "watch started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match engine.run(Utc::now()).await {
                    Ok(report) => info!(
                        processed = report.rows_processed,
                        failed = report.rows_failed,
                        "pass complete"
                    ),
                    Err(e) => warn!(error = %e, "pass failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
        }
    }
}

fn schedule(config: &PostwaveConfig, at: &str, keys: &str) -> anyhow::Result<()> {
    if postwave_engine::parse_due(at).is_none() {
        anyhow::bail!("unparseable due time `{at}`");
    }
    init(config)?;
    let queue = SqliteQueueStore::new(Arc::new(Mutex::new(rusqlite::Connection::open(
        &config.database.path,
    )?)));
    let id = queue.insert(at, keys)?;
    info!(row = id, at, keys, "scheduled");
    Ok(())
}

async fn cleanup(config: &PostwaveConfig, max_age_hours: u32) -> anyhow::Result<()> {
    let Some(storage_cfg) = &config.storage else {
        anyhow::bail!("no [storage] section configured");
    };
    let storage = HttpObjectStore::new(storage_cfg.clone())?;
    let deleted = storage.cleanup_older_than(max_age_hours).await?;
    info!(deleted, max_age_hours, "cleanup complete");
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
}
