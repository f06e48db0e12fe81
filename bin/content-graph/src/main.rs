//! # content-graph Binary
//!
//! The entry point that assembles the repository core from compile-time
//! features and the `STORAGE_TYPE` picked at startup. The chosen engine is
//! held for the lifetime of the process.

use std::sync::Arc;

use anyhow::Context;
use cg_configs::{Settings, StorageKind};
use cg_core::{BroadcastSink, CommentSink, PageRequest, Repository};
use cg_services::ContentService;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Feature-gated imports
#[cfg(feature = "store-memory")]
use cg_store_memory::InMemoryRepository;

#[cfg(feature = "db-postgres")]
use cg_db_postgres::{ConnectOptions, PostgresRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("failed to load settings")?;
    init_tracing(&settings)?;

    // 1. Initialize the storage engine
    let repo = open_repository(&settings).await?;

    // 2. Wire the service layer with a notification sink
    let sink = Arc::new(BroadcastSink::new(settings.notify_capacity));
    let service = ContentService::new(repo, sink);

    if settings.seed_demo {
        seed(&service).await.context("failed to seed demo content")?;
    }

    let page = service.posts(PageRequest::first(10)).await?;
    info!(
        count = page.len(),
        has_next_page = page.page_info.has_next_page,
        "content graph ready"
    );
    println!("{}", serde_json::to_string_pretty(&page)?);

    Ok(())
}

fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .context("invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if settings.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))
}

async fn open_repository(settings: &Settings) -> anyhow::Result<Arc<dyn Repository>> {
    match settings.storage_type {
        StorageKind::InMemory => open_memory(),
        StorageKind::Postgres => open_postgres(settings).await,
    }
}

#[cfg(feature = "store-memory")]
fn open_memory() -> anyhow::Result<Arc<dyn Repository>> {
    info!("using in-memory storage");
    Ok(Arc::new(InMemoryRepository::new()))
}

#[cfg(not(feature = "store-memory"))]
fn open_memory() -> anyhow::Result<Arc<dyn Repository>> {
    anyhow::bail!("STORAGE_TYPE=in_memory but this build lacks the `store-memory` feature")
}

#[cfg(feature = "db-postgres")]
async fn open_postgres(settings: &Settings) -> anyhow::Result<Arc<dyn Repository>> {
    use secrecy::ExposeSecret;

    let url = settings.database_url()?;
    let options = ConnectOptions {
        max_connections: settings.db_max_connections,
        wait_timeout: settings.connect_timeout(),
        ..ConnectOptions::default()
    };

    info!(host = %settings.db_host, port = settings.db_port, "using postgres storage");
    let pool = cg_db_postgres::connect(url.expose_secret(), &options).await?;
    cg_db_postgres::migrate(&pool).await?;

    Ok(Arc::new(PostgresRepository::new(pool)))
}

#[cfg(not(feature = "db-postgres"))]
async fn open_postgres(_settings: &Settings) -> anyhow::Result<Arc<dyn Repository>> {
    anyhow::bail!("STORAGE_TYPE=postgres but this build lacks the `db-postgres` feature")
}

async fn seed<S>(service: &ContentService<dyn Repository, S>) -> anyhow::Result<()>
where
    S: CommentSink + ?Sized,
{
    let post = service
        .create_post("1", "Hello, graph", "The first post.", true)
        .await?;
    let comment = service.create_comment("2", &post.id, "Nice post!").await?;
    service
        .create_reply("1", &post.id, "Thanks!", &comment.id)
        .await?;
    service
        .create_post("1", "Announcements", "Comments are off here.", false)
        .await?;

    info!(post_id = %post.id, "demo content seeded");
    Ok(())
}
