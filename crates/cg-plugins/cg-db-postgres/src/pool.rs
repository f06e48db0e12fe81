//! Pool bootstrap: wait for the database to accept connections, then migrate.

use std::time::{Duration, Instant};

use anyhow::Context;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};

const RETRY_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub max_connections: u32,
    /// How long to keep retrying before giving up on startup.
    pub wait_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            wait_timeout: Duration::from_secs(10),
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Connects to `database_url`, retrying every second until `wait_timeout`
/// has elapsed.
pub async fn connect(database_url: &str, options: &ConnectOptions) -> anyhow::Result<PgPool> {
    let deadline = Instant::now() + options.wait_timeout;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let result = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(database_url)
            .await;

        match result {
            Ok(pool) => {
                info!(attempt, "connected to postgres");
                return Ok(pool);
            }
            Err(err) if Instant::now() + RETRY_INTERVAL < deadline => {
                warn!(attempt, error = %err, "waiting for database to become available");
                tokio::time::sleep(RETRY_INTERVAL).await;
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("timed out waiting for database after {attempt} attempts")
                });
            }
        }
    }
}

/// Applies the embedded schema migrations.
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!()
        .run(pool)
        .await
        .context("failed to apply migrations")?;
    info!("migrations applied");
    Ok(())
}
