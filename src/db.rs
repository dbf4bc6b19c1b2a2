use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::auth::error::StoreError;
use crate::config::DbConfig;

/// Opens the SQLite pool and applies pending migrations.
pub async fn connect(config: &DbConfig) -> anyhow::Result<SqlitePool> {
    let in_memory = config.url.contains(":memory:");
    let opts = SqliteConnectOptions::from_str(&config.url)
        .with_context(|| format!("parse DATABASE_URL {}", config.url))?
        .create_if_missing(true)
        .journal_mode(if in_memory {
            SqliteJournalMode::Memory
        } else {
            SqliteJournalMode::Wal
        });

    // every connection to ":memory:" is its own database, so keep exactly one
    let (max, min) = if in_memory {
        (1, 1)
    } else {
        (config.max_connections, 0)
    };

    let db = SqlitePoolOptions::new()
        .max_connections(max)
        .min_connections(min)
        .idle_timeout(if in_memory { None } else { Some(Duration::from_secs(600)) })
        .max_lifetime(if in_memory { None } else { Some(Duration::from_secs(1800)) })
        .connect_with(opts)
        .await
        .context("connect to database")?;
    info!(url = %config.url, max_connections = max, "sqlite pool opened");

    migrate(&db).await.context("run migrations")?;
    Ok(db)
}

pub async fn migrate(db: &SqlitePool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(db).await?;
    info!("database migrations applied");
    Ok(())
}

/// Fresh migrated in-memory database, used by tests.
pub async fn in_memory() -> Result<SqlitePool, StoreError> {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect_with(opts)
        .await?;
    migrate(&db).await?;
    Ok(db)
}
