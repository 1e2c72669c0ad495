use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::{str::FromStr, time::Duration};
use tracing::{info, warn};

/// History database settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/predictions.db".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    /// Single-connection in-memory database, used by tests.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_secs: 5,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS predictions (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        city           TEXT    NOT NULL,
        actual_temp    REAL    NOT NULL,
        predicted_temp REAL    NOT NULL,
        error          REAL    NOT NULL,
        model_used     TEXT    NOT NULL,
        humidity       REAL,
        pressure       REAL,
        wind_speed     REAL,
        timestamp      TEXT    NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_predictions_city_timestamp ON predictions (city, timestamp)",
];

/// SQLite pool holding the prediction history
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the pool, create the schema and run a health check.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!(url = %config.url, "initializing history database");

        let pool = Self::connect_with_retry(config, 3).await?;
        Self::migrate(&pool).await?;
        Self::health_check_pool(&pool).await?;

        info!("history database ready");
        Ok(Self { pool })
    }

    async fn connect_with_retry(config: &DatabaseConfig, max_attempts: usize) -> Result<SqlitePool> {
        let mut attempt = 0;
        let mut delay = Duration::from_millis(500);

        loop {
            attempt += 1;
            match Self::try_connect(config).await {
                Ok(pool) => return Ok(pool),
                Err(e) if attempt >= max_attempts => {
                    return Err(e).context(format!(
                        "failed to open history database after {max_attempts} attempts"
                    ));
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, ?delay, "history database connection failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }

    async fn try_connect(config: &DatabaseConfig) -> Result<SqlitePool> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .with_context(|| format!("invalid database url {}", config.url))?
            .create_if_missing(true);

        if !config.is_in_memory() {
            if let Some(dir) = options.get_filename().parent() {
                if !dir.as_os_str().is_empty() {
                    std::fs::create_dir_all(dir)
                        .with_context(|| format!("cannot create {}", dir.display()))?;
                }
            }
        }

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));
        if config.is_in_memory() {
            // Every connection to :memory: is a separate database
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        pool_options
            .connect_with(options)
            .await
            .context("failed to create database pool")
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(pool)
                .await
                .context("failed to create history schema")?;
        }
        Ok(())
    }

    async fn health_check_pool(pool: &SqlitePool) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .context("database health check failed")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        info!("closing history database");
        self.pool.close().await;
    }
}
