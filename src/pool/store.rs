//! Durable inventory of encrypted spare keypairs.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{FromRow, Pool, Sqlite};
use tracing::info;
use uuid::fmt::Hyphenated;
use uuid::Uuid;

use crate::matcher::SuffixTarget;

pub type DbPool = Pool<Sqlite>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, sqlx::Error>;

/// A donated keypair at rest. Never updated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PooledEntry {
    pub id: Uuid,
    pub suffix: String,
    pub public_identifier: String,
    pub encrypted_secret: String,
    pub created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct PooledRow {
    id: Hyphenated,
    suffix: String,
    public_identifier: String,
    encrypted_secret: String,
    created_at: i64,
}

impl From<PooledRow> for PooledEntry {
    fn from(row: PooledRow) -> Self {
        Self {
            id: row.id.into_uuid(),
            suffix: row.suffix,
            public_identifier: row.public_identifier,
            encrypted_secret: row.encrypted_secret,
            created_at: DateTime::from_timestamp_micros(row.created_at).unwrap_or_default(),
        }
    }
}

/// Storage backend for the vanity pool.
///
/// `take_oldest` must be atomic at the storage layer: two callers racing for
/// the same suffix never both receive the same entry, and never both come
/// back empty while an entry exists.
#[async_trait]
pub trait PoolStore: Send + Sync {
    /// Appends a new entry and returns its id.
    async fn insert(
        &self,
        suffix: &SuffixTarget,
        public_identifier: &str,
        encrypted_secret: &str,
    ) -> StoreResult<Uuid>;

    /// Removes and returns the oldest entry for `suffix`, if any.
    async fn take_oldest(&self, suffix: &SuffixTarget) -> StoreResult<Option<PooledEntry>>;

    /// Returns the number of entries waiting for `suffix`.
    async fn count(&self, suffix: &SuffixTarget) -> StoreResult<u64>;
}

/// SQLite-backed pool store.
#[derive(Debug, Clone)]
pub struct SqlitePoolStore {
    pool: DbPool,
}

impl SqlitePoolStore {
    /// Opens (creating if needed) the database at `url` and ensures the schema exists.
    ///
    /// In-memory databases are limited to one connection, since each SQLite
    /// connection would otherwise see its own empty database.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { max_connections.max(1) })
            .connect_with(options)
            .await?;
        info!(url, "pool database connected");

        Self::from_pool(pool).await
    }

    /// Opens a private in-memory store.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    /// Wraps an existing connection pool, ensuring the schema exists.
    pub async fn from_pool(pool: DbPool) -> StoreResult<Self> {
        init_db(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns the underlying connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl PoolStore for SqlitePoolStore {
    async fn insert(
        &self,
        suffix: &SuffixTarget,
        public_identifier: &str,
        encrypted_secret: &str,
    ) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO vanity_pool (id, suffix, public_identifier, encrypted_secret, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.hyphenated())
        .bind(suffix.as_str())
        .bind(public_identifier)
        .bind(encrypted_secret)
        .bind(Utc::now().timestamp_micros())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn take_oldest(&self, suffix: &SuffixTarget) -> StoreResult<Option<PooledEntry>> {
        // A single statement: SQLite holds the write lock from the subquery
        // through the delete, so concurrent takers serialize on it.
        let row = sqlx::query_as::<_, PooledRow>(
            r#"
            DELETE FROM vanity_pool
            WHERE id = (
                SELECT id FROM vanity_pool
                WHERE suffix = ?
                ORDER BY created_at ASC, rowid ASC
                LIMIT 1
            )
            RETURNING id, suffix, public_identifier, encrypted_secret, created_at
            "#,
        )
        .bind(suffix.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn count(&self, suffix: &SuffixTarget) -> StoreResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vanity_pool WHERE suffix = ?")
            .bind(suffix.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

/// Creates the pool schema if missing.
pub async fn init_db(pool: &DbPool) -> StoreResult<()> {
    info!("Ensuring vanity pool schema");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vanity_pool (
            id TEXT PRIMARY KEY NOT NULL,
            suffix TEXT NOT NULL,
            public_identifier TEXT NOT NULL,
            encrypted_secret TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_vanity_pool_suffix_created ON vanity_pool(suffix, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
