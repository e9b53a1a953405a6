//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite, plus the two ways
//! in: a write transaction ([`UnitOfWork`]) and a plain read [`Session`].
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  DbConfig::new(path) ← Configure pool settings                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations             │
//! │       │                                                                 │
//! │       ├── begin()   → UnitOfWork   BEGIN IMMEDIATE … COMMIT             │
//! │       │                            (takes the write lock up front)      │
//! │       │                                                                 │
//! │       └── session() → Session      plain pooled connection (reads)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Serialization
//! SQLite allows one writer at a time. Opening every write transaction with
//! `BEGIN IMMEDIATE` makes a competing writer wait at `begin()` (up to the
//! busy timeout) instead of failing mid-transaction on lock upgrade, and
//! guarantees it then reads the state the previous writer committed.
//!
//! ## WAL Mode
//! WAL keeps readers from blocking the writer and vice versa.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::unit_of_work::{Session, UnitOfWork};

// =============================================================================
// Configuration
// =============================================================================

/// Pool and connection settings.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/mercato/mercato.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,

    /// Default: 5
    pub max_connections: u32,

    /// How long `begin()` / `session()` wait for a free pooled connection.
    pub acquire_timeout: Duration,

    /// How long a writer waits for the SQLite lock before failing with `Busy`.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Apply embedded migrations on connect. Default: true
    pub migrate: bool,
}

impl DbConfig {
    /// File-backed database, created if missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            migrate: true,
        }
    }

    /// Private in-memory database, gone when the pool drops.
    ///
    /// Every connection to `:memory:` is its own database, so the pool is
    /// pinned to one connection. Never hold a [`Session`] while opening a
    /// [`UnitOfWork`] on it.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(":memory:")
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn without_migrations(mut self) -> Self {
        self.migrate = false;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle. Cheap to clone (the pool is reference-counted).
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, migrates the schema.
    ///
    /// Every connection gets WAL journaling, NORMAL sync, foreign keys and
    /// the configured busy timeout.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let connect_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
        } else {
            SqliteConnectOptions::from_str(&format!(
                "sqlite://{}",
                config.database_path.display()
            ))
        }
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout)
        .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max_connections = config.max_connections,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Pool ready"
        );

        let db = Database { pool };
        if config.migrate {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending embedded migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Returns a reference to the connection pool.
    ///
    /// Prefer [`Database::begin`] and [`Database::session`]; this is for
    /// diagnostics.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens a write transaction with `BEGIN IMMEDIATE`.
    ///
    /// Dropping the returned [`UnitOfWork`] without committing rolls back.
    pub async fn begin(&self) -> DbResult<UnitOfWork> {
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        debug!("Unit of work started");
        Ok(UnitOfWork::new(tx))
    }

    /// Checks out a pooled connection for reads outside a transaction.
    pub async fn session(&self) -> DbResult<Session> {
        let conn = self.pool.acquire().await?;
        Ok(Session::new(conn))
    }

    /// Waits for checked-out connections, then closes the pool.
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }

    /// True when a pooled connection can run a trivial query.
    pub async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
