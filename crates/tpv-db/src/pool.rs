//! # Database Handle
//!
//! Opens the SQLite file, applies the schema and hands out repositories,
//! the cashier ledger and the ticket recorder.
//!
//! ```text
//!   LedgerConfig ──► DbConfig ──► Database::new ──► SqlitePool (WAL)
//!                                       │
//!            ┌──────────────────────────┼───────────────────────────┐
//!            ▼                          ▼                           ▼
//!   closures() tickets()          ledger()  ───┐              recorder()
//!   articles()  (reads)                        └─ one writer lock ─┘
//! ```
//!
//! Reads never wait on the writer lock. WAL keeps them from blocking behind
//! an in-flight ledger transaction, even one from another process.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::ledger::CashierLedger;
use crate::migrations;
use crate::recorder::TicketRecorder;
use crate::repository::article::ArticleRepository;
use crate::repository::cashier_closure::CashierClosureRepository;
use crate::repository::ticket::TicketRepository;

/// Default number of attempts for a version-conditional write.
pub const DEFAULT_CONFLICT_RETRIES: u32 = 3;

// =============================================================================
// Configuration
// =============================================================================

/// Settings for [`Database::new`].
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/tpv.db")
///     .max_connections(5)
///     .conflict_retries(3);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file; `:memory:` for a throwaway database.
    pub database_path: PathBuf,

    /// Pool ceiling (5).
    pub max_connections: u32,

    /// Connections kept warm (1).
    pub min_connections: u32,

    /// How long to wait for a free connection (30s).
    pub connect_timeout: Duration,

    /// Idle connections are dropped after this long (10 min).
    pub idle_timeout: Duration,

    /// Apply embedded migrations on startup (true).
    pub run_migrations: bool,

    /// Attempts per ledger write before giving up on conflicts.
    /// Default: 3
    pub conflict_retries: u32,
}

impl DbConfig {
    /// Defaults for a file-backed database. Missing files are created.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    /// Pool ceiling.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Connections kept warm.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Acquire timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Toggle migrations on startup.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets the number of attempts per ledger write.
    pub fn conflict_retries(mut self, attempts: u32) -> Self {
        self.conflict_retries = attempts;
        self
    }

    /// Private in-memory database, used by tests.
    ///
    /// Every SQLite connection to `:memory:` sees its own database, so the
    /// pool is pinned to a single connection.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            ..DbConfig::new(":memory:")
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository and ledger access.
///
/// Cloning is cheap and clones share the pool and the writer lock, so every
/// ledger and recorder obtained from one handle is serialized against the
/// others.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    writer: Arc<Mutex<()>>,
    conflict_retries: u32,
}

impl Database {
    /// Opens (or creates) the database and brings the schema up to date.
    ///
    /// Connections run in WAL mode with foreign keys enforced and a 5s busy
    /// timeout, so writers from other processes queue instead of failing.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening TPV database");

        if config.conflict_retries == 0 {
            return Err(DbError::Internal(
                "conflict_retries must be at least 1".to_string(),
            ));
        }

        let url = format!("sqlite://{}?mode=rwc", config.database_path.display());
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        debug!(url = %url, "SQLite options ready");

        let pool = SqlitePoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .idle_timeout(Some(config.idle_timeout))
            .acquire_timeout(config.connect_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            conflict_retries = config.conflict_retries,
            "TPV database pool ready"
        );

        let db = Database {
            pool,
            writer: Arc::new(Mutex::new(())),
            conflict_retries: config.conflict_retries,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Already-applied ones are skipped.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Underlying pool, for ad-hoc queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the cashier closure repository (no locking, no retries).
    pub fn closures(&self) -> CashierClosureRepository {
        CashierClosureRepository::new(self.pool.clone())
    }

    /// Returns the ticket repository.
    pub fn tickets(&self) -> TicketRepository {
        TicketRepository::new(self.pool.clone())
    }

    /// Returns the article repository.
    pub fn articles(&self) -> ArticleRepository {
        ArticleRepository::new(self.pool.clone())
    }

    /// Returns the cashier ledger bound to this handle's writer lock.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let closure = db.ledger().open().await?;
    /// let state = db.ledger().read_state().await?;
    /// ```
    pub fn ledger(&self) -> CashierLedger {
        CashierLedger::new(self.pool.clone(), self.writer.clone(), self.conflict_retries)
    }

    /// Returns the ticket recorder bound to this handle's writer lock.
    pub fn recorder(&self) -> TicketRecorder {
        TicketRecorder::new(self.pool.clone(), self.writer.clone(), self.conflict_retries)
    }

    /// Waits for checked-out connections and shuts the pool down.
    pub async fn close(&self) {
        info!("Closing TPV database");
        self.pool.close().await;
    }

    /// `SELECT 1` round trip.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_is_healthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
        assert_eq!(db.closures().count_open().await.unwrap(), 0);
    }

    #[test]
    fn test_builder_overrides_defaults() {
        let config = DbConfig::new("/tmp/tpv.db")
            .max_connections(10)
            .min_connections(2)
            .conflict_retries(7);

        assert_eq!(
            (config.max_connections, config.min_connections, config.conflict_retries),
            (10, 2, 7)
        );
        assert!(config.run_migrations);

        let memory = DbConfig::in_memory();
        assert_eq!(memory.max_connections, 1);
        assert_eq!(memory.conflict_retries, DEFAULT_CONFLICT_RETRIES);
    }

    #[tokio::test]
    async fn test_zero_retries_rejected() {
        let config = DbConfig::in_memory().conflict_retries(0);
        assert!(Database::new(config).await.is_err());
    }
}
