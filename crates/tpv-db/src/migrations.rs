//! # Schema Migrations
//!
//! The SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied by [`Database::new`](crate::Database::new). sqlx keeps a ledger
//! of applied versions in `_sqlx_migrations`; a file whose checksum changed
//! after being applied fails startup, so schema changes always go in a new
//! `NNN_description.sql` file.
//!
//! | File                     | Contents                                        |
//! |--------------------------|-------------------------------------------------|
//! | `001_initial_schema.sql` | closures, cash movements, articles and tickets |

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every embedded migration not yet recorded as applied.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let embedded = MIGRATOR.migrations.len();
    MIGRATOR.run(pool).await?;
    info!(embedded, "Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts. Before the first run the
/// bookkeeping table is missing and `applied` is 0.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let embedded = MIGRATOR.migrations.len();
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);
    Ok((embedded, usize::try_from(applied).unwrap_or(0)))
}
