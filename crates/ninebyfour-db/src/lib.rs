pub mod conversations;
pub mod error;
pub mod follows;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod users;
pub mod waitlist;

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::info;

pub use conversations::canonical_pair;
pub use rusqlite;
pub use error::{Error, Result};

pub const DEFAULT_POOL_SIZE: u32 = 8;

/// Current time as stored in every timestamp column: RFC 3339, UTC,
/// millisecond precision.
pub(crate) const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Handle to the SQLite database. Cheap to share behind an `Arc`; every call
/// checks a connection out of the pool and returns it when done.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_pool_size(path, DEFAULT_POOL_SIZE)
    }

    pub fn open_with_pool_size(path: &Path, pool_size: u32) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            // Per-connection settings: SQLite does not persist these
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(Duration::from_secs(5))?;
            Ok(())
        });
        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager)?;

        {
            let conn = pool.get()?;
            // WAL mode for concurrent reads
            conn.pragma_update(None, "journal_mode", "WAL")?;
            migrations::run(&conn)?;
        }

        info!("Database opened at {} (pool size {})", path.display(), pool_size);
        Ok(Self { pool })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.pool.get()?;
        f(&conn)
    }

    /// Runs `f` inside an IMMEDIATE transaction. The write lock is taken up
    /// front so check-then-write sequences cannot interleave with another
    /// writer. Commits on `Ok`; any error drops the transaction, which rolls
    /// it back, and the connection goes back to the pool either way.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use tempfile::TempDir;

    use super::Database;

    /// Fresh database in its own temp directory. The pool needs a real file:
    /// every `:memory:` connection would be a separate database.
    pub fn temp_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::open(&dir.path().join("test.db")).expect("open db");
        (dir, db)
    }

    pub fn user(db: &Database, name: &str) -> i64 {
        db.create_user(
            name,
            "not-a-real-hash",
            &format!("{name}@example.com"),
            ninebyfour_types::models::Role::User,
        )
        .expect("create user")
    }

    pub fn befriend(db: &Database, a: i64, b: i64) {
        db.follow(a, b).expect("follow a -> b");
        db.follow(b, a).expect("follow b -> a");
    }
}
