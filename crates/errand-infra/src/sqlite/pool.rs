//! SQLite pool backing the task store.
//!
//! The two polling loops read far more often than they write, so reads go
//! through a small read-only pool while every insert and status flip is
//! funneled through a single writer connection (SQLite serializes writers
//! anyway). WAL journal mode keeps the pollers from blocking on the writer.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Reader/writer pool pair over one SQLite task database.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open the database, run pending migrations, and hand back the pools.
    ///
    /// Both sides use WAL mode, foreign keys, and a 5-second busy timeout;
    /// the file is created when missing.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(write_opts)
            .await?;

        // Writer first: the schema must exist before the read-only pool opens.
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(read_opts)
            .await?;

        Ok(Self { reader, writer })
    }
}

/// Default database location: `$ERRAND_DATA_DIR/errand.db`, or
/// `~/.errand/errand.db` when the env var is unset.
pub fn default_database_url() -> String {
    let data_dir = std::env::var("ERRAND_DATA_DIR").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{home}/.errand")
    });
    format!("sqlite://{data_dir}/errand.db")
}
