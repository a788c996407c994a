//! SQLite connection handling.
//!
//! A [`Database`] owns one connection behind a mutex and runs every call on
//! tokio's blocking pool so async handlers never block a worker thread.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;
use thiserror::Error;

/// Location string for databases that never touch disk.
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to open database at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{operation} failed: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database worker for {operation} did not complete: {source}")]
    Worker {
        operation: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Shared handle to a configured SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    location: Arc<str>,
}

impl Database {
    /// Open (or create) the database at `path`. The literal `:memory:` opens a
    /// private in-memory database.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, DbError> {
        let path = path.as_ref();
        let conn = if path == Path::new(IN_MEMORY) {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|source| DbError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        configure_connection(&conn, busy_timeout).map_err(|source| DbError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(target: "readinglist-db", path = %path.display(), "database opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: Arc::from(path.display().to_string()),
        })
    }

    /// Open a private in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::open(IN_MEMORY, Duration::from_secs(5))
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Run `f` against the connection on the blocking pool.
    ///
    /// `operation` names the call in errors and logs.
    pub async fn call<F, R>(&self, operation: &'static str, f: F) -> Result<R, DbError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = acquire_lock(&conn);
            f(&guard)
        })
        .await
        .map_err(|source| DbError::Worker { operation, source })?
        .map_err(|source| {
            tracing::debug!(target: "readinglist-db", operation, error = %source, "query failed");
            DbError::Query { operation, source }
        })
    }
}

/// Acquire the connection lock, recovering from poisoning.
///
/// A panic inside a previous call leaves the connection itself usable; SQLite
/// rolls back any open implicit transaction.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!(target: "readinglist-db", "SQLite mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Apply WAL journaling, `NORMAL` sync and a busy timeout.
pub fn configure_connection(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    // journal_mode answers with a row ("wal", or "memory" for in-memory
    // databases), which pragma_update reports as an error; the mode is
    // best-effort either way.
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}
