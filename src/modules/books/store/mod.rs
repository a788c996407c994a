//! Persistence contract for books and its implementations.

mod memory;
mod sqlite;

pub use memory::MemoryBookStore;
pub use sqlite::SqliteBookStore;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use readinglist_db::{Database, DbError};
use readinglist_kernel::settings::{DatabaseBackend, DatabaseSettings};
use thiserror::Error;

use super::models::{Book, BookId, CreateBook};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("failed to encode {field} for storage: {cause}")]
    Encode { field: &'static str, cause: String },

    #[error(transparent)]
    Database(#[from] DbError),
}

/// CRUD access to stored books.
///
/// Implementations are shared across concurrent requests and must be safe to
/// call from many tasks at once.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// All books ordered by id.
    async fn get_all(&self) -> Result<Vec<Book>, StoreError>;

    async fn get(&self, id: BookId) -> Result<Book, StoreError>;

    /// Store a new book, assigning its id, creation time, and version 1.
    async fn insert(&self, book: CreateBook) -> Result<Book, StoreError>;

    /// Persist every mutable field of `book` and bump its version.
    ///
    /// Returns the stored book.
    async fn update(&self, book: &Book) -> Result<Book, StoreError>;

    async fn delete(&self, id: BookId) -> Result<(), StoreError>;
}

/// Open the store selected by `settings.backend`.
pub async fn open(settings: &DatabaseSettings) -> anyhow::Result<Arc<dyn BookStore>> {
    match settings.backend {
        DatabaseBackend::Memory => {
            tracing::info!("using in-memory book store");
            Ok(Arc::new(MemoryBookStore::new()))
        }
        DatabaseBackend::Sqlite => {
            let db = Database::open(
                &settings.dsn,
                Duration::from_millis(settings.busy_timeout_ms),
            )
            .context("failed to open book database")?;
            let store = SqliteBookStore::new(db)
                .await
                .context("failed to prepare books table")?;
            Ok(Arc::new(store))
        }
    }
}
