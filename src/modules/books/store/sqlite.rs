use async_trait::async_trait;
use readinglist_db::Database;
use rusqlite::{params, types::Type, OptionalExtension, Row};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::{BookStore, StoreError};
use crate::modules::books::models::{Book, BookId, CreateBook};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS books (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TEXT NOT NULL,
        title TEXT NOT NULL,
        published INTEGER NOT NULL,
        pages INTEGER NOT NULL,
        genres TEXT NOT NULL DEFAULT '[]',
        rating REAL NOT NULL,
        version INTEGER NOT NULL DEFAULT 1
    );
";

const COLUMNS: &str = "id, created_at, title, published, pages, genres, rating, version";

/// `SQLite`-backed book store.
///
/// `AUTOINCREMENT` keeps ids of deleted books from being handed out again.
pub struct SqliteBookStore {
    db: Database,
}

impl SqliteBookStore {
    /// Wrap `db`, creating the `books` table if it does not exist.
    pub async fn new(db: Database) -> Result<Self, StoreError> {
        db.call("create_books_table", |conn| conn.execute_batch(SCHEMA))
            .await?;
        tracing::debug!(location = db.location(), "books table ready");
        Ok(Self { db })
    }
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    let created_at: String = row.get(1)?;
    let created_at = OffsetDateTime::parse(&created_at, &Rfc3339)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    let genres: String = row.get(5)?;
    let genres = serde_json::from_str(&genres)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    Ok(Book {
        id: row.get(0)?,
        created_at,
        title: row.get(2)?,
        published: row.get(3)?,
        pages: row.get(4)?,
        genres,
        rating: row.get(6)?,
        version: row.get(7)?,
    })
}

fn encode_genres(genres: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(genres).map_err(|e| StoreError::Encode {
        field: "genres",
        cause: e.to_string(),
    })
}

#[async_trait]
impl BookStore for SqliteBookStore {
    async fn get_all(&self) -> Result<Vec<Book>, StoreError> {
        let books = self
            .db
            .call("select_books", |conn| {
                let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM books ORDER BY id"))?;
                let rows = stmt.query_map([], book_from_row)?;
                rows.collect()
            })
            .await?;
        Ok(books)
    }

    async fn get(&self, id: BookId) -> Result<Book, StoreError> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }

        self.db
            .call("select_book", move |conn| {
                conn.query_row(
                    &format!("SELECT {COLUMNS} FROM books WHERE id = ?1"),
                    params![id],
                    book_from_row,
                )
                .optional()
            })
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn insert(&self, book: CreateBook) -> Result<Book, StoreError> {
        let created_at = OffsetDateTime::now_utc();
        let created_at_text = created_at.format(&Rfc3339).map_err(|e| StoreError::Encode {
            field: "created_at",
            cause: e.to_string(),
        })?;
        let genres = encode_genres(&book.genres)?;

        let CreateBook {
            title,
            published,
            pages,
            genres: genre_list,
            rating,
        } = book;
        let insert_title = title.clone();

        let id: BookId = self
            .db
            .call("insert_book", move |conn| {
                conn.query_row(
                    "INSERT INTO books (created_at, title, published, pages, genres, rating, version)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
                     RETURNING id",
                    params![created_at_text, insert_title, published, pages, genres, rating],
                    |row| row.get(0),
                )
            })
            .await?;

        tracing::debug!(book_id = id, "book inserted");

        Ok(Book {
            id,
            created_at,
            title,
            published,
            pages,
            genres: genre_list,
            rating,
            version: 1,
        })
    }

    async fn update(&self, book: &Book) -> Result<Book, StoreError> {
        let genres = encode_genres(&book.genres)?;
        let id = book.id;
        let title = book.title.clone();
        let (published, pages, rating) = (book.published, book.pages, book.rating);

        let version: Option<i64> = self
            .db
            .call("update_book", move |conn| {
                conn.query_row(
                    "UPDATE books
                     SET title = ?1, published = ?2, pages = ?3, genres = ?4, rating = ?5,
                         version = version + 1
                     WHERE id = ?6
                     RETURNING version",
                    params![title, published, pages, genres, rating, id],
                    |row| row.get(0),
                )
                .optional()
            })
            .await?;

        let version = version.ok_or(StoreError::NotFound)?;
        tracing::debug!(book_id = id, version, "book updated");

        Ok(Book {
            version,
            ..book.clone()
        })
    }

    async fn delete(&self, id: BookId) -> Result<(), StoreError> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }

        let removed = self
            .db
            .call("delete_book", move |conn| {
                conn.execute("DELETE FROM books WHERE id = ?1", params![id])
            })
            .await?;

        if removed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
