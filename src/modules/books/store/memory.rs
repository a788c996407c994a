use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{BookStore, StoreError};
use crate::modules::books::models::{Book, BookId, CreateBook};

#[derive(Debug, Default)]
struct Shelf {
    books: BTreeMap<BookId, Book>,
    last_id: BookId,
}

/// Process-local book store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryBookStore {
    shelf: RwLock<Shelf>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn get_all(&self) -> Result<Vec<Book>, StoreError> {
        let shelf = self.shelf.read().unwrap_or_else(PoisonError::into_inner);
        Ok(shelf.books.values().cloned().collect())
    }

    async fn get(&self, id: BookId) -> Result<Book, StoreError> {
        let shelf = self.shelf.read().unwrap_or_else(PoisonError::into_inner);
        shelf.books.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn insert(&self, book: CreateBook) -> Result<Book, StoreError> {
        let mut shelf = self.shelf.write().unwrap_or_else(PoisonError::into_inner);
        shelf.last_id += 1;

        let stored = Book {
            id: shelf.last_id,
            created_at: OffsetDateTime::now_utc(),
            title: book.title,
            published: book.published,
            pages: book.pages,
            genres: book.genres,
            rating: book.rating,
            version: 1,
        };
        shelf.books.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, book: &Book) -> Result<Book, StoreError> {
        let mut shelf = self.shelf.write().unwrap_or_else(PoisonError::into_inner);
        let stored = shelf.books.get_mut(&book.id).ok_or(StoreError::NotFound)?;

        stored.title = book.title.clone();
        stored.published = book.published;
        stored.pages = book.pages;
        stored.genres = book.genres.clone();
        stored.rating = book.rating;
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn delete(&self, id: BookId) -> Result<(), StoreError> {
        let mut shelf = self.shelf.write().unwrap_or_else(PoisonError::into_inner);
        shelf
            .books
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
