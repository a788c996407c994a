//! HTTP handlers for the books module.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection},
        Path, State,
    },
    http::{header, HeaderValue, StatusCode},
    routing::get,
    Router,
};
use readinglist_http::{decode, AppError, Envelope};

use super::models::{BookId, BookPatch, CreateBook};
use super::store::{BookStore, StoreError};

#[derive(Clone)]
pub struct BooksState {
    store: Arc<dyn BookStore>,
}

/// Routes relative to the module mount point (`/v1/books`).
pub fn router(store: Arc<dyn BookStore>) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{id}",
            get(show_book).put(update_book).delete(delete_book),
        )
        .with_state(BooksState { store })
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::not_found("the requested book could not be found"),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

type IdSegment = Result<Path<String>, PathRejection>;
type RequestBody = Result<Bytes, BytesRejection>;

/// Parse the `{id}` path segment as a base-10 integer.
fn parse_id(segment: IdSegment) -> Result<BookId, AppError> {
    let Path(raw) = segment?;
    parse_id_str(&raw)
}

fn parse_id_str(raw: &str) -> Result<BookId, AppError> {
    raw.parse::<BookId>()
        .map_err(|_| AppError::bad_request(format!("invalid book id '{}'", raw)))
}

async fn list_books(State(state): State<BooksState>) -> Result<Envelope, AppError> {
    let books = state.store.get_all().await?;
    Ok(Envelope::ok("books", &books))
}

async fn create_book(
    State(state): State<BooksState>,
    body: RequestBody,
) -> Result<Envelope, AppError> {
    let input: CreateBook = decode(&body?)?;
    let book = state.store.insert(input).await?;

    let location = HeaderValue::try_from(format!("v1/books/{}", book.id))
        .map_err(|e| AppError::Internal(e.into()))?;

    tracing::info!(book_id = book.id, "book created");
    Ok(Envelope::new(StatusCode::CREATED, "book", &book).with_header(header::LOCATION, location))
}

async fn show_book(
    State(state): State<BooksState>,
    segment: IdSegment,
) -> Result<Envelope, AppError> {
    let id = parse_id(segment)?;
    let book = state.store.get(id).await?;
    Ok(Envelope::ok("book", &book))
}

/// Merge the supplied fields into the stored book.
async fn update_book(
    State(state): State<BooksState>,
    segment: IdSegment,
    body: RequestBody,
) -> Result<Envelope, AppError> {
    let id = parse_id(segment)?;
    let mut book = state.store.get(id).await?;

    let patch: BookPatch = decode(&body?)?;
    patch.apply_to(&mut book);

    let book = state.store.update(&book).await?;
    tracing::info!(book_id = book.id, version = book.version, "book updated");
    Ok(Envelope::ok("book", &book))
}

async fn delete_book(
    State(state): State<BooksState>,
    segment: IdSegment,
) -> Result<Envelope, AppError> {
    let id = parse_id(segment)?;
    state.store.delete(id).await?;

    tracing::info!(book_id = id, "book deleted");
    Ok(Envelope::ok("message", "book successfully deleted"))
}
