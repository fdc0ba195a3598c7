use axum::{
    extract::{Path, State},
    Json,
};
use bookshelf_http::{
    error::AppError,
    extract::{BodyPolicy, PermissiveJson},
};

use super::{
    models::Book,
    store::{BookStore, StoreError},
};

/// State shared by every books handler
#[derive(Clone)]
pub struct BooksState {
    pub store: BookStore,
    pub strict_bodies: bool,
}

impl BodyPolicy for BooksState {
    fn strict_bodies(&self) -> bool {
        self.strict_bodies
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::NonNumericId { .. } => AppError::bad_request(message),
            StoreError::IdSpaceExhausted { .. } => AppError::conflict(message),
        }
    }
}

/// Sorts the catalog by ID in place before answering.
pub async fn list_books(State(state): State<BooksState>) -> Json<Vec<Book>> {
    let books = state.store.list().await;
    tracing::info!(count = books.len(), "returning list of books");
    Json(books)
}

/// Absent books answer `200 null`, not 404.
pub async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Json<Option<Book>> {
    let book = state.store.get(&id).await;
    tracing::info!(%id, found = book.is_some(), "returning single book");
    Json(book)
}

/// Any client-supplied `id` is replaced by the next free one.
pub async fn create_book(
    State(state): State<BooksState>,
    PermissiveJson(book): PermissiveJson<Book>,
) -> Result<Json<Book>, AppError> {
    let book = state.store.create(book).await?;
    tracing::info!(id = %book.id, "created book");
    Ok(Json(book))
}

/// The replacement keeps the path `id` and moves to the end of the catalog.
pub async fn update_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
    PermissiveJson(book): PermissiveJson<Book>,
) -> Json<Option<Book>> {
    let updated = state.store.update(&id, book).await;
    tracing::info!(%id, found = updated.is_some(), "updating book");
    Json(updated)
}

/// Always `200 null`, whether or not anything was removed.
pub async fn delete_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    let removed = state.store.delete(&id).await;
    tracing::info!(%id, found = removed.is_some(), "deleting book");
    Json(serde_json::Value::Null)
}
