//! HTTP handlers for `/books`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookshelf_http::error::AppError;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::models::{Book, BookChanges, BookResponse, BooksResponse, MessageResponse};
use super::schema::{self, Schema};
use super::store::{BookStore, StoreError};

/// Routes relative to the module's base path.
pub fn router(store: BookStore) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{isbn}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(store)
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(isbn) => {
                AppError::not_found(format!("There is no book with an isbn '{isbn}'"))
            }
            StoreError::Conflict(isbn) => AppError::conflict(
                vec![json!({ "field": "isbn", "error": "already exists" })],
                format!("A book with isbn '{isbn}' already exists"),
            ),
            StoreError::Database(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

/// Check a JSON body against `schema`, then convert it.
fn validated<T: DeserializeOwned>(payload: Value, schema: Schema) -> Result<T, AppError> {
    if let Err(violations) = schema::validate(&payload, schema) {
        let message = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        let details = violations.iter().map(|v| v.to_detail()).collect();
        return Err(AppError::validation(details, message));
    }

    serde_json::from_value(payload).map_err(|e| AppError::validation(vec![], e.to_string()))
}

async fn list_books(State(store): State<BookStore>) -> Result<Json<BooksResponse>, AppError> {
    let books = store.list().await?;
    Ok(Json(BooksResponse { books }))
}

async fn get_book(
    State(store): State<BookStore>,
    Path(isbn): Path<String>,
) -> Result<Json<BookResponse>, AppError> {
    let book = store.get(&isbn).await?;
    Ok(Json(BookResponse { book }))
}

async fn create_book(
    State(store): State<BookStore>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    let Json(payload) = payload?;
    let book: Book = validated(payload, schema::CREATE_BOOK)?;

    let book = store.create(&book).await?;
    tracing::info!(isbn = %book.isbn, "book created");

    Ok((StatusCode::CREATED, Json(BookResponse { book })))
}

async fn update_book(
    State(store): State<BookStore>,
    Path(isbn): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BookResponse>, AppError> {
    let Json(payload) = payload?;
    let changes: BookChanges = validated(payload, schema::UPDATE_BOOK)?;

    let book = store.update(&isbn, &changes).await?;
    tracing::info!(isbn = %book.isbn, "book updated");

    Ok(Json(BookResponse { book }))
}

async fn delete_book(
    State(store): State<BookStore>,
    Path(isbn): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    store.delete(&isbn).await?;
    tracing::info!(%isbn, "book deleted");

    Ok(Json(MessageResponse {
        message: "Book deleted".to_string(),
    }))
}
