//! SQL access for the `books` table. Every operation is a single statement.

use bookshelf_db::Database;
use thiserror::Error;

use super::models::{Book, BookChanges};

const COLUMNS: &str = "isbn, amazon_url, author, language, pages, publisher, title, year";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no book with isbn '{0}'")]
    NotFound(String),

    #[error("a book with isbn '{0}' already exists")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct BookStore {
    db: Database,
}

impl BookStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All books, ordered by title.
    pub async fn list(&self) -> Result<Vec<Book>, StoreError> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {COLUMNS} FROM books ORDER BY title, isbn"
        ))
        .fetch_all(self.db.pool())
        .await?;

        Ok(books)
    }

    pub async fn get(&self, isbn: &str) -> Result<Book, StoreError> {
        sqlx::query_as::<_, Book>(&format!("SELECT {COLUMNS} FROM books WHERE isbn = ?"))
            .bind(isbn)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| StoreError::NotFound(isbn.to_string()))
    }

    /// Insert a new row. An existing row with the same isbn is never overwritten.
    pub async fn create(&self, book: &Book) -> Result<Book, StoreError> {
        let result = sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(&book.isbn)
        .bind(&book.amazon_url)
        .bind(&book.author)
        .bind(&book.language)
        .bind(book.pages)
        .bind(&book.publisher)
        .bind(&book.title)
        .bind(book.year)
        .fetch_one(self.db.pool())
        .await;

        match result {
            Ok(book) => Ok(book),
            Err(sqlx::Error::Database(e)) if is_duplicate_key(e.as_ref()) => {
                Err(StoreError::Conflict(book.isbn.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite every non-key column of an existing row.
    pub async fn update(&self, isbn: &str, changes: &BookChanges) -> Result<Book, StoreError> {
        sqlx::query_as::<_, Book>(&format!(
            "UPDATE books SET amazon_url = ?, author = ?, language = ?, pages = ?, \
             publisher = ?, title = ?, year = ? WHERE isbn = ? RETURNING {COLUMNS}"
        ))
        .bind(&changes.amazon_url)
        .bind(&changes.author)
        .bind(&changes.language)
        .bind(changes.pages)
        .bind(&changes.publisher)
        .bind(&changes.title)
        .bind(changes.year)
        .bind(isbn)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| StoreError::NotFound(isbn.to_string()))
    }

    pub async fn delete(&self, isbn: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM books WHERE isbn = ?")
            .bind(isbn)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(isbn.to_string()));
        }

        Ok(())
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count)
    }
}

fn is_duplicate_key(error: &dyn sqlx::error::DatabaseError) -> bool {
    error.is_unique_violation() || error.message().starts_with("UNIQUE constraint failed")
}
