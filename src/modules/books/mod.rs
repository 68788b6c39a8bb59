pub mod models;
pub mod routes;
pub mod schema;
pub mod store;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use store::BookStore;

/// The book catalogue: CRUD over the `books` table, mounted at `/books`
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let count = BookStore::new(ctx.db.clone()).count().await?;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books = count,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, ctx: &InitCtx<'_>) -> Router {
        routes::router(BookStore::new(ctx.db.clone()))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book_response = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/BookResponse" }
                    }
                }
            })
        };
        let isbn_param = json!({
            "name": "isbn",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Every book, ordered by title",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BooksResponse" }
                                    }
                                }
                            },
                            "500": error("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Book" }
                                }
                            }
                        },
                        "responses": {
                            "201": book_response("Book created"),
                            "400": error("Invalid payload"),
                            "409": error("A book with this isbn already exists")
                        }
                    }
                },
                "/{isbn}": {
                    "get": {
                        "summary": "Get a book by isbn",
                        "tags": ["Books"],
                        "parameters": [isbn_param.clone()],
                        "responses": {
                            "200": book_response("The book"),
                            "404": error("No book with this isbn")
                        }
                    },
                    "put": {
                        "summary": "Replace every field of a book except its isbn",
                        "tags": ["Books"],
                        "parameters": [isbn_param.clone()],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookChanges" }
                                }
                            }
                        },
                        "responses": {
                            "200": book_response("Book updated"),
                            "400": error("Invalid payload"),
                            "404": error("No book with this isbn")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [isbn_param],
                        "responses": {
                            "200": {
                                "description": "Book deleted",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/MessageResponse" }
                                    }
                                }
                            },
                            "404": error("No book with this isbn")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": book_schema(true),
                    "BookChanges": book_schema(false),
                    "BookResponse": {
                        "type": "object",
                        "properties": {
                            "book": { "$ref": "#/components/schemas/Book" }
                        },
                        "required": ["book"]
                    },
                    "BooksResponse": {
                        "type": "object",
                        "properties": {
                            "books": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Book" }
                            }
                        },
                        "required": ["books"]
                    },
                    "MessageResponse": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string" }
                        },
                        "required": ["message"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

pub(crate) fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_create_books",
        up: r#"
            CREATE TABLE books (
                isbn       TEXT PRIMARY KEY NOT NULL,
                amazon_url TEXT NOT NULL,
                author     TEXT NOT NULL,
                language   TEXT NOT NULL,
                pages      INTEGER NOT NULL,
                publisher  TEXT NOT NULL,
                title      TEXT NOT NULL,
                year       INTEGER NOT NULL
            );
            "#,
    }]
}

/// JSON schema of a book payload, built from the same field list the
/// validator uses.
fn book_schema(with_isbn: bool) -> serde_json::Value {
    let fields = if with_isbn {
        schema::CREATE_BOOK
    } else {
        schema::UPDATE_BOOK
    };

    let mut properties = serde_json::Map::new();
    for field in fields {
        let kind = match field.kind {
            schema::FieldKind::String => "string",
            schema::FieldKind::Integer => "integer",
        };
        properties.insert(field.name.to_string(), json!({ "type": kind }));
    }

    let required: Vec<&str> = fields
        .iter()
        .filter(|field| field.required)
        .map(|field| field.name)
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

/// Create a new instance of the books module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new())
}
