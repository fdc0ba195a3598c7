pub mod handlers;
pub mod models;
pub mod store;

use async_trait::async_trait;
use axum::{routing::get, Router};
use bookshelf_kernel::{settings::Settings, InitCtx, Module};
use serde_json::json;

use handlers::BooksState;
use store::BookStore;

/// Books module: CRUD over the in-memory catalog
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(store: BookStore, strict_bodies: bool) -> Self {
        Self {
            state: BooksState {
                store,
                strict_bodies,
            },
        }
    }

    pub fn store(&self) -> &BookStore {
        &self.state.store
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if ctx.settings.books.seed_sample_data {
            tracing::info!(module = self.name(), "creating mock data");
            self.state.store.seed_sample_data().await;
        }

        let books = self.state.store.len().await;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books = books,
            strict_bodies = self.state.strict_bodies,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(handlers::list_books).post(handlers::create_book))
            .route(
                "/{id}",
                get(handlers::get_book)
                    .put(handlers::update_book)
                    .delete(handlers::delete_book),
            )
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        });
        let book_body = json!({
            "description": "Book fields; `id` is ignored and undecodable fields default to empty",
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/Book" }
                }
            }
        });
        let book_or_null = json!({
            "application/json": {
                "schema": {
                    "oneOf": [
                        { "$ref": "#/components/schemas/Book" },
                        { "type": "null" }
                    ]
                }
            }
        });
        let null_body = json!({
            "application/json": { "schema": { "type": "null" } }
        });
        let error_body = json!({
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books sorted by id",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "All books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": book_body,
                        "responses": {
                            "200": {
                                "description": "The stored book with its assigned id",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "400": {
                                "description": "Last stored id is not numeric, or the body was rejected",
                                "content": error_body
                            },
                            "409": {
                                "description": "No id left to assign",
                                "content": error_body
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book by id",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": {
                            "200": { "description": "The book, or null", "content": book_or_null }
                        }
                    },
                    "put": {
                        "summary": "Replace a book, keeping its id",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "requestBody": book_body,
                        "responses": {
                            "200": { "description": "The replaced book, or null", "content": book_or_null },
                            "400": { "description": "Body rejected", "content": error_body }
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": {
                            "200": { "description": "Always null", "content": null_body }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "description": "Store-assigned identifier" },
                            "isbn": { "type": "string" },
                            "title": { "type": "string" },
                            "author": {
                                "oneOf": [
                                    { "$ref": "#/components/schemas/Author" },
                                    { "type": "null" }
                                ]
                            }
                        },
                        "required": ["id", "isbn", "title", "author"]
                    },
                    "Author": {
                        "type": "object",
                        "properties": {
                            "firstName": { "type": "string" },
                            "lastName": { "type": "string" }
                        },
                        "required": ["firstName", "lastName"]
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let books = self.state.store.len().await;
        tracing::info!(
            module = self.name(),
            books = books,
            "books module stopped, catalog discarded"
        );
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(settings: &Settings) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(
        BookStore::new(),
        settings.books.strict_bodies,
    ))
}
