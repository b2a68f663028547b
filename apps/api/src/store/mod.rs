//! Document store: the persistence seam every repository is built on.
//!
//! The rest of the crate only depends on the `DocumentStore` capability set
//! (filtered find with skip/limit/sort, insert, single-document partial
//! update, single and bulk delete, count). `AppState` carries an
//! `Arc<dyn DocumentStore>` chosen at startup: `PgDocumentStore` when a
//! database is configured, `MemoryStore` otherwise.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod collection;
pub mod memory;
pub mod postgres;
pub mod query;

pub use collection::{Collection, Cursor, Document};
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;
pub use query::{Filter, FindOptions, Patch, SortDirection};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no document in '{collection}' matches {filter}")]
    NotFound { collection: String, filter: String },

    #[error("expected one document in '{collection}' for {filter}, found {count}")]
    AmbiguousResult {
        collection: String,
        filter: String,
        count: usize,
    },

    #[error("a document with {field} = '{key}' already exists in '{collection}'")]
    DuplicateKey {
        collection: String,
        field: String,
        key: String,
    },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed document in '{collection}': {source}")]
    Malformed {
        collection: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn not_found(collection: &str, filter: &Filter) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            filter: filter.to_string(),
        }
    }
}

/// Raw access to named collections of JSON documents.
///
/// Each call is atomic on its own; nothing groups several calls into a
/// transaction.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the matching documents after applying skip, limit and sort.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Value>, StoreError>;

    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), StoreError>;

    /// Applies `patch` to the first matching document. Returns the number of
    /// matched documents (0 or 1).
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<u64, StoreError>;

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;
}
