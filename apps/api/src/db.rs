use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::store::{DocumentStore, MemoryStore, PgDocumentStore};

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Picks the document store backend: Postgres when a database is configured,
/// otherwise an in-memory store that is lost on restart.
pub async fn open_document_store(database_url: Option<&str>) -> Result<Arc<dyn DocumentStore>> {
    let Some(database_url) = database_url else {
        warn!("DATABASE_URL is not set; documents are kept in memory only");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let store = PgDocumentStore::new(create_pool(database_url).await?);
    store
        .ensure_schema()
        .await
        .context("Failed to prepare the documents table")?;
    Ok(Arc::new(store))
}
