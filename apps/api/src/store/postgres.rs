use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::store::query::SortDirection;
use crate::store::{DocumentStore, Filter, FindOptions, Patch, StoreError};

/// Document store backed by a single Postgres table of JSONB bodies.
///
/// Filters compile to SQL over `body #> path` with every field path and value
/// bound as a parameter. Identity uniqueness is enforced by the collection
/// layer, not by a constraint, matching a document store without indexes.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the documents table and its indexes if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id BIGSERIAL PRIMARY KEY,
                collection TEXT NOT NULL,
                body JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_collection_url ON documents (collection, (body->>'url'))",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_collection_site ON documents (collection, (body->>'site_url'))",
        )
        .execute(&self.pool)
        .await?;

        info!("Document store schema ready");
        Ok(())
    }
}

fn path_segments(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// Starts a `... WHERE collection = $1 AND (<filter>)` clause.
fn push_scope(builder: &mut QueryBuilder<'_, Postgres>, collection: &str, filter: &Filter) {
    builder.push(" WHERE collection = ");
    builder.push_bind(collection.to_string());
    builder.push(" AND (");
    push_filter(builder, filter);
    builder.push(")");
}

fn push_field(builder: &mut QueryBuilder<'_, Postgres>, path: &str) {
    builder.push("(body #> ");
    builder.push_bind(path_segments(path));
    builder.push("::text[])");
}

fn push_comparison(
    builder: &mut QueryBuilder<'_, Postgres>,
    path: &str,
    operator: &str,
    value: &Value,
) {
    // jsonb orders values of different types against each other; documents
    // only compare values of the same type.
    builder.push("(jsonb_typeof");
    push_field(builder, path);
    builder.push(" = jsonb_typeof(");
    builder.push_bind(Json(value.clone()));
    builder.push("::jsonb) AND ");
    push_field(builder, path);
    builder.push(format!(" {operator} "));
    builder.push_bind(Json(value.clone()));
    builder.push("::jsonb)");
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::All => {
            builder.push("TRUE");
        }
        Filter::Eq(path, value) => {
            builder.push("COALESCE(");
            push_field(builder, path);
            builder.push(" = ");
            builder.push_bind(Json(value.clone()));
            builder.push("::jsonb, FALSE)");
        }
        Filter::Ne(path, value) => {
            push_field(builder, path);
            builder.push(" IS DISTINCT FROM ");
            builder.push_bind(Json(value.clone()));
            builder.push("::jsonb");
        }
        Filter::Gt(path, value) => push_comparison(builder, path, ">", value),
        Filter::Gte(path, value) => push_comparison(builder, path, ">=", value),
        Filter::Lt(path, value) => push_comparison(builder, path, "<", value),
        Filter::Lte(path, value) => push_comparison(builder, path, "<=", value),
        Filter::In(path, values) => {
            let alternatives = values
                .iter()
                .map(|v| Filter::Eq(path.clone(), v.clone()))
                .collect();
            push_filter(builder, &Filter::Or(alternatives));
        }
        Filter::Exists(path, present) => {
            push_field(builder, path);
            builder.push(if *present { " IS NOT NULL" } else { " IS NULL" });
        }
        Filter::And(filters) => push_junction(builder, filters, " AND ", "TRUE"),
        Filter::Or(filters) => push_junction(builder, filters, " OR ", "FALSE"),
        Filter::Not(inner) => {
            builder.push("NOT COALESCE((");
            push_filter(builder, inner);
            builder.push("), FALSE)");
        }
    }
}

fn push_junction(
    builder: &mut QueryBuilder<'_, Postgres>,
    filters: &[Filter],
    separator: &str,
    empty: &str,
) {
    if filters.is_empty() {
        builder.push(empty);
        return;
    }
    builder.push("(");
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            builder.push(separator);
        }
        builder.push("COALESCE((");
        push_filter(builder, filter);
        builder.push("), FALSE)");
    }
    builder.push(")");
}

/// Selects the id of the first document matching the filter, in insertion order.
fn push_first_match(builder: &mut QueryBuilder<'_, Postgres>, collection: &str, filter: &Filter) {
    builder.push("SELECT id FROM documents");
    push_scope(builder, collection, filter);
    builder.push(" ORDER BY id LIMIT 1");
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Value>, StoreError> {
        let mut builder = QueryBuilder::new("SELECT body FROM documents");
        push_scope(&mut builder, collection, filter);

        builder.push(" ORDER BY ");
        if let Some(sort) = &options.sort {
            push_field(&mut builder, &sort.key);
            builder.push(match sort.direction {
                SortDirection::Ascending => " ASC NULLS FIRST, ",
                SortDirection::Descending => " DESC NULLS LAST, ",
            });
        }
        builder.push("id");

        if let Some(limit) = options.limit {
            builder.push(" LIMIT ");
            builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        builder.push(" OFFSET ");
        builder.push_bind(i64::try_from(options.skip).unwrap_or(i64::MAX));

        debug!("find in '{collection}' where {filter}");

        let rows = builder
            .build_query_scalar::<Json<Value>>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|Json(body)| body).collect())
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO documents (collection, body) VALUES ($1, $2)")
            .bind(collection)
            .bind(Json(document))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut builder = QueryBuilder::new("SELECT id, body FROM documents");
        push_scope(&mut builder, collection, filter);
        builder.push(" ORDER BY id LIMIT 1 FOR UPDATE");

        let row = builder
            .build_query_as::<(i64, Json<Value>)>()
            .fetch_optional(&mut *tx)
            .await?;

        let Some((id, Json(mut body))) = row else {
            tx.rollback().await?;
            return Ok(0);
        };

        patch.apply(&mut body);

        sqlx::query("UPDATE documents SET body = $1 WHERE id = $2")
            .bind(Json(body))
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(1)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut builder = QueryBuilder::new("DELETE FROM documents WHERE id IN (");
        push_first_match(&mut builder, collection, filter);
        builder.push(")");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut builder = QueryBuilder::new("DELETE FROM documents");
        push_scope(&mut builder, collection, filter);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM documents");
        push_scope(&mut builder, collection, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
