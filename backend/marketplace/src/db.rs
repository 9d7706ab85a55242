//! Database layer — the document-store abstraction and its SQLite implementation.
//!
//! Every document lives in a [`Namespace`] (logical database + collection) and
//! is addressed only by exact match on its identifier field.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use axum::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::errors::{MarketError, Result};

/// A `(database, collection)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// The persistence collaborator behind the project store.
///
/// No operation checks identifier uniqueness. When several documents share an
/// identifier, the earliest inserted one is the one found and updated.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(&self, ns: &Namespace, id: &str, document: Value) -> Result<()>;

    /// Replace the first document matching `id`. Returns how many matched (0 or 1).
    async fn update_one(&self, ns: &Namespace, id: &str, document: Value) -> Result<u64>;

    /// Fails with [`MarketError::NotFound`] when nothing matches.
    async fn find_one(&self, ns: &Namespace, id: &str) -> Result<Value>;

    /// A `limit` of 0 means no limit.
    async fn find_all(&self, ns: &Namespace, limit: u32) -> Result<Vec<Value>>;
}

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    // Make sure the file is created if it doesn't exist yet.
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

/// [`DocumentStore`] over a single `documents` table.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Run a store future under the configured deadline.
    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| MarketError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert_one(&self, ns: &Namespace, id: &str, document: Value) -> Result<()> {
        debug!("insert {ns} id={id}");
        self.bounded(async {
            sqlx::query(
                r#"
                INSERT INTO documents (database_name, collection_name, doc_id, body)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(&ns.database)
            .bind(&ns.collection)
            .bind(id)
            .bind(document.to_string())
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    async fn update_one(&self, ns: &Namespace, id: &str, document: Value) -> Result<u64> {
        debug!("update {ns} id={id}");
        self.bounded(async {
            let rows_affected = sqlx::query(
                r#"
                UPDATE documents
                SET    body = ?4
                WHERE  row_id = (
                    SELECT row_id FROM documents
                    WHERE  database_name = ?1 AND collection_name = ?2 AND doc_id = ?3
                    ORDER  BY row_id ASC
                    LIMIT  1
                )
                "#,
            )
            .bind(&ns.database)
            .bind(&ns.collection)
            .bind(id)
            .bind(document.to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();
            Ok(rows_affected)
        })
        .await
    }

    async fn find_one(&self, ns: &Namespace, id: &str) -> Result<Value> {
        debug!("find {ns} id={id}");
        self.bounded(async {
            let row: Option<(String,)> = sqlx::query_as(
                r#"
                SELECT body FROM documents
                WHERE  database_name = ?1 AND collection_name = ?2 AND doc_id = ?3
                ORDER  BY row_id ASC
                LIMIT  1
                "#,
            )
            .bind(&ns.database)
            .bind(&ns.collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            match row {
                Some((body,)) => Ok(serde_json::from_str(&body)?),
                None => Err(MarketError::NotFound {
                    namespace: ns.clone(),
                    id: id.to_string(),
                }),
            }
        })
        .await
    }

    async fn find_all(&self, ns: &Namespace, limit: u32) -> Result<Vec<Value>> {
        debug!("find all {ns} limit={limit}");
        self.bounded(async {
            let rows: Vec<(String,)> = sqlx::query_as(
                r#"
                SELECT body FROM documents
                WHERE  database_name = ?1 AND collection_name = ?2
                ORDER  BY row_id ASC
                LIMIT  ?3
                "#,
            )
            .bind(&ns.database)
            .bind(&ns.collection)
            // SQLite treats a negative LIMIT as unbounded.
            .bind(if limit == 0 { -1 } else { i64::from(limit) })
            .fetch_all(&self.pool)
            .await?;

            rows.iter()
                .map(|(body,)| serde_json::from_str(body).map_err(MarketError::from))
                .collect()
        })
        .await
    }
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}
