use crate::config::Db;
use crate::infrastructure::db::database::{Database, DatabaseError};
use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const SCHEMA: &str = include_str!("../../../../migrations/0001_webhooks.sql");

/// Shared pool for the endpoint and attempt stores.
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub async fn connect(settings: &Db) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections.max(1))
            .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms))
            .connect(&settings.url)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Create the webhook tables and indexes if they are missing.
    pub async fn apply_schema(&self) -> Result<(), DatabaseError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(())
    }

    /// Run store code on one pooled connection.
    pub async fn with_conn<T, E, F>(&self, f: F) -> Result<T, E>
    where
        for<'c> F: FnOnce(
            &'c mut sqlx::PgConnection,
        ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>,
        E: From<DatabaseError>,
    {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        f(&mut conn).await
    }

    /// Run store code in a transaction. Any `Err` rolls everything back.
    pub async fn with_tx<T, E, F>(&self, f: F) -> Result<T, E>
    where
        for<'c> F: FnOnce(
            &'c mut sqlx::Transaction<'_, sqlx::Postgres>,
        ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>,
        E: From<DatabaseError>,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| DatabaseError::Query(e.to_string()))?;
                Ok(value)
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn execute(&self, query: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
