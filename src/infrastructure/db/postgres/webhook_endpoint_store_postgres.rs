use crate::infrastructure::db::dto::WebhookEndpointRow;
use crate::infrastructure::db::postgres::PostgresDatabase;
use crate::infrastructure::db::stores::webhook_endpoint_store::{
    WebhookEndpointRepositoryError, WebhookEndpointStore,
};
use async_trait::async_trait;
use sqlx::PgConnection;
use time::OffsetDateTime;

macro_rules! endpoint_columns {
    () => {
        "id,
        owner_id,
        name,
        url,
        secret,
        events,
        is_active,
        failure_count,
        last_success_at,
        last_failure_at,
        created_at,
        updated_at"
    };
}

#[derive(Clone)]
pub struct WebhookEndpointStorePostgres {
    db: std::sync::Arc<PostgresDatabase>,
}

impl WebhookEndpointStorePostgres {
    /// Build a Postgres-backed webhook endpoint store.
    pub fn new(db: std::sync::Arc<PostgresDatabase>) -> Self {
        Self { db }
    }

    async fn get_impl_conn(
        conn: &mut PgConnection,
        endpoint_id: uuid::Uuid,
    ) -> Result<Option<WebhookEndpointRow>, WebhookEndpointRepositoryError> {
        let row = sqlx::query_as::<_, WebhookEndpointRow>(concat!(
            "SELECT ",
            endpoint_columns!(),
            " FROM webhook_endpoints WHERE id = $1"
        ))
        .bind(endpoint_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| WebhookEndpointRepositoryError::StorageUnavailable)?;

        Ok(row)
    }

    async fn list_by_owner_impl_conn(
        conn: &mut PgConnection,
        owner_id: uuid::Uuid,
    ) -> Result<Vec<WebhookEndpointRow>, WebhookEndpointRepositoryError> {
        let rows = sqlx::query_as::<_, WebhookEndpointRow>(concat!(
            "SELECT ",
            endpoint_columns!(),
            " FROM webhook_endpoints
            WHERE owner_id = $1
            ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(|_| WebhookEndpointRepositoryError::StorageUnavailable)?;

        Ok(rows)
    }

    async fn list_subscribed_impl_conn(
        conn: &mut PgConnection,
        owner_id: uuid::Uuid,
        event_type: String,
        max_consecutive_failures: i32,
    ) -> Result<Vec<WebhookEndpointRow>, WebhookEndpointRepositoryError> {
        let rows = sqlx::query_as::<_, WebhookEndpointRow>(concat!(
            "SELECT ",
            endpoint_columns!(),
            " FROM webhook_endpoints
            WHERE owner_id = $1
              AND is_active
              AND failure_count < $3
              AND $2 = ANY(events)
            ORDER BY created_at ASC"
        ))
        .bind(owner_id)
        .bind(event_type)
        .bind(max_consecutive_failures)
        .fetch_all(&mut *conn)
        .await
        .map_err(|_| WebhookEndpointRepositoryError::StorageUnavailable)?;

        Ok(rows)
    }

    async fn insert_impl_conn(
        conn: &mut PgConnection,
        row: &WebhookEndpointRow,
    ) -> Result<WebhookEndpointRow, WebhookEndpointRepositoryError> {
        let stored = sqlx::query_as::<_, WebhookEndpointRow>(concat!(
            "INSERT INTO webhook_endpoints (",
            endpoint_columns!(),
            ")
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
            ON CONFLICT DO NOTHING
            RETURNING ",
            endpoint_columns!()
        ))
        .bind(row.id)
        .bind(row.owner_id)
        .bind(&row.name)
        .bind(&row.url)
        .bind(&row.secret)
        .bind(&row.events)
        .bind(row.is_active)
        .bind(row.failure_count)
        .bind(row.last_success_at)
        .bind(row.last_failure_at)
        .bind(row.created_at)
        .bind(row.updated_at)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| WebhookEndpointRepositoryError::StorageUnavailable)?;

        match stored {
            Some(row) => Ok(row),
            None => Err(WebhookEndpointRepositoryError::Conflict),
        }
    }

    async fn update_impl_conn(
        conn: &mut PgConnection,
        row: &WebhookEndpointRow,
    ) -> Result<WebhookEndpointRow, WebhookEndpointRepositoryError> {
        let stored = sqlx::query_as::<_, WebhookEndpointRow>(concat!(
            "UPDATE webhook_endpoints SET
                name = $2,
                url = $3,
                secret = $4,
                events = $5,
                is_active = $6,
                updated_at = $7
            WHERE id = $1
            RETURNING ",
            endpoint_columns!()
        ))
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.url)
        .bind(&row.secret)
        .bind(&row.events)
        .bind(row.is_active)
        .bind(row.updated_at)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| WebhookEndpointRepositoryError::StorageUnavailable)?;

        match stored {
            Some(row) => Ok(row),
            None => Err(WebhookEndpointRepositoryError::NotFound),
        }
    }

    async fn record_outcome_impl_conn(
        conn: &mut PgConnection,
        endpoint_id: uuid::Uuid,
        succeeded: bool,
        at: OffsetDateTime,
    ) -> Result<(), WebhookEndpointRepositoryError> {
        let query = if succeeded {
            "UPDATE webhook_endpoints
            SET failure_count = 0, last_success_at = $2
            WHERE id = $1"
        } else {
            "UPDATE webhook_endpoints
            SET failure_count = failure_count + 1, last_failure_at = $2
            WHERE id = $1"
        };
        let result = sqlx::query(query)
            .bind(endpoint_id)
            .bind(at)
            .execute(&mut *conn)
            .await
            .map_err(|_| WebhookEndpointRepositoryError::StorageUnavailable)?;

        if result.rows_affected() == 0 {
            return Err(WebhookEndpointRepositoryError::NotFound);
        }

        Ok(())
    }

    async fn reset_failures_impl_conn(
        conn: &mut PgConnection,
        endpoint_id: uuid::Uuid,
    ) -> Result<(), WebhookEndpointRepositoryError> {
        let result = sqlx::query("UPDATE webhook_endpoints SET failure_count = 0 WHERE id = $1")
            .bind(endpoint_id)
            .execute(&mut *conn)
            .await
            .map_err(|_| WebhookEndpointRepositoryError::StorageUnavailable)?;

        if result.rows_affected() == 0 {
            return Err(WebhookEndpointRepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_impl_conn(
        conn: &mut PgConnection,
        endpoint_id: uuid::Uuid,
    ) -> Result<(), WebhookEndpointRepositoryError> {
        let result = sqlx::query("DELETE FROM webhook_endpoints WHERE id = $1")
            .bind(endpoint_id)
            .execute(&mut *conn)
            .await
            .map_err(|_| WebhookEndpointRepositoryError::StorageUnavailable)?;

        if result.rows_affected() == 0 {
            return Err(WebhookEndpointRepositoryError::NotFound);
        }

        Ok(())
    }
}

#[async_trait]
impl WebhookEndpointStore for WebhookEndpointStorePostgres {
    async fn get(
        &self,
        endpoint_id: uuid::Uuid,
    ) -> Result<Option<WebhookEndpointRow>, WebhookEndpointRepositoryError> {
        self.db
            .with_conn(move |conn| Box::pin(Self::get_impl_conn(conn, endpoint_id)))
            .await
    }

    async fn list_by_owner(
        &self,
        owner_id: uuid::Uuid,
    ) -> Result<Vec<WebhookEndpointRow>, WebhookEndpointRepositoryError> {
        self.db
            .with_conn(move |conn| Box::pin(Self::list_by_owner_impl_conn(conn, owner_id)))
            .await
    }

    async fn list_subscribed(
        &self,
        owner_id: uuid::Uuid,
        event_type: &str,
        max_consecutive_failures: i32,
    ) -> Result<Vec<WebhookEndpointRow>, WebhookEndpointRepositoryError> {
        let event_type = event_type.to_string();
        self.db
            .with_conn(move |conn| {
                Box::pin(Self::list_subscribed_impl_conn(
                    conn,
                    owner_id,
                    event_type,
                    max_consecutive_failures,
                ))
            })
            .await
    }

    async fn insert(
        &self,
        row: &WebhookEndpointRow,
    ) -> Result<WebhookEndpointRow, WebhookEndpointRepositoryError> {
        let row = row.clone();
        self.db
            .with_conn(move |conn| {
                let row = row;
                Box::pin(async move { Self::insert_impl_conn(conn, &row).await })
            })
            .await
    }

    async fn update(
        &self,
        row: &WebhookEndpointRow,
    ) -> Result<WebhookEndpointRow, WebhookEndpointRepositoryError> {
        let row = row.clone();
        self.db
            .with_conn(move |conn| {
                let row = row;
                Box::pin(async move { Self::update_impl_conn(conn, &row).await })
            })
            .await
    }

    async fn record_outcome(
        &self,
        endpoint_id: uuid::Uuid,
        succeeded: bool,
        at: OffsetDateTime,
    ) -> Result<(), WebhookEndpointRepositoryError> {
        self.db
            .with_conn(move |conn| {
                Box::pin(Self::record_outcome_impl_conn(
                    conn,
                    endpoint_id,
                    succeeded,
                    at,
                ))
            })
            .await
    }

    async fn reset_failures(
        &self,
        endpoint_id: uuid::Uuid,
    ) -> Result<(), WebhookEndpointRepositoryError> {
        self.db
            .with_conn(move |conn| Box::pin(Self::reset_failures_impl_conn(conn, endpoint_id)))
            .await
    }

    async fn delete(&self, endpoint_id: uuid::Uuid) -> Result<(), WebhookEndpointRepositoryError> {
        self.db
            .with_conn(move |conn| Box::pin(Self::delete_impl_conn(conn, endpoint_id)))
            .await
    }
}
