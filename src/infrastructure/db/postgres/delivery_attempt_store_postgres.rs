use crate::infrastructure::db::dto::{DeliveryAttemptQuery, DeliveryAttemptRow, DeliveryStatsRow};
use crate::infrastructure::db::postgres::PostgresDatabase;
use crate::infrastructure::db::stores::delivery_attempt_store::{
    DeliveryAttemptRepositoryError, DeliveryAttemptStore,
};
use async_trait::async_trait;
use sqlx::PgConnection;
use time::OffsetDateTime;

macro_rules! attempt_columns {
    () => {
        "id,
        endpoint_id,
        owner_id,
        event_id,
        event_type,
        attempt_number,
        status,
        payload,
        signature,
        http_status_code,
        response_snippet,
        error_kind,
        error_message,
        scheduled_at,
        completed_at,
        created_at,
        enqueued_at,
        lease_expires_at"
    };
}

macro_rules! attempt_filter {
    () => {
        " WHERE owner_id = $1
          AND ($2::uuid IS NULL OR endpoint_id = $2)
          AND ($3::text IS NULL OR status = $3)
          AND ($4::text IS NULL OR event_type = $4)"
    };
}

#[derive(Clone)]
pub struct DeliveryAttemptStorePostgres {
    db: std::sync::Arc<PostgresDatabase>,
}

impl DeliveryAttemptStorePostgres {
    /// Build a Postgres-backed delivery attempt store.
    pub fn new(db: std::sync::Arc<PostgresDatabase>) -> Self {
        Self { db }
    }

    async fn get_impl_conn(
        conn: &mut PgConnection,
        attempt_id: uuid::Uuid,
    ) -> Result<Option<DeliveryAttemptRow>, DeliveryAttemptRepositoryError> {
        let row = sqlx::query_as::<_, DeliveryAttemptRow>(concat!(
            "SELECT ",
            attempt_columns!(),
            " FROM delivery_attempts WHERE id = $1"
        ))
        .bind(attempt_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| DeliveryAttemptRepositoryError::StorageUnavailable)?;

        Ok(row)
    }

    async fn insert_impl_conn(
        conn: &mut PgConnection,
        row: &DeliveryAttemptRow,
    ) -> Result<DeliveryAttemptRow, DeliveryAttemptRepositoryError> {
        let stored = sqlx::query_as::<_, DeliveryAttemptRow>(concat!(
            "INSERT INTO delivery_attempts (",
            attempt_columns!(),
            ")
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18)
            ON CONFLICT DO NOTHING
            RETURNING ",
            attempt_columns!()
        ))
        .bind(row.id)
        .bind(row.endpoint_id)
        .bind(row.owner_id)
        .bind(row.event_id)
        .bind(&row.event_type)
        .bind(row.attempt_number)
        .bind(&row.status)
        .bind(&row.payload)
        .bind(&row.signature)
        .bind(row.http_status_code)
        .bind(&row.response_snippet)
        .bind(&row.error_kind)
        .bind(&row.error_message)
        .bind(row.scheduled_at)
        .bind(row.completed_at)
        .bind(row.created_at)
        .bind(row.enqueued_at)
        .bind(row.lease_expires_at)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| DeliveryAttemptRepositoryError::StorageUnavailable)?;

        match stored {
            Some(row) => Ok(row),
            None => Err(DeliveryAttemptRepositoryError::Conflict),
        }
    }

    async fn complete_impl_conn(
        conn: &mut PgConnection,
        row: &DeliveryAttemptRow,
    ) -> Result<DeliveryAttemptRow, DeliveryAttemptRepositoryError> {
        let stored = sqlx::query_as::<_, DeliveryAttemptRow>(concat!(
            "UPDATE delivery_attempts SET
                status = $2,
                signature = $3,
                http_status_code = $4,
                response_snippet = $5,
                error_kind = $6,
                error_message = $7,
                completed_at = $8
            WHERE id = $1 AND status = 'pending'
            RETURNING ",
            attempt_columns!()
        ))
        .bind(row.id)
        .bind(&row.status)
        .bind(&row.signature)
        .bind(row.http_status_code)
        .bind(&row.response_snippet)
        .bind(&row.error_kind)
        .bind(&row.error_message)
        .bind(row.completed_at)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| DeliveryAttemptRepositoryError::StorageUnavailable)?;

        match stored {
            Some(row) => Ok(row),
            None => Err(DeliveryAttemptRepositoryError::Conflict),
        }
    }

    async fn list_impl_conn(
        conn: &mut PgConnection,
        query: &DeliveryAttemptQuery,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<DeliveryAttemptRow>, DeliveryAttemptRepositoryError> {
        let rows = sqlx::query_as::<_, DeliveryAttemptRow>(concat!(
            "SELECT ",
            attempt_columns!(),
            " FROM delivery_attempts",
            attempt_filter!(),
            " ORDER BY created_at DESC, attempt_number DESC
            LIMIT $5 OFFSET $6"
        ))
        .bind(query.owner_id)
        .bind(query.endpoint_id)
        .bind(&query.status)
        .bind(&query.event_type)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&mut *conn)
        .await
        .map_err(|_| DeliveryAttemptRepositoryError::StorageUnavailable)?;

        Ok(rows)
    }

    async fn count_impl_conn(
        conn: &mut PgConnection,
        query: &DeliveryAttemptQuery,
    ) -> Result<i64, DeliveryAttemptRepositoryError> {
        let total = sqlx::query_scalar::<_, i64>(concat!(
            "SELECT COUNT(*) FROM delivery_attempts",
            attempt_filter!()
        ))
        .bind(query.owner_id)
        .bind(query.endpoint_id)
        .bind(&query.status)
        .bind(&query.event_type)
        .fetch_one(&mut *conn)
        .await
        .map_err(|_| DeliveryAttemptRepositoryError::StorageUnavailable)?;

        Ok(total)
    }

    async fn list_chain_impl_conn(
        conn: &mut PgConnection,
        endpoint_id: uuid::Uuid,
        event_id: uuid::Uuid,
    ) -> Result<Vec<DeliveryAttemptRow>, DeliveryAttemptRepositoryError> {
        let rows = sqlx::query_as::<_, DeliveryAttemptRow>(concat!(
            "SELECT ",
            attempt_columns!(),
            " FROM delivery_attempts
            WHERE endpoint_id = $1 AND event_id = $2
            ORDER BY attempt_number ASC"
        ))
        .bind(endpoint_id)
        .bind(event_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(|_| DeliveryAttemptRepositoryError::StorageUnavailable)?;

        Ok(rows)
    }

    async fn claim_impl_conn(
        conn: &mut PgConnection,
        attempt_id: uuid::Uuid,
        now: OffsetDateTime,
        lease_expires_at: OffsetDateTime,
    ) -> Result<Option<DeliveryAttemptRow>, DeliveryAttemptRepositoryError> {
        let row = sqlx::query_as::<_, DeliveryAttemptRow>(concat!(
            "UPDATE delivery_attempts
            SET lease_expires_at = $3
            WHERE id = $1
              AND status = 'pending'
              AND (lease_expires_at IS NULL OR lease_expires_at <= $2)
            RETURNING ",
            attempt_columns!()
        ))
        .bind(attempt_id)
        .bind(now)
        .bind(lease_expires_at)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|_| DeliveryAttemptRepositoryError::StorageUnavailable)?;

        Ok(row)
    }

    async fn claim_stale_pending_impl_conn(
        conn: &mut PgConnection,
        before: OffsetDateTime,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<DeliveryAttemptRow>, DeliveryAttemptRepositoryError> {
        // Step 1: Stamp the overdue rows in one statement; concurrent sweeps skip locked rows.
        let mut rows = sqlx::query_as::<_, DeliveryAttemptRow>(concat!(
            "WITH stale AS (
                SELECT id
                FROM delivery_attempts
                WHERE status = 'pending'
                  AND scheduled_at <= $1
                  AND enqueued_at <= $1
                  AND (lease_expires_at IS NULL OR lease_expires_at <= $2)
                ORDER BY scheduled_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT $3
            )
            UPDATE delivery_attempts
            SET enqueued_at = $2
            WHERE id IN (SELECT id FROM stale)
            RETURNING ",
            attempt_columns!()
        ))
        .bind(before)
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&mut *conn)
        .await
        .map_err(|_| DeliveryAttemptRepositoryError::StorageUnavailable)?;

        // Step 2: RETURNING has no order.
        rows.sort_by_key(|row| row.scheduled_at);
        Ok(rows)
    }

    async fn stats_impl_conn(
        conn: &mut PgConnection,
        endpoint_id: uuid::Uuid,
        since: OffsetDateTime,
    ) -> Result<DeliveryStatsRow, DeliveryAttemptRepositoryError> {
        let stats = sqlx::query_as::<_, DeliveryStatsRow>(
            "SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'success') AS successful,
                COUNT(*) FILTER (WHERE status IN ('failed', 'exhausted')) AS failed
            FROM delivery_attempts
            WHERE endpoint_id = $1 AND created_at >= $2",
        )
        .bind(endpoint_id)
        .bind(since)
        .fetch_one(&mut *conn)
        .await
        .map_err(|_| DeliveryAttemptRepositoryError::StorageUnavailable)?;

        Ok(stats)
    }

    async fn delete_completed_before_impl_conn(
        conn: &mut PgConnection,
        cutoff: OffsetDateTime,
    ) -> Result<u64, DeliveryAttemptRepositoryError> {
        let result = sqlx::query(
            "DELETE FROM delivery_attempts
            WHERE status <> 'pending' AND created_at < $1",
        )
        .bind(cutoff)
        .execute(&mut *conn)
        .await
        .map_err(|_| DeliveryAttemptRepositoryError::StorageUnavailable)?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl DeliveryAttemptStore for DeliveryAttemptStorePostgres {
    async fn get(
        &self,
        attempt_id: uuid::Uuid,
    ) -> Result<Option<DeliveryAttemptRow>, DeliveryAttemptRepositoryError> {
        self.db
            .with_conn(move |conn| Box::pin(Self::get_impl_conn(conn, attempt_id)))
            .await
    }

    async fn insert(
        &self,
        row: &DeliveryAttemptRow,
    ) -> Result<DeliveryAttemptRow, DeliveryAttemptRepositoryError> {
        let row = row.clone();
        self.db
            .with_conn(move |conn| {
                let row = row;
                Box::pin(async move { Self::insert_impl_conn(conn, &row).await })
            })
            .await
    }

    async fn complete(
        &self,
        row: &DeliveryAttemptRow,
    ) -> Result<DeliveryAttemptRow, DeliveryAttemptRepositoryError> {
        let row = row.clone();
        self.db
            .with_conn(move |conn| {
                let row = row;
                Box::pin(async move { Self::complete_impl_conn(conn, &row).await })
            })
            .await
    }

    async fn complete_with_successor(
        &self,
        row: &DeliveryAttemptRow,
        next: &DeliveryAttemptRow,
    ) -> Result<DeliveryAttemptRow, DeliveryAttemptRepositoryError> {
        let row = row.clone();
        let next = next.clone();
        self.db
            .with_tx(move |tx| {
                Box::pin(async move {
                    Self::complete_impl_conn(&mut *tx, &row).await?;
                    Self::insert_impl_conn(&mut *tx, &next).await
                })
            })
            .await
    }

    async fn list(
        &self,
        query: &DeliveryAttemptQuery,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<DeliveryAttemptRow>, DeliveryAttemptRepositoryError> {
        let query = query.clone();
        self.db
            .with_conn(move |conn| {
                let query = query;
                Box::pin(async move { Self::list_impl_conn(conn, &query, limit, offset).await })
            })
            .await
    }

    async fn count(
        &self,
        query: &DeliveryAttemptQuery,
    ) -> Result<i64, DeliveryAttemptRepositoryError> {
        let query = query.clone();
        self.db
            .with_conn(move |conn| {
                let query = query;
                Box::pin(async move { Self::count_impl_conn(conn, &query).await })
            })
            .await
    }

    async fn list_chain(
        &self,
        endpoint_id: uuid::Uuid,
        event_id: uuid::Uuid,
    ) -> Result<Vec<DeliveryAttemptRow>, DeliveryAttemptRepositoryError> {
        self.db
            .with_conn(move |conn| {
                Box::pin(Self::list_chain_impl_conn(conn, endpoint_id, event_id))
            })
            .await
    }

    async fn claim(
        &self,
        attempt_id: uuid::Uuid,
        now: OffsetDateTime,
        lease_expires_at: OffsetDateTime,
    ) -> Result<Option<DeliveryAttemptRow>, DeliveryAttemptRepositoryError> {
        self.db
            .with_conn(move |conn| {
                Box::pin(Self::claim_impl_conn(conn, attempt_id, now, lease_expires_at))
            })
            .await
    }

    async fn claim_stale_pending(
        &self,
        before: OffsetDateTime,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<DeliveryAttemptRow>, DeliveryAttemptRepositoryError> {
        self.db
            .with_conn(move |conn| {
                Box::pin(Self::claim_stale_pending_impl_conn(conn, before, now, limit))
            })
            .await
    }

    async fn stats(
        &self,
        endpoint_id: uuid::Uuid,
        since: OffsetDateTime,
    ) -> Result<DeliveryStatsRow, DeliveryAttemptRepositoryError> {
        self.db
            .with_conn(move |conn| Box::pin(Self::stats_impl_conn(conn, endpoint_id, since)))
            .await
    }

    async fn delete_completed_before(
        &self,
        cutoff: OffsetDateTime,
    ) -> Result<u64, DeliveryAttemptRepositoryError> {
        self.db
            .with_conn(move |conn| {
                Box::pin(Self::delete_completed_before_impl_conn(conn, cutoff))
            })
            .await
    }
}
