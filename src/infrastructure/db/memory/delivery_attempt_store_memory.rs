use crate::infrastructure::db::dto::{DeliveryAttemptQuery, DeliveryAttemptRow, DeliveryStatsRow};
use crate::infrastructure::db::stores::delivery_attempt_store::{
    DeliveryAttemptRepositoryError, DeliveryAttemptStore,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use time::OffsetDateTime;

type AttemptRows = HashMap<uuid::Uuid, DeliveryAttemptRow>;

/// Process-local attempt store for dev mode and tests.
#[derive(Default)]
pub struct DeliveryAttemptStoreMemory {
    rows: Mutex<AttemptRows>,
}

impl DeliveryAttemptStoreMemory {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> Result<MutexGuard<'_, AttemptRows>, DeliveryAttemptRepositoryError> {
        self.rows
            .lock()
            .map_err(|_| DeliveryAttemptRepositoryError::StorageUnavailable)
    }

    fn occupies_chain_position(rows: &AttemptRows, row: &DeliveryAttemptRow) -> bool {
        rows.values().any(|stored| {
            stored.id == row.id
                || (stored.endpoint_id == row.endpoint_id
                    && stored.event_id == row.event_id
                    && stored.attempt_number == row.attempt_number)
        })
    }

    fn insert_locked(
        rows: &mut AttemptRows,
        row: &DeliveryAttemptRow,
    ) -> Result<DeliveryAttemptRow, DeliveryAttemptRepositoryError> {
        if Self::occupies_chain_position(rows, row) {
            return Err(DeliveryAttemptRepositoryError::Conflict);
        }
        rows.insert(row.id, row.clone());
        Ok(row.clone())
    }

    fn complete_locked(
        rows: &mut AttemptRows,
        row: &DeliveryAttemptRow,
    ) -> Result<DeliveryAttemptRow, DeliveryAttemptRepositoryError> {
        let Some(stored) = rows.get_mut(&row.id) else {
            return Err(DeliveryAttemptRepositoryError::NotFound);
        };
        if !stored.is_pending() {
            return Err(DeliveryAttemptRepositoryError::Conflict);
        }
        stored.status = row.status.clone();
        stored.signature = row.signature.clone();
        stored.http_status_code = row.http_status_code;
        stored.response_snippet = row.response_snippet.clone();
        stored.error_kind = row.error_kind.clone();
        stored.error_message = row.error_message.clone();
        stored.completed_at = row.completed_at;
        Ok(stored.clone())
    }
}

#[async_trait]
impl DeliveryAttemptStore for DeliveryAttemptStoreMemory {
    async fn get(
        &self,
        attempt_id: uuid::Uuid,
    ) -> Result<Option<DeliveryAttemptRow>, DeliveryAttemptRepositoryError> {
        Ok(self.rows()?.get(&attempt_id).cloned())
    }

    async fn insert(
        &self,
        row: &DeliveryAttemptRow,
    ) -> Result<DeliveryAttemptRow, DeliveryAttemptRepositoryError> {
        let mut rows = self.rows()?;
        Self::insert_locked(&mut rows, row)
    }

    async fn complete(
        &self,
        row: &DeliveryAttemptRow,
    ) -> Result<DeliveryAttemptRow, DeliveryAttemptRepositoryError> {
        let mut rows = self.rows()?;
        Self::complete_locked(&mut rows, row)
    }

    async fn complete_with_successor(
        &self,
        row: &DeliveryAttemptRow,
        next: &DeliveryAttemptRow,
    ) -> Result<DeliveryAttemptRow, DeliveryAttemptRepositoryError> {
        let mut rows = self.rows()?;
        // Step 1: Validate both writes before touching anything.
        match rows.get(&row.id) {
            None => return Err(DeliveryAttemptRepositoryError::NotFound),
            Some(current) if !current.is_pending() => {
                return Err(DeliveryAttemptRepositoryError::Conflict);
            }
            Some(_) => {}
        }
        if Self::occupies_chain_position(&rows, next) {
            return Err(DeliveryAttemptRepositoryError::Conflict);
        }

        // Step 2: Apply both writes under the same lock.
        Self::complete_locked(&mut rows, row)?;
        Self::insert_locked(&mut rows, next)
    }

    async fn list(
        &self,
        query: &DeliveryAttemptQuery,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<DeliveryAttemptRow>, DeliveryAttemptRepositoryError> {
        let mut rows: Vec<_> = self
            .rows()?
            .values()
            .filter(|row| query.matches(row))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.attempt_number.cmp(&a.attempt_number))
        });
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(
        &self,
        query: &DeliveryAttemptQuery,
    ) -> Result<i64, DeliveryAttemptRepositoryError> {
        Ok(self.rows()?.values().filter(|row| query.matches(row)).count() as i64)
    }

    async fn list_chain(
        &self,
        endpoint_id: uuid::Uuid,
        event_id: uuid::Uuid,
    ) -> Result<Vec<DeliveryAttemptRow>, DeliveryAttemptRepositoryError> {
        let mut rows: Vec<_> = self
            .rows()?
            .values()
            .filter(|row| row.endpoint_id == endpoint_id && row.event_id == event_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.attempt_number);
        Ok(rows)
    }

    async fn claim(
        &self,
        attempt_id: uuid::Uuid,
        now: OffsetDateTime,
        lease_expires_at: OffsetDateTime,
    ) -> Result<Option<DeliveryAttemptRow>, DeliveryAttemptRepositoryError> {
        let mut rows = self.rows()?;
        match rows.get_mut(&attempt_id) {
            Some(row) if row.is_claimable(now) => {
                row.lease_expires_at = Some(lease_expires_at);
                Ok(Some(row.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn claim_stale_pending(
        &self,
        before: OffsetDateTime,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<DeliveryAttemptRow>, DeliveryAttemptRepositoryError> {
        let mut rows = self.rows()?;
        let mut stale: Vec<_> = rows
            .values()
            .filter(|row| {
                row.is_claimable(now) && row.scheduled_at <= before && row.enqueued_at <= before
            })
            .map(|row| (row.scheduled_at, row.id))
            .collect();
        stale.sort();
        stale.truncate(limit as usize);

        let mut claimed = Vec::with_capacity(stale.len());
        for (_, id) in stale {
            if let Some(row) = rows.get_mut(&id) {
                row.enqueued_at = now;
                claimed.push(row.clone());
            }
        }
        Ok(claimed)
    }

    async fn stats(
        &self,
        endpoint_id: uuid::Uuid,
        since: OffsetDateTime,
    ) -> Result<DeliveryStatsRow, DeliveryAttemptRepositoryError> {
        let rows = self.rows()?;
        let mut stats = DeliveryStatsRow::default();
        for row in rows
            .values()
            .filter(|row| row.endpoint_id == endpoint_id && row.created_at >= since)
        {
            stats.total += 1;
            match row.status.as_str() {
                "success" => stats.successful += 1,
                "failed" | "exhausted" => stats.failed += 1,
                _ => {}
            }
        }
        Ok(stats)
    }

    async fn delete_completed_before(
        &self,
        cutoff: OffsetDateTime,
    ) -> Result<u64, DeliveryAttemptRepositoryError> {
        let mut rows = self.rows()?;
        let before = rows.len();
        rows.retain(|_, row| row.is_pending() || row.created_at >= cutoff);
        Ok((before - rows.len()) as u64)
    }
}
