use crate::infrastructure::db::dto::WebhookEndpointRow;
use crate::infrastructure::db::stores::webhook_endpoint_store::{
    WebhookEndpointRepositoryError, WebhookEndpointStore,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use time::OffsetDateTime;

/// Process-local endpoint store for dev mode and tests.
#[derive(Default)]
pub struct WebhookEndpointStoreMemory {
    rows: Mutex<HashMap<uuid::Uuid, WebhookEndpointRow>>,
}

impl WebhookEndpointStoreMemory {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<uuid::Uuid, WebhookEndpointRow>>, WebhookEndpointRepositoryError>
    {
        self.rows
            .lock()
            .map_err(|_| WebhookEndpointRepositoryError::StorageUnavailable)
    }
}

#[async_trait]
impl WebhookEndpointStore for WebhookEndpointStoreMemory {
    async fn get(
        &self,
        endpoint_id: uuid::Uuid,
    ) -> Result<Option<WebhookEndpointRow>, WebhookEndpointRepositoryError> {
        Ok(self.rows()?.get(&endpoint_id).cloned())
    }

    async fn list_by_owner(
        &self,
        owner_id: uuid::Uuid,
    ) -> Result<Vec<WebhookEndpointRow>, WebhookEndpointRepositoryError> {
        let mut rows: Vec<_> = self
            .rows()?
            .values()
            .filter(|row| row.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn list_subscribed(
        &self,
        owner_id: uuid::Uuid,
        event_type: &str,
        max_consecutive_failures: i32,
    ) -> Result<Vec<WebhookEndpointRow>, WebhookEndpointRepositoryError> {
        let mut rows: Vec<_> = self
            .rows()?
            .values()
            .filter(|row| {
                row.owner_id == owner_id
                    && row.is_active
                    && row.failure_count < max_consecutive_failures
                    && row.events.iter().any(|e| e == event_type)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.created_at);
        Ok(rows)
    }

    async fn insert(
        &self,
        row: &WebhookEndpointRow,
    ) -> Result<WebhookEndpointRow, WebhookEndpointRepositoryError> {
        let mut rows = self.rows()?;
        if rows.contains_key(&row.id) {
            return Err(WebhookEndpointRepositoryError::Conflict);
        }
        rows.insert(row.id, row.clone());
        Ok(row.clone())
    }

    async fn update(
        &self,
        row: &WebhookEndpointRow,
    ) -> Result<WebhookEndpointRow, WebhookEndpointRepositoryError> {
        let mut rows = self.rows()?;
        let Some(stored) = rows.get_mut(&row.id) else {
            return Err(WebhookEndpointRepositoryError::NotFound);
        };
        stored.name = row.name.clone();
        stored.url = row.url.clone();
        stored.secret = row.secret.clone();
        stored.events = row.events.clone();
        stored.is_active = row.is_active;
        stored.updated_at = row.updated_at;
        Ok(stored.clone())
    }

    async fn record_outcome(
        &self,
        endpoint_id: uuid::Uuid,
        succeeded: bool,
        at: OffsetDateTime,
    ) -> Result<(), WebhookEndpointRepositoryError> {
        let mut rows = self.rows()?;
        let Some(stored) = rows.get_mut(&endpoint_id) else {
            return Err(WebhookEndpointRepositoryError::NotFound);
        };
        if succeeded {
            stored.failure_count = 0;
            stored.last_success_at = Some(at);
        } else {
            stored.failure_count = stored.failure_count.saturating_add(1);
            stored.last_failure_at = Some(at);
        }
        Ok(())
    }

    async fn reset_failures(
        &self,
        endpoint_id: uuid::Uuid,
    ) -> Result<(), WebhookEndpointRepositoryError> {
        let mut rows = self.rows()?;
        let Some(stored) = rows.get_mut(&endpoint_id) else {
            return Err(WebhookEndpointRepositoryError::NotFound);
        };
        stored.failure_count = 0;
        Ok(())
    }

    async fn delete(&self, endpoint_id: uuid::Uuid) -> Result<(), WebhookEndpointRepositoryError> {
        match self.rows()?.remove(&endpoint_id) {
            Some(_) => Ok(()),
            None => Err(WebhookEndpointRepositoryError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(owner_id: uuid::Uuid, events: &[&str]) -> WebhookEndpointRow {
        let now = OffsetDateTime::now_utc();
        WebhookEndpointRow {
            id: uuid::Uuid::new_v4(),
            owner_id,
            name: "hook".to_string(),
            url: "https://example.com/hook".to_string(),
            secret: "ab".repeat(32),
            events: events.iter().map(|e| e.to_string()).collect(),
            is_active: true,
            failure_count: 0,
            last_success_at: None,
            last_failure_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn given_mixed_endpoints_when_list_subscribed_should_filter_owner_event_and_health() {
        let store = WebhookEndpointStoreMemory::new();
        let owner = uuid::Uuid::new_v4();
        let matching = row(owner, &["application.created"]);
        let mut inactive = row(owner, &["application.created"]);
        inactive.is_active = false;
        let mut failing = row(owner, &["application.created"]);
        failing.failure_count = 10;
        let other_event = row(owner, &["company.created"]);
        let other_owner = row(uuid::Uuid::new_v4(), &["application.created"]);
        for r in [&matching, &inactive, &failing, &other_event, &other_owner] {
            store.insert(r).await.unwrap();
        }

        let rows = store
            .list_subscribed(owner, "application.created", 10)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, matching.id);
    }

    #[tokio::test]
    async fn given_failures_then_success_when_recorded_should_reset_counter() {
        let store = WebhookEndpointStoreMemory::new();
        let row = row(uuid::Uuid::new_v4(), &["application.created"]);
        store.insert(&row).await.unwrap();
        let now = OffsetDateTime::now_utc();

        store.record_outcome(row.id, false, now).await.unwrap();
        store.record_outcome(row.id, false, now).await.unwrap();
        assert_eq!(store.get(row.id).await.unwrap().unwrap().failure_count, 2);

        store.record_outcome(row.id, true, now).await.unwrap();
        let stored = store.get(row.id).await.unwrap().unwrap();
        assert_eq!(stored.failure_count, 0);
        assert_eq!(stored.last_success_at, Some(now));
    }

    #[tokio::test]
    async fn given_failure_recorded_after_load_when_updated_should_keep_counter() {
        let store = WebhookEndpointStoreMemory::new();
        let row = row(uuid::Uuid::new_v4(), &["application.created"]);
        store.insert(&row).await.unwrap();
        let mut loaded = store.get(row.id).await.unwrap().unwrap();
        store
            .record_outcome(row.id, false, OffsetDateTime::now_utc())
            .await
            .unwrap();

        loaded.name = "renamed".to_string();
        let stored = store.update(&loaded).await.unwrap();

        assert_eq!(stored.name, "renamed");
        assert_eq!(stored.failure_count, 1);
        assert!(stored.last_failure_at.is_some());
    }

    #[tokio::test]
    async fn given_failing_endpoint_when_reset_should_clear_only_counter() {
        let store = WebhookEndpointStoreMemory::new();
        let row = row(uuid::Uuid::new_v4(), &["application.created"]);
        store.insert(&row).await.unwrap();
        let now = OffsetDateTime::now_utc();
        store.record_outcome(row.id, false, now).await.unwrap();

        store.reset_failures(row.id).await.unwrap();

        let stored = store.get(row.id).await.unwrap().unwrap();
        assert_eq!(stored.failure_count, 0);
        assert_eq!(stored.last_failure_at, Some(now));
        assert_eq!(
            store.reset_failures(uuid::Uuid::new_v4()).await,
            Err(WebhookEndpointRepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn given_missing_endpoint_when_deleted_should_return_not_found() {
        let store = WebhookEndpointStoreMemory::new();

        let result = store.delete(uuid::Uuid::new_v4()).await;

        assert_eq!(result, Err(WebhookEndpointRepositoryError::NotFound));
    }
}
