// Use case: list_delivery_attempts.

use crate::application::context::AppContext;
use crate::domain::entities::delivery_attempt::{DeliveryAttempt, DeliveryStatus};
use crate::domain::entities::event_type::EventType;
use crate::domain::value_objects::ids::{EndpointId, OwnerId};
use crate::infrastructure::db::repositories::delivery_attempt_repository::DeliveryAttemptFilter;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pages through an owner's attempt history, newest first.
pub struct ListDeliveryAttemptsUseCase;

#[derive(Debug)]
pub enum ListDeliveryAttemptsError {
    Validation(String),
    Storage(String),
}

#[derive(Debug, Clone, Default)]
pub struct ListDeliveryAttemptsQuery {
    pub endpoint_id: Option<EndpointId>,
    pub status: Option<String>,
    pub event_type: Option<String>,
    /// 1-based.
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct DeliveryAttemptPage {
    pub items: Vec<DeliveryAttempt>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl ListDeliveryAttemptsUseCase {
    pub async fn execute(
        ctx: &AppContext,
        owner_id: OwnerId,
        query: ListDeliveryAttemptsQuery,
    ) -> Result<DeliveryAttemptPage, ListDeliveryAttemptsError> {
        // Step 1: Parse filters and paging.
        let status = query
            .status
            .as_deref()
            .map(|s| {
                DeliveryStatus::parse(s)
                    .ok_or_else(|| ListDeliveryAttemptsError::Validation(format!("unknown status: {s}")))
            })
            .transpose()?;
        let event_type = query
            .event_type
            .as_deref()
            .map(|e| {
                EventType::parse(e).map_err(|err| ListDeliveryAttemptsError::Validation(err.to_string()))
            })
            .transpose()?;
        let page = query.page.unwrap_or(1);
        if page == 0 {
            return Err(ListDeliveryAttemptsError::Validation(
                "page starts at 1".to_string(),
            ));
        }
        let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ListDeliveryAttemptsError::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        // Step 2: Load the page and the total under the same filter.
        let filter = DeliveryAttemptFilter {
            endpoint_id: query.endpoint_id,
            status,
            event_type,
            ..DeliveryAttemptFilter::for_owner(owner_id)
        };
        let offset = (page - 1).saturating_mul(page_size);
        let items = ctx
            .repos
            .delivery_attempt
            .list(&filter, page_size, offset)
            .await
            .map_err(|e| ListDeliveryAttemptsError::Storage(format!("{e:?}")))?;
        let total = ctx
            .repos
            .delivery_attempt
            .count(&filter)
            .await
            .map_err(|e| ListDeliveryAttemptsError::Storage(format!("{e:?}")))?;

        Ok(DeliveryAttemptPage {
            items,
            total,
            page,
            page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ListDeliveryAttemptsError, ListDeliveryAttemptsQuery, ListDeliveryAttemptsUseCase};
    use crate::application::context::test_support::{seed_endpoint, test_context};
    use crate::domain::entities::delivery_attempt::{AttemptResult, DeliveryAttempt, DeliveryStatus};
    use crate::domain::entities::domain_event::DomainEvent;
    use crate::domain::entities::event_type::EventType;
    use crate::domain::value_objects::ids::OwnerId;
    use crate::domain::value_objects::timestamps::Timestamp;
    use serde_json::json;
    use time::Duration;

    #[tokio::test]
    async fn given_mixed_history_when_filtered_and_paged_should_return_matching_page() {
        let ctx = test_context();
        let owner = OwnerId::new();
        let a = seed_endpoint(&ctx, owner, &[EventType::CompanyCreated]).await;
        let b = seed_endpoint(&ctx, owner, &[EventType::CompanyCreated]).await;
        let base = Timestamp::now_utc();
        for i in 0..5 {
            let event = DomainEvent::new(EventType::CompanyCreated, owner, json!({"i": i}));
            let at = base.plus(Duration::seconds(i));
            let mut attempt = DeliveryAttempt::first(&a, &event, at);
            if i % 2 == 0 {
                attempt.complete(DeliveryStatus::Failed, AttemptResult::default(), at).unwrap();
            }
            ctx.repos.delivery_attempt.insert(&attempt).await.unwrap();
        }
        let other = DomainEvent::new(EventType::CompanyCreated, owner, json!({}));
        ctx.repos
            .delivery_attempt
            .insert(&DeliveryAttempt::first(&b, &other, base))
            .await
            .unwrap();
        seed_other_owner(&ctx).await;

        let page = ListDeliveryAttemptsUseCase::execute(
            &ctx,
            owner,
            ListDeliveryAttemptsQuery {
                endpoint_id: Some(a.id),
                status: Some("failed".to_string()),
                page: Some(1),
                page_size: Some(2),
                ..ListDeliveryAttemptsQuery::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert!(page.items[0].created_at > page.items[1].created_at);
        assert!(page.items.iter().all(|i| i.endpoint_id == a.id));

        let all = ListDeliveryAttemptsUseCase::execute(&ctx, owner, ListDeliveryAttemptsQuery::default())
            .await
            .unwrap();
        assert_eq!(all.total, 6);
    }

    async fn seed_other_owner(ctx: &crate::application::context::AppContext) {
        let owner = OwnerId::new();
        let endpoint = seed_endpoint(ctx, owner, &[EventType::CompanyCreated]).await;
        let event = DomainEvent::new(EventType::CompanyCreated, owner, json!({}));
        ctx.repos
            .delivery_attempt
            .insert(&DeliveryAttempt::first(&endpoint, &event, Timestamp::now_utc()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn given_bad_filters_when_listed_should_fail_validation() {
        let ctx = test_context();
        let owner = OwnerId::new();

        for query in [
            ListDeliveryAttemptsQuery {
                status: Some("lost".to_string()),
                ..ListDeliveryAttemptsQuery::default()
            },
            ListDeliveryAttemptsQuery {
                event_type: Some("job.created".to_string()),
                ..ListDeliveryAttemptsQuery::default()
            },
            ListDeliveryAttemptsQuery {
                page_size: Some(101),
                ..ListDeliveryAttemptsQuery::default()
            },
            ListDeliveryAttemptsQuery {
                page: Some(0),
                ..ListDeliveryAttemptsQuery::default()
            },
        ] {
            let err = ListDeliveryAttemptsUseCase::execute(&ctx, owner, query)
                .await
                .unwrap_err();
            assert!(matches!(err, ListDeliveryAttemptsError::Validation(_)));
        }
    }
}
