// Use case: send_test_webhook.

use crate::application::context::AppContext;
use crate::application::shared::outbound::{DeliveryHeaders, signed_request};
use crate::application::shared::ownership::{OwnedLookupError, owned_endpoint};
use crate::domain::entities::delivery_attempt::response_snippet;
use crate::domain::value_objects::ids::{EndpointId, EventId, OwnerId};
use crate::domain::value_objects::timestamps::Timestamp;
use crate::domain::workflows::delivery_outcome::{StatusClass, classify_status};
use serde_json::json;
use tracing::info;

const TEST_SNIPPET_LIMIT: usize = 500;

/// Sends one signed sample payload synchronously. Nothing is recorded or retried.
pub struct SendTestWebhookUseCase;

#[derive(Debug)]
pub enum SendTestWebhookError {
    NotFound,
    Validation(String),
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTestWebhookResult {
    pub success: bool,
    pub http_status: Option<u16>,
    pub response_snippet: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl SendTestWebhookUseCase {
    /// POST a `<event>.test` envelope to the endpoint. `event` defaults to `test`.
    pub async fn execute(
        ctx: &AppContext,
        owner_id: OwnerId,
        endpoint_id: EndpointId,
        event: Option<String>,
    ) -> Result<SendTestWebhookResult, SendTestWebhookError> {
        // Step 1: Load the owner's endpoint.
        let endpoint = owned_endpoint(ctx, owner_id, endpoint_id)
            .await
            .map_err(|e| match e {
                OwnedLookupError::NotFound => SendTestWebhookError::NotFound,
                OwnedLookupError::Storage(msg) => SendTestWebhookError::Storage(msg),
            })?;
        let event = event.unwrap_or_else(|| "test".to_string());
        let event = event.trim();
        if event.is_empty() || event.len() > 100 {
            return Err(SendTestWebhookError::Validation(
                "event must be 1 to 100 characters".to_string(),
            ));
        }
        let event_name = format!("{event}.test");

        // Step 2: Build and sign the sample envelope.
        let now = Timestamp::now_utc();
        let event_id = EventId::new();
        let envelope = json!({
            "event_id": event_id.to_string(),
            "event": event_name,
            "timestamp": now.to_rfc3339(),
            "data": {
                "test": true,
                "message": "This is a test webhook",
                "endpoint_id": endpoint.id.to_string(),
                "endpoint_name": endpoint.name,
            },
        });
        let body = serde_json::to_vec(&envelope)
            .map_err(|e| SendTestWebhookError::Validation(e.to_string()))?;
        let settings = &ctx.settings.webhook_delivery;
        let signed = signed_request(
            &endpoint.url,
            &endpoint.secret,
            body,
            DeliveryHeaders {
                event: &event_name,
                event_id: event_id.to_string(),
                delivery_id: "test".to_string(),
                attempt_number: 1,
            },
            settings,
            settings.test_timeout_ms,
            now,
        );

        // Step 3: Send and report what the receiver said.
        let started = std::time::Instant::now();
        let response = ctx.transport.post(signed.request).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        let result = match response {
            Ok(resp) => SendTestWebhookResult {
                success: classify_status(resp.status) == StatusClass::Success,
                http_status: Some(resp.status),
                response_snippet: Some(response_snippet(&resp.body, TEST_SNIPPET_LIMIT)),
                error: None,
                duration_ms,
            },
            Err(e) => SendTestWebhookResult {
                success: false,
                http_status: None,
                response_snippet: None,
                error: Some(e.to_string()),
                duration_ms,
            },
        };

        info!(
            endpoint_id = %endpoint.id,
            success = result.success,
            http_status = result.http_status,
            "webhook_test_sent"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::{SendTestWebhookError, SendTestWebhookUseCase};
    use crate::application::context::test_support::{harness, seed_endpoint};
    use crate::application::shared::outbound::{EVENT_HEADER, SIGNATURE_HEADER};
    use crate::domain::entities::event_type::EventType;
    use crate::domain::services::signer;
    use crate::domain::value_objects::ids::OwnerId;
    use crate::infrastructure::db::repositories::delivery_attempt_repository::DeliveryAttemptFilter;
    use crate::infrastructure::http::TransportError;

    #[tokio::test]
    async fn given_reachable_endpoint_when_tested_should_send_signed_sample_without_record() {
        let h = harness();
        let owner = OwnerId::new();
        let endpoint = seed_endpoint(&h.ctx, owner, &[EventType::CompanyCreated]).await;

        let result = SendTestWebhookUseCase::execute(
            &h.ctx,
            owner,
            endpoint.id,
            Some("company.created".to_string()),
        )
        .await
        .unwrap();

        assert!(result.success);
        assert_eq!(result.http_status, Some(200));
        let requests = h.transport.requests();
        let request = &requests[0];
        assert_eq!(request.header(EVENT_HEADER), Some("company.created.test"));
        assert_eq!(request.timeout, std::time::Duration::from_millis(10_000));
        let signature = request.header(SIGNATURE_HEADER).unwrap();
        assert!(signer::verify(&request.body, endpoint.secret.as_bytes(), signature));
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["data"]["test"], true);
        let total = h
            .ctx
            .repos
            .delivery_attempt
            .count(&DeliveryAttemptFilter::for_owner(owner))
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn given_timeout_when_tested_should_report_error() {
        let h = harness();
        let owner = OwnerId::new();
        let endpoint = seed_endpoint(&h.ctx, owner, &[EventType::CompanyCreated]).await;
        h.transport.push(Err(TransportError::Timeout));

        let result = SendTestWebhookUseCase::execute(&h.ctx, owner, endpoint.id, None)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.http_status, None);
        assert_eq!(result.error.as_deref(), Some("request timed out"));
        assert!(h.queue.jobs().is_empty());
    }

    #[tokio::test]
    async fn given_foreign_endpoint_when_tested_should_report_not_found() {
        let h = harness();
        let endpoint = seed_endpoint(&h.ctx, OwnerId::new(), &[EventType::CompanyCreated]).await;

        let err = SendTestWebhookUseCase::execute(&h.ctx, OwnerId::new(), endpoint.id, None)
            .await
            .unwrap_err();

        assert!(matches!(err, SendTestWebhookError::NotFound));
        assert!(h.transport.requests().is_empty());
    }
}
