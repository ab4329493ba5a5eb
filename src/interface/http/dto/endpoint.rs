use crate::application::usecases::get_endpoint::EndpointDetails;
use crate::application::usecases::send_test_webhook::SendTestWebhookResult;
use crate::domain::entities::webhook_endpoint::WebhookEndpoint;
use serde::{Deserialize, Serialize};

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct RegisterEndpointRequest {
    pub name: String,
    pub url: String,
    pub events: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEndpointRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestWebhookRequest {
    pub event: Option<String>,
}

/// Endpoint as shown in listings. The secret is only returned on create and rotate.
#[derive(Debug, Serialize)]
pub struct EndpointResponse {
    pub id: String,
    pub name: String,
    pub url: String,
    pub events: Vec<&'static str>,
    pub is_active: bool,
    pub failure_count: u32,
    pub last_success_at: Option<String>,
    pub last_failure_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&WebhookEndpoint> for EndpointResponse {
    fn from(endpoint: &WebhookEndpoint) -> Self {
        Self {
            id: endpoint.id.to_string(),
            name: endpoint.name.clone(),
            url: endpoint.url.clone(),
            events: endpoint
                .subscribed_event_types
                .iter()
                .map(|e| e.as_str())
                .collect(),
            is_active: endpoint.is_active,
            failure_count: endpoint.failure_count,
            last_success_at: endpoint.last_success_at.map(|t| t.to_rfc3339()),
            last_failure_at: endpoint.last_failure_at.map(|t| t.to_rfc3339()),
            created_at: endpoint.created_at.to_rfc3339(),
            updated_at: endpoint.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EndpointWithSecretResponse {
    #[serde(flatten)]
    pub endpoint: EndpointResponse,
    pub secret: String,
}

impl From<&WebhookEndpoint> for EndpointWithSecretResponse {
    fn from(endpoint: &WebhookEndpoint) -> Self {
        Self {
            endpoint: endpoint.into(),
            secret: endpoint.secret.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EndpointStatsResponse {
    pub total_24h: u64,
    pub successful_24h: u64,
    pub failed_24h: u64,
}

#[derive(Debug, Serialize)]
pub struct EndpointDetailResponse {
    #[serde(flatten)]
    pub endpoint: EndpointResponse,
    pub stats: EndpointStatsResponse,
}

impl From<&EndpointDetails> for EndpointDetailResponse {
    fn from(details: &EndpointDetails) -> Self {
        Self {
            endpoint: (&details.endpoint).into(),
            stats: EndpointStatsResponse {
                total_24h: details.stats.total_24h,
                successful_24h: details.stats.successful_24h,
                failed_24h: details.stats.failed_24h,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TestWebhookResponse {
    pub success: bool,
    pub status_code: Option<u16>,
    pub response: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl From<SendTestWebhookResult> for TestWebhookResponse {
    fn from(result: SendTestWebhookResult) -> Self {
        Self {
            success: result.success,
            status_code: result.http_status,
            response: result.response_snippet,
            error: result.error,
            duration_ms: result.duration_ms,
        }
    }
}
