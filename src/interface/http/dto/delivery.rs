use crate::domain::entities::delivery_attempt::DeliveryAttempt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub struct DeliveryListQuery {
    pub endpoint_id: Option<String>,
    pub status: Option<String>,
    pub event_type: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct DeliveryAttemptResponse {
    pub id: String,
    pub endpoint_id: String,
    pub event_id: String,
    pub event_type: &'static str,
    pub attempt_number: u32,
    pub status: &'static str,
    pub http_status_code: Option<u16>,
    pub response_snippet: Option<String>,
    pub error_kind: Option<&'static str>,
    pub error_message: Option<String>,
    pub scheduled_at: String,
    pub completed_at: Option<String>,
    pub created_at: String,
    /// Only on the detail view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl DeliveryAttemptResponse {
    pub fn summary(attempt: &DeliveryAttempt) -> Self {
        Self {
            id: attempt.id.to_string(),
            endpoint_id: attempt.endpoint_id.to_string(),
            event_id: attempt.event_id.to_string(),
            event_type: attempt.event_type.as_str(),
            attempt_number: attempt.attempt_number,
            status: attempt.status.as_str(),
            http_status_code: attempt.http_status_code,
            response_snippet: attempt.response_snippet.clone(),
            error_kind: attempt.error_kind.map(|k| k.as_str()),
            error_message: attempt.error_message.clone(),
            scheduled_at: attempt.scheduled_at.to_rfc3339(),
            completed_at: attempt.completed_at.map(|t| t.to_rfc3339()),
            created_at: attempt.created_at.to_rfc3339(),
            payload: None,
            signature: None,
        }
    }

    pub fn detail(attempt: &DeliveryAttempt) -> Self {
        Self {
            payload: Some(attempt.payload.clone()),
            signature: attempt.signature.clone(),
            ..Self::summary(attempt)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeliveryListResponse {
    pub items: Vec<DeliveryAttemptResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}
