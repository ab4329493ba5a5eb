use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct DispatchEventRequest {
    pub event_type: String,
    /// Defaults to the calling owner; any other tenant is refused.
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub payload: Value,
    pub event_id: Option<String>,
    pub occurred_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DispatchEventResponse {
    pub event_id: String,
    pub attempt_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EventTypeResponse {
    pub event_type: &'static str,
    pub description: &'static str,
}
