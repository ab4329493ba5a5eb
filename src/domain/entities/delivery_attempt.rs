use crate::domain::entities::domain_event::DomainEvent;
use crate::domain::entities::event_type::EventType;
use crate::domain::entities::webhook_endpoint::WebhookEndpoint;
use crate::domain::value_objects::ids::{AttemptId, EndpointId, EventId, OwnerId};
use crate::domain::value_objects::timestamps::Timestamp;
use crate::domain::workflows::attempt_state::{AttemptStateMachine, TransitionError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Success,
    Failed,
    Exhausted,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Success => "success",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Exhausted => "exhausted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(DeliveryStatus::Pending),
            "success" => Some(DeliveryStatus::Success),
            "failed" => Some(DeliveryStatus::Failed),
            "exhausted" => Some(DeliveryStatus::Exhausted),
            _ => None,
        }
    }
}

/// Why an attempt did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    Connection,
    HttpStatus,
    EndpointInactive,
    EndpointMissing,
    Serialization,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Connection => "connection",
            ErrorKind::HttpStatus => "http_status",
            ErrorKind::EndpointInactive => "endpoint_inactive",
            ErrorKind::EndpointMissing => "endpoint_missing",
            ErrorKind::Serialization => "serialization",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "timeout" => Some(ErrorKind::Timeout),
            "connection" => Some(ErrorKind::Connection),
            "http_status" => Some(ErrorKind::HttpStatus),
            "endpoint_inactive" => Some(ErrorKind::EndpointInactive),
            "endpoint_missing" => Some(ErrorKind::EndpointMissing),
            "serialization" => Some(ErrorKind::Serialization),
            _ => None,
        }
    }
}

/// What the receiver (or the lack of one) told us for a single attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttemptResult {
    pub http_status_code: Option<u16>,
    pub response_snippet: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
}

impl AttemptResult {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error_kind: Some(kind),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// One execution of a delivery. Chain identity is `(endpoint_id, event_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryAttempt {
    pub id: AttemptId,
    pub endpoint_id: EndpointId,
    pub owner_id: OwnerId,
    pub event_id: EventId,
    pub event_type: EventType,
    pub attempt_number: u32,
    pub status: DeliveryStatus,
    pub payload: Value,
    pub signature: Option<String>,
    pub http_status_code: Option<u16>,
    pub response_snippet: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub scheduled_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl DeliveryAttempt {
    /// Attempt #1 of a new chain, due immediately.
    pub fn first(endpoint: &WebhookEndpoint, event: &DomainEvent, now: Timestamp) -> Self {
        Self::pending(
            endpoint.id,
            endpoint.owner_id,
            event.event_id,
            event.event_type,
            1,
            event.envelope(),
            now,
            now,
        )
    }

    /// Successor in the same chain, carrying the same envelope.
    pub fn next_in_chain(&self, scheduled_at: Timestamp, now: Timestamp) -> Self {
        Self::pending(
            self.endpoint_id,
            self.owner_id,
            self.event_id,
            self.event_type,
            self.attempt_number + 1,
            self.payload.clone(),
            scheduled_at,
            now,
        )
    }

    /// Attempt #1 of a fresh chain replaying this attempt's data under a new event id.
    pub fn replay(&self, now: Timestamp) -> Self {
        let event_id = EventId::new();
        let mut payload = self.payload.clone();
        if let Some(map) = payload.as_object_mut() {
            map.insert(
                "event_id".to_string(),
                Value::String(event_id.to_string()),
            );
        }
        Self::pending(
            self.endpoint_id,
            self.owner_id,
            event_id,
            self.event_type,
            1,
            payload,
            now,
            now,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn pending(
        endpoint_id: EndpointId,
        owner_id: OwnerId,
        event_id: EventId,
        event_type: EventType,
        attempt_number: u32,
        payload: Value,
        scheduled_at: Timestamp,
        now: Timestamp,
    ) -> Self {
        Self {
            id: AttemptId::new(),
            endpoint_id,
            owner_id,
            event_id,
            event_type,
            attempt_number,
            status: DeliveryStatus::Pending,
            payload,
            signature: None,
            http_status_code: None,
            response_snippet: None,
            error_kind: None,
            error_message: None,
            scheduled_at,
            completed_at: None,
            created_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == DeliveryStatus::Pending
    }

    /// Record the outcome and move out of `pending`. Completed attempts never change again.
    pub fn complete(
        &mut self,
        status: DeliveryStatus,
        result: AttemptResult,
        now: Timestamp,
    ) -> Result<(), TransitionError> {
        self.status = AttemptStateMachine::transition(self.status, status)?;
        self.http_status_code = result.http_status_code;
        self.response_snippet = result.response_snippet;
        self.error_kind = result.error_kind;
        self.error_message = result.error_message;
        self.completed_at = Some(now);
        Ok(())
    }
}

/// Cut a response body down to at most `limit` characters.
pub fn response_snippet(body: &str, limit: usize) -> String {
    match body.char_indices().nth(limit) {
        Some((idx, _)) => body[..idx].to_string(),
        None => body.to_string(),
    }
}
