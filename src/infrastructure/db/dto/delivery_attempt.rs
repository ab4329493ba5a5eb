use crate::domain::entities::delivery_attempt::{DeliveryAttempt, DeliveryStatus, ErrorKind};
use crate::domain::entities::event_type::EventType;
use crate::domain::value_objects::ids::{AttemptId, EndpointId, EventId, OwnerId};
use crate::domain::value_objects::timestamps::Timestamp;
use crate::infrastructure::db::dto::RowDecodeError;
use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DeliveryAttemptRow {
    pub id: uuid::Uuid,
    pub endpoint_id: uuid::Uuid,
    pub owner_id: uuid::Uuid,
    pub event_id: uuid::Uuid,
    pub event_type: String,
    pub attempt_number: i32,
    pub status: String,
    pub payload: serde_json::Value,
    pub signature: Option<String>,
    pub http_status_code: Option<i32>,
    pub response_snippet: Option<String>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    pub scheduled_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    /// Last time the attempt was handed to the queue.
    pub enqueued_at: OffsetDateTime,
    /// Set while a worker owns the attempt; a pending row with a live lease is in flight.
    pub lease_expires_at: Option<OffsetDateTime>,
}

/// Aggregate attempt counts for one endpoint over a time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct DeliveryStatsRow {
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
}

/// Row-level filter for attempt history listings. Always scoped to one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAttemptQuery {
    pub owner_id: uuid::Uuid,
    pub endpoint_id: Option<uuid::Uuid>,
    pub status: Option<String>,
    pub event_type: Option<String>,
}

impl DeliveryAttemptQuery {
    pub fn matches(&self, row: &DeliveryAttemptRow) -> bool {
        row.owner_id == self.owner_id
            && self.endpoint_id.is_none_or(|id| row.endpoint_id == id)
            && self.status.as_deref().is_none_or(|s| row.status == s)
            && self.event_type.as_deref().is_none_or(|e| row.event_type == e)
    }
}

impl DeliveryAttemptRow {
    pub fn from_attempt(attempt: &DeliveryAttempt) -> Self {
        Self {
            id: attempt.id.0,
            endpoint_id: attempt.endpoint_id.0,
            owner_id: attempt.owner_id.0,
            event_id: attempt.event_id.0,
            event_type: attempt.event_type.as_str().to_string(),
            attempt_number: attempt.attempt_number.min(i32::MAX as u32) as i32,
            status: attempt.status.as_str().to_string(),
            payload: attempt.payload.clone(),
            signature: attempt.signature.clone(),
            http_status_code: attempt.http_status_code.map(i32::from),
            response_snippet: attempt.response_snippet.clone(),
            error_kind: attempt.error_kind.map(|k| k.as_str().to_string()),
            error_message: attempt.error_message.clone(),
            scheduled_at: attempt.scheduled_at.as_inner(),
            completed_at: attempt.completed_at.map(|t| t.as_inner()),
            created_at: attempt.created_at.as_inner(),
            enqueued_at: attempt.created_at.as_inner(),
            lease_expires_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == DeliveryStatus::Pending.as_str()
    }

    /// Pending and not leased by a worker at `now`.
    pub fn is_claimable(&self, now: OffsetDateTime) -> bool {
        self.is_pending() && self.lease_expires_at.is_none_or(|expires| expires <= now)
    }

    pub fn into_attempt(self) -> Result<DeliveryAttempt, RowDecodeError> {
        let event_type =
            EventType::parse(&self.event_type).map_err(|e| RowDecodeError(e.to_string()))?;
        let status = DeliveryStatus::parse(&self.status)
            .ok_or_else(|| RowDecodeError(format!("unknown status: {}", self.status)))?;
        let error_kind = match self.error_kind.as_deref() {
            Some(kind) => Some(
                ErrorKind::parse(kind)
                    .ok_or_else(|| RowDecodeError(format!("unknown error kind: {kind}")))?,
            ),
            None => None,
        };

        Ok(DeliveryAttempt {
            id: AttemptId(self.id),
            endpoint_id: EndpointId(self.endpoint_id),
            owner_id: OwnerId(self.owner_id),
            event_id: EventId(self.event_id),
            event_type,
            attempt_number: self.attempt_number.max(1) as u32,
            status,
            payload: self.payload,
            signature: self.signature,
            http_status_code: self
                .http_status_code
                .and_then(|code| u16::try_from(code).ok()),
            response_snippet: self.response_snippet,
            error_kind,
            error_message: self.error_message,
            scheduled_at: Timestamp::from(self.scheduled_at),
            completed_at: self.completed_at.map(Timestamp::from),
            created_at: Timestamp::from(self.created_at),
        })
    }
}
