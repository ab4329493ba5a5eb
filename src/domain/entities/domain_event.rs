use crate::domain::entities::event_type::EventType;
use crate::domain::value_objects::ids::{EventId, OwnerId};
use crate::domain::value_objects::timestamps::Timestamp;
use serde_json::{Value, json};

/// A fact raised by another module of the tracker. Never persisted as such.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainEvent {
    pub event_id: EventId,
    pub event_type: EventType,
    pub tenant_id: OwnerId,
    pub payload: Value,
    pub occurred_at: Timestamp,
}

impl DomainEvent {
    pub fn new(event_type: EventType, tenant_id: OwnerId, payload: Value) -> Self {
        Self {
            event_id: EventId::new(),
            event_type,
            tenant_id,
            payload,
            occurred_at: Timestamp::now_utc(),
        }
    }

    /// Body POSTed to receivers. Every attempt of a chain carries this same value.
    pub fn envelope(&self) -> Value {
        json!({
            "event_id": self.event_id.to_string(),
            "event": self.event_type.as_str(),
            "timestamp": self.occurred_at.to_rfc3339(),
            "data": self.payload,
        })
    }
}
