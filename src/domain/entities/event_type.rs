use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain events a webhook endpoint can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "application.created")]
    ApplicationCreated,
    #[serde(rename = "application.updated")]
    ApplicationUpdated,
    #[serde(rename = "application.deleted")]
    ApplicationDeleted,
    #[serde(rename = "application.status_changed")]
    ApplicationStatusChanged,
    #[serde(rename = "interview.created")]
    InterviewCreated,
    #[serde(rename = "interview.updated")]
    InterviewUpdated,
    #[serde(rename = "interview.completed")]
    InterviewCompleted,
    #[serde(rename = "interview.cancelled")]
    InterviewCancelled,
    #[serde(rename = "company.created")]
    CompanyCreated,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);

impl EventType {
    pub const ALL: [EventType; 9] = [
        EventType::ApplicationCreated,
        EventType::ApplicationUpdated,
        EventType::ApplicationDeleted,
        EventType::ApplicationStatusChanged,
        EventType::InterviewCreated,
        EventType::InterviewUpdated,
        EventType::InterviewCompleted,
        EventType::InterviewCancelled,
        EventType::CompanyCreated,
    ];

    /// Wire identifier, as sent in `X-Webhook-Event` and stored in records.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ApplicationCreated => "application.created",
            EventType::ApplicationUpdated => "application.updated",
            EventType::ApplicationDeleted => "application.deleted",
            EventType::ApplicationStatusChanged => "application.status_changed",
            EventType::InterviewCreated => "interview.created",
            EventType::InterviewUpdated => "interview.updated",
            EventType::InterviewCompleted => "interview.completed",
            EventType::InterviewCancelled => "interview.cancelled",
            EventType::CompanyCreated => "company.created",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            EventType::ApplicationCreated => "Application created",
            EventType::ApplicationUpdated => "Application updated",
            EventType::ApplicationDeleted => "Application deleted",
            EventType::ApplicationStatusChanged => "Application status changed",
            EventType::InterviewCreated => "Interview scheduled",
            EventType::InterviewUpdated => "Interview updated",
            EventType::InterviewCompleted => "Interview completed",
            EventType::InterviewCancelled => "Interview cancelled",
            EventType::CompanyCreated => "Company created",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownEventType> {
        Self::ALL
            .iter()
            .copied()
            .find(|event_type| event_type.as_str() == value)
            .ok_or_else(|| UnknownEventType(value.to_string()))
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
