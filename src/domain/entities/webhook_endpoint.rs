use crate::domain::entities::event_type::EventType;
use crate::domain::value_objects::endpoint_secret::EndpointSecret;
use crate::domain::value_objects::ids::{EndpointId, OwnerId};
use crate::domain::value_objects::timestamps::Timestamp;
use std::collections::BTreeSet;

/// A receiver URL registered by an owner, with its signing secret and subscriptions.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEndpoint {
    pub id: EndpointId,
    pub owner_id: OwnerId,
    pub name: String,
    pub url: String,
    pub secret: EndpointSecret,
    pub subscribed_event_types: BTreeSet<EventType>,
    pub is_active: bool,
    pub failure_count: u32,
    pub last_success_at: Option<Timestamp>,
    pub last_failure_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Partial change applied by `update_endpoint`; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    pub subscribed_event_types: Option<BTreeSet<EventType>>,
    pub is_active: Option<bool>,
}

impl WebhookEndpoint {
    /// Build a freshly registered endpoint with a newly generated secret.
    pub fn register(
        owner_id: OwnerId,
        name: String,
        url: String,
        subscribed_event_types: BTreeSet<EventType>,
        is_active: bool,
        now: Timestamp,
    ) -> Self {
        Self {
            id: EndpointId::new(),
            owner_id,
            name,
            url,
            secret: EndpointSecret::generate(),
            subscribed_event_types,
            is_active,
            failure_count: 0,
            last_success_at: None,
            last_failure_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn subscribes_to(&self, event_type: EventType) -> bool {
        self.subscribed_event_types.contains(&event_type)
    }

    /// Whether the dispatcher should create new chains for this endpoint.
    ///
    /// Endpoints that hit `max_consecutive_failures` are skipped until an owner
    /// reactivates them.
    pub fn accepts_deliveries(&self, max_consecutive_failures: u32) -> bool {
        self.is_active && self.failure_count < max_consecutive_failures
    }

    /// Replace the secret. The previous value is discarded.
    pub fn rotate_secret(&mut self, now: Timestamp) {
        self.secret = EndpointSecret::generate();
        self.updated_at = now;
    }

    pub fn apply_update(&mut self, update: EndpointUpdate, now: Timestamp) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(url) = update.url {
            self.url = url;
        }
        if let Some(events) = update.subscribed_event_types {
            self.subscribed_event_types = events;
        }
        if let Some(is_active) = update.is_active {
            // Re-enabling clears the auto-disable counter.
            if is_active && !self.is_active {
                self.failure_count = 0;
            }
            self.is_active = is_active;
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(events: &[EventType]) -> WebhookEndpoint {
        WebhookEndpoint::register(
            OwnerId::new(),
            "crm sync".to_string(),
            "https://hooks.example.com/in".to_string(),
            events.iter().copied().collect(),
            true,
            Timestamp::now_utc(),
        )
    }

    #[test]
    fn given_subscription_set_when_checked_should_match_only_members() {
        let endpoint = endpoint(&[EventType::ApplicationCreated, EventType::CompanyCreated]);

        assert!(endpoint.subscribes_to(EventType::ApplicationCreated));
        assert!(endpoint.subscribes_to(EventType::CompanyCreated));
        assert!(!endpoint.subscribes_to(EventType::InterviewCreated));
    }

    #[test]
    fn given_failure_count_at_threshold_when_checked_should_not_accept_deliveries() {
        let mut endpoint = endpoint(&[EventType::ApplicationCreated]);
        endpoint.failure_count = 10;

        assert!(!endpoint.accepts_deliveries(10));
        assert!(endpoint.accepts_deliveries(11));
    }

    #[test]
    fn given_inactive_endpoint_when_checked_should_not_accept_deliveries() {
        let mut endpoint = endpoint(&[EventType::ApplicationCreated]);
        endpoint.is_active = false;

        assert!(!endpoint.accepts_deliveries(10));
    }

    #[test]
    fn given_rotation_when_applied_should_replace_secret() {
        let mut endpoint = endpoint(&[EventType::ApplicationCreated]);
        let before = endpoint.secret.clone();

        endpoint.rotate_secret(Timestamp::now_utc());

        assert_ne!(endpoint.secret, before);
    }

    #[test]
    fn given_disabled_endpoint_when_reactivated_should_reset_failure_count() {
        let mut endpoint = endpoint(&[EventType::ApplicationCreated]);
        endpoint.is_active = false;
        endpoint.failure_count = 12;

        endpoint.apply_update(
            EndpointUpdate {
                is_active: Some(true),
                ..EndpointUpdate::default()
            },
            Timestamp::now_utc(),
        );

        assert!(endpoint.is_active);
        assert_eq!(endpoint.failure_count, 0);
    }

    #[test]
    fn given_partial_update_when_applied_should_leave_other_fields_untouched() {
        let mut endpoint = endpoint(&[EventType::ApplicationCreated]);
        let url = endpoint.url.clone();

        endpoint.apply_update(
            EndpointUpdate {
                name: Some("renamed".to_string()),
                ..EndpointUpdate::default()
            },
            Timestamp::now_utc(),
        );

        assert_eq!(endpoint.name, "renamed");
        assert_eq!(endpoint.url, url);
        assert!(endpoint.subscribes_to(EventType::ApplicationCreated));
    }
}
