use crate::domain::entities::event_type::EventType;
use crate::domain::entities::webhook_endpoint::WebhookEndpoint;
use crate::domain::value_objects::endpoint_secret::EndpointSecret;
use crate::domain::value_objects::ids::{EndpointId, OwnerId};
use crate::domain::value_objects::timestamps::Timestamp;
use crate::infrastructure::db::dto::RowDecodeError;
use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WebhookEndpointRow {
    pub id: uuid::Uuid,
    pub owner_id: uuid::Uuid,
    pub name: String,
    pub url: String,
    pub secret: String,
    pub events: Vec<String>,
    pub is_active: bool,
    pub failure_count: i32,
    pub last_success_at: Option<OffsetDateTime>,
    pub last_failure_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl WebhookEndpointRow {
    pub fn from_endpoint(endpoint: &WebhookEndpoint) -> Self {
        Self {
            id: endpoint.id.0,
            owner_id: endpoint.owner_id.0,
            name: endpoint.name.clone(),
            url: endpoint.url.clone(),
            secret: endpoint.secret.as_str().to_string(),
            events: endpoint
                .subscribed_event_types
                .iter()
                .map(|e| e.as_str().to_string())
                .collect(),
            is_active: endpoint.is_active,
            failure_count: endpoint.failure_count.min(i32::MAX as u32) as i32,
            last_success_at: endpoint.last_success_at.map(|t| t.as_inner()),
            last_failure_at: endpoint.last_failure_at.map(|t| t.as_inner()),
            created_at: endpoint.created_at.as_inner(),
            updated_at: endpoint.updated_at.as_inner(),
        }
    }

    pub fn into_endpoint(self) -> Result<WebhookEndpoint, RowDecodeError> {
        let subscribed_event_types = self
            .events
            .iter()
            .map(|e| EventType::parse(e).map_err(|err| RowDecodeError(err.to_string())))
            .collect::<Result<_, _>>()?;

        Ok(WebhookEndpoint {
            id: EndpointId(self.id),
            owner_id: OwnerId(self.owner_id),
            name: self.name,
            url: self.url,
            secret: EndpointSecret::from_stored(self.secret),
            subscribed_event_types,
            is_active: self.is_active,
            failure_count: self.failure_count.max(0) as u32,
            last_success_at: self.last_success_at.map(Timestamp::from),
            last_failure_at: self.last_failure_at.map(Timestamp::from),
            created_at: Timestamp::from(self.created_at),
            updated_at: Timestamp::from(self.updated_at),
        })
    }
}
