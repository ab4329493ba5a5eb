use crate::config::WebhookDelivery;
use crate::domain::services::signer;
use crate::domain::value_objects::endpoint_secret::EndpointSecret;
use crate::domain::value_objects::timestamps::Timestamp;
use crate::infrastructure::http::OutboundRequest;

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
pub const EVENT_HEADER: &str = "X-Webhook-Event";
pub const EVENT_ID_HEADER: &str = "X-Webhook-Event-Id";
pub const DELIVERY_ID_HEADER: &str = "X-Webhook-Delivery-Id";
pub const ATTEMPT_HEADER: &str = "X-Webhook-Attempt";
pub const TIMESTAMP_HEADER: &str = "X-Webhook-Timestamp";

/// Identity of one POST, rendered into the `X-Webhook-*` headers.
pub struct DeliveryHeaders<'a> {
    pub event: &'a str,
    pub event_id: String,
    pub delivery_id: String,
    pub attempt_number: u32,
}

pub struct SignedRequest {
    pub request: OutboundRequest,
    pub signature: String,
}

/// Sign `body` with the endpoint's current secret and assemble the outbound POST.
pub fn signed_request(
    url: &str,
    secret: &EndpointSecret,
    body: Vec<u8>,
    headers: DeliveryHeaders<'_>,
    settings: &WebhookDelivery,
    timeout_ms: u64,
    now: Timestamp,
) -> SignedRequest {
    let signature = signer::sign(&body, secret.as_bytes());
    let headers = vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        (SIGNATURE_HEADER.to_string(), signature.clone()),
        (EVENT_HEADER.to_string(), headers.event.to_string()),
        (EVENT_ID_HEADER.to_string(), headers.event_id),
        (DELIVERY_ID_HEADER.to_string(), headers.delivery_id),
        (ATTEMPT_HEADER.to_string(), headers.attempt_number.to_string()),
        (
            TIMESTAMP_HEADER.to_string(),
            now.as_inner().unix_timestamp().to_string(),
        ),
        ("User-Agent".to_string(), settings.user_agent.clone()),
    ];

    SignedRequest {
        request: OutboundRequest {
            url: url.to_string(),
            body,
            headers,
            timeout: std::time::Duration::from_millis(timeout_ms),
        },
        signature,
    }
}
