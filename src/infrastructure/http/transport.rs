use async_trait::async_trait;
use thiserror::Error;

/// One outbound webhook POST.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
    pub timeout: std::time::Duration,
}

impl OutboundRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request failed: {0}")]
    Request(String),
}

#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError>;
}

/// `reqwest` client shared by all workers.
///
/// Redirects are never followed: a 3xx is returned to the caller as a plain
/// status so the target host is always the one validated at registration.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

fn map_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}

#[async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn post(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        // Step 1: Build the request with its own timeout.
        let mut builder = self
            .client
            .post(&request.url)
            .timeout(request.timeout)
            .body(request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        // Step 2: Send and capture status plus body.
        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_error)?;

        Ok(TransportResponse { status, body })
    }
}
