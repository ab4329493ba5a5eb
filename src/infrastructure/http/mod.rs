pub mod transport;

pub use transport::{
    OutboundRequest, ReqwestTransport, TransportError, TransportResponse, WebhookTransport,
};
