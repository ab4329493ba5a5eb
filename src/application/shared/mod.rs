pub mod endpoint_fields;
pub mod outbound;
pub mod ownership;
