pub mod endpoint_secret;
pub mod ids;
pub mod timestamps;
