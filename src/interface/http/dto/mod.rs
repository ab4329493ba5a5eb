pub mod delivery;
pub mod endpoint;
pub mod event;
