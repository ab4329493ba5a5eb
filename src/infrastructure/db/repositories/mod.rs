pub mod delivery_attempt_repository;
pub mod factory;
pub mod webhook_endpoint_repository;

pub use factory::Repositories;
