mod database;
pub mod delivery_attempt_store_postgres;
pub mod webhook_endpoint_store_postgres;

pub use database::PostgresDatabase;
