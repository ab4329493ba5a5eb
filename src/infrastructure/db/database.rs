use async_trait::async_trait;
use thiserror::Error;

/// Driver-level failures, before stores map them onto their own error kinds.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("database query error: {0}")]
    Query(String),
}

/// Raw statement access, used for readiness probes.
#[async_trait]
pub trait Database: Send + Sync {
    async fn execute(&self, query: &str) -> Result<u64, DatabaseError>;
}
