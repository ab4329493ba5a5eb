use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: Server,
    pub db: Db,
    pub webhook_delivery: WebhookDelivery,
    pub observability: Observability,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Db {
    /// Postgres URL. Empty means in-memory stores.
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

impl Default for Db {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 5,
            acquire_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebhookDelivery {
    pub request_timeout_ms: u64,
    pub test_timeout_ms: u64,
    pub max_attempts: u32,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
    pub jitter_ms: u64,
    pub worker_count: usize,
    pub response_snippet_limit: usize,
    pub max_consecutive_failures: u32,
    pub allow_private_hosts: bool,
    pub requeue_interval_ms: u64,
    pub requeue_grace_ms: u64,
    pub requeue_batch_size: u32,
    pub cleanup_interval_ms: u64,
    pub retention_days: u32,
    pub user_agent: String,
}

impl Default for WebhookDelivery {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            test_timeout_ms: 10_000,
            max_attempts: 3,
            backoff_initial_ms: 60_000,
            backoff_max_ms: 900_000,
            jitter_ms: 0,
            worker_count: 4,
            response_snippet_limit: 1_000,
            max_consecutive_failures: 10,
            allow_private_hosts: false,
            requeue_interval_ms: 60_000,
            requeue_grace_ms: 120_000,
            requeue_batch_size: 100,
            cleanup_interval_ms: 86_400_000,
            retention_days: 30,
            user_agent: "JobTracker-Webhook/1.0".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Observability {
    pub service_name: String,
    pub log_format: LogFormat,
    pub log_level: String,
    pub enable_metrics: bool,
}

impl Default for Observability {
    fn default() -> Self {
        Self {
            service_name: "webhook-relay".to_string(),
            log_format: LogFormat::Pretty,
            log_level: "info".to_string(),
            enable_metrics: false,
        }
    }
}

/// Load settings from `config/default.toml`, `config/<env>.toml`, and env overrides.
pub fn load() -> Result<Settings, config::ConfigError> {
    let env_name = std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());
    config::Config::builder()
        .add_source(config::File::with_name("config/default").required(false))
        .add_source(config::File::with_name(&format!("config/{env_name}")).required(false))
        .add_source(config::Environment::with_prefix("WEBHOOK_RELAY").separator("__"))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::{LogFormat, Settings};

    #[test]
    fn given_no_sources_when_defaults_used_should_match_delivery_contract() {
        let settings = Settings::default();

        assert_eq!(settings.webhook_delivery.request_timeout_ms, 30_000);
        assert_eq!(settings.webhook_delivery.max_attempts, 3);
        assert!(settings.db.url.is_empty());
        assert_eq!(settings.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn given_partial_source_when_deserialized_should_fill_missing_fields() {
        let settings: Settings = config::Config::builder()
            .set_override("webhook_delivery.max_attempts", 5)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.webhook_delivery.max_attempts, 5);
        assert_eq!(settings.webhook_delivery.backoff_initial_ms, 60_000);
        assert_eq!(settings.server.port, 8080);
    }
}
