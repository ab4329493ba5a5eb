use crate::config::{LogFormat, Observability};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides `log_level`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(settings: &Observability) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    let _ = match settings.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
}

/// Install the Prometheus recorder when metrics are enabled.
pub fn init_metrics(settings: &Observability) -> Result<Option<PrometheusHandle>, String> {
    if !settings.enable_metrics {
        return Ok(None);
    }
    PrometheusBuilder::new()
        .add_global_label("service", settings.service_name.clone())
        .install_recorder()
        .map(Some)
        .map_err(|e| format!("failed to install metrics recorder: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_metrics_disabled_when_initialised_should_not_install_recorder() {
        let settings = Observability::default();

        let handle = init_metrics(&settings).unwrap();

        assert!(handle.is_none());
    }
}
