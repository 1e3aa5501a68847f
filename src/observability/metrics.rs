//! Prometheus metrics.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusRecorder};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default port for the metrics listener.
pub const DEFAULT_METRICS_PORT: u16 = 9090;

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,
    /// Address to bind the metrics exporter.
    pub listen_addr: SocketAddr,
}

impl MetricsConfig {
    /// Builds metrics configuration from config settings.
    #[must_use]
    pub fn from_settings(settings: Option<&MetricsSettings>) -> Self {
        let enabled = settings.and_then(|s| s.enabled).unwrap_or(false);
        let port = settings
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_METRICS_PORT);

        Self {
            enabled,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
        }
    }
}

/// Installs the Prometheus recorder and, when `expose` is set, its HTTP
/// listener on the current tokio runtime.
///
/// Returns `false` when metrics are disabled; the `metrics` macros are then
/// no-ops.
///
/// # Errors
///
/// Returns an error if a global recorder is already installed, the listener
/// cannot be started, or `expose` is set outside a tokio runtime.
pub fn install_prometheus(config: &MetricsConfig, expose: bool) -> Result<bool> {
    if !config.enabled {
        return Ok(false);
    }

    let builder = PrometheusBuilder::new();
    if expose {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::OperationFailed {
                operation: "metrics_runtime_handle".to_string(),
                cause: e.to_string(),
            }
        })?;
        install_with_runtime(builder.with_http_listener(config.listen_addr), &runtime)?;
    } else {
        builder
            .install_recorder()
            .map_err(|e| Error::OperationFailed {
                operation: "metrics_recorder_install".to_string(),
                cause: e.to_string(),
            })?;
    }

    tracing::info!(addr = %config.listen_addr, expose, "Metrics recorder installed");
    Ok(true)
}

fn install_with_runtime(
    builder: PrometheusBuilder,
    runtime_handle: &tokio::runtime::Handle,
) -> Result<()> {
    let (recorder, exporter) = {
        let _guard = runtime_handle.enter();
        builder.build().map_err(|e| Error::OperationFailed {
            operation: "metrics_exporter_build".to_string(),
            cause: e.to_string(),
        })?
    };
    set_global_recorder(recorder)?;
    runtime_handle.spawn(exporter);
    Ok(())
}

fn set_global_recorder(recorder: PrometheusRecorder) -> Result<()> {
    metrics::set_global_recorder(recorder).map_err(|e| Error::OperationFailed {
        operation: "metrics_recorder_install".to_string(),
        cause: e.to_string(),
    })
}
