//! Observability wiring.
//!
//! One `tracing-subscriber` registry collects the spans and events of every
//! crate in the workspace:
//!
//! - an `EnvFilter` from `RUST_LOG` (default `info`);
//! - a JSON formatter (`RELAY_LOG_FORMAT=json`, the default) or a
//!   human-readable one (`RELAY_LOG_FORMAT=pretty`), both on stderr;
//! - an OpenTelemetry OTLP exporter when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.

use anyhow::{bail, Context};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::runtime;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Selects the log formatter.
pub const LOG_FORMAT_VAR: &str = "RELAY_LOG_FORMAT";

/// Enables the OTLP exporter when set.
pub const OTLP_ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

const SERVICE_NAME: &str = "pipedrive-relay";

/// Log line layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable lines.
    Pretty,
}

impl LogFormat {
    /// Parses the `RELAY_LOG_FORMAT` value; unset means JSON.
    pub fn from_setting(value: Option<&str>) -> anyhow::Result<Self> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(Self::Json),
            Some(v) if v.eq_ignore_ascii_case("json") => Ok(Self::Json),
            Some(v) if v.eq_ignore_ascii_case("pretty") => Ok(Self::Pretty),
            Some(other) => bail!("{LOG_FORMAT_VAR} must be `json` or `pretty`, got `{other}`"),
        }
    }
}

/// Keeps the exporter alive; call [`Telemetry::shutdown`] before exit to flush.
pub struct Telemetry {
    provider: Option<TracerProvider>,
}

impl Telemetry {
    /// Flushes and stops the OTLP exporter, if any.
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(err) = provider.shutdown() {
                eprintln!("failed to shut down OpenTelemetry exporter: {err}");
            }
        }
    }
}

/// Installs the global subscriber. Must be called from within a tokio runtime
/// when the OTLP exporter is enabled.
pub fn init() -> anyhow::Result<Telemetry> {
    let format = LogFormat::from_setting(std::env::var(LOG_FORMAT_VAR).ok().as_deref())?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let provider = match std::env::var(OTLP_ENDPOINT_VAR) {
        Ok(endpoint) if !endpoint.trim().is_empty() => Some(otlp_provider(endpoint.trim())?),
        _ => None,
    };
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(SERVICE_NAME)));

    let json_layer = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr)
    });
    let pretty_layer = (format == LogFormat::Pretty)
        .then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(otel_layer)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(Telemetry { provider })
}

fn otlp_provider(endpoint: &str) -> anyhow::Result<TracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("failed to build OTLP span exporter")?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new([KeyValue::new("service.name", SERVICE_NAME)]))
        .build();
    opentelemetry::global::set_tracer_provider(provider.clone());
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_defaults_to_json() {
        assert_eq!(LogFormat::from_setting(None).unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_setting(Some("  ")).unwrap(), LogFormat::Json);
    }

    #[test]
    fn log_format_is_case_insensitive() {
        assert_eq!(
            LogFormat::from_setting(Some("PRETTY")).unwrap(),
            LogFormat::Pretty
        );
        assert_eq!(LogFormat::from_setting(Some("Json")).unwrap(), LogFormat::Json);
    }

    #[test]
    fn unknown_log_format_is_an_error() {
        let err = LogFormat::from_setting(Some("xml")).unwrap_err();
        assert!(err.to_string().contains("xml"));
    }
}
