//! Tracing subscriber setup with optional OpenTelemetry export.

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::ApiConfig;
use crate::error::AppError;

/// Owns the OTLP tracer provider for the lifetime of the server.
///
/// Call [`TracingHandle::shutdown`] before exiting so buffered spans are
/// flushed.
#[derive(Debug)]
pub struct TracingHandle {
    tracer_provider: Option<SdkTracerProvider>,
}

impl TracingHandle {
    /// Whether spans are being exported over OTLP.
    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.tracer_provider.is_some()
    }

    /// Flushes and shuts down the tracer provider, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Telemetry` if the provider fails to shut down.
    pub fn shutdown(mut self) -> Result<(), AppError> {
        if let Some(provider) = self.tracer_provider.take() {
            provider.shutdown().map_err(|e| {
                AppError::Telemetry(format!("failed to shut down tracer provider: {e:?}"))
            })?;
            info!("OTLP tracer provider shut down");
        }
        Ok(())
    }
}

impl Drop for TracingHandle {
    fn drop(&mut self) {
        if self.tracer_provider.is_some() {
            tracing::warn!("TracingHandle dropped without shutdown, spans may be lost");
        }
    }
}

fn init_tracer(endpoint: &str, service_name: &str) -> Result<SdkTracerProvider, AppError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| AppError::Telemetry(format!("failed to build OTLP span exporter: {e}")))?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build())
}

/// Installs the global subscriber: JSON logs filtered by `RUST_LOG`
/// (default `info`), plus an OpenTelemetry layer when an OTLP endpoint is
/// configured.
///
/// Must be called once, inside the Tokio runtime, before any spans are
/// recorded.
///
/// # Errors
///
/// Returns `AppError::Telemetry` if the exporter cannot be built or a global
/// subscriber is already installed.
pub fn init(config: &ApiConfig) -> Result<TracingHandle, AppError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json());

    let tracer_provider = match &config.otel_endpoint {
        Some(endpoint) => {
            let provider = init_tracer(endpoint, &config.service_name)?;
            let tracer = provider.tracer(config.service_name.clone());
            registry
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .try_init()
                .map_err(|e| AppError::Telemetry(e.to_string()))?;
            info!(
                endpoint = %endpoint,
                service_name = %config.service_name,
                "tracing initialized with OTLP export"
            );
            Some(provider)
        }
        None => {
            registry
                .try_init()
                .map_err(|e| AppError::Telemetry(e.to_string()))?;
            info!("tracing initialized without OTLP export");
            None
        }
    };

    Ok(TracingHandle { tracer_provider })
}
