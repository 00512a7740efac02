use crate::config::TracingConfig;
use crate::error::{CsvSqlError, Result};
use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_sdk::Resource;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub struct OtelGuard {
    tracer_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            // flush remaining traces on shutdown
            if let Err(e) = provider.shutdown() {
                eprintln!("error shutting down tracer provider: {}", e);
            }
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
}

/// install the global subscriber; logs go to stderr so query output stays clean on stdout
pub fn init_tracing(service_name: &str, config: &TracingConfig) -> Result<OtelGuard> {
    let endpoint = match (config.enabled, config.endpoint.as_deref()) {
        (true, Some(endpoint)) => endpoint.to_string(),
        _ => {
            // tracing not enabled, just set up basic logging
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .finish()
                .try_init()
                .map_err(|e| CsvSqlError::Tracing(e.to_string()))?;

            tracing::debug!("basic logging initialized (service={})", service_name);

            return Ok(OtelGuard {
                tracer_provider: None,
            });
        }
    };

    // initialize otlp exporter with tonic (grpc)
    use opentelemetry_otlp::WithExportConfig;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .build()
        .map_err(|e| CsvSqlError::Tracing(format!("exporter build failed: {}", e)))?;

    let resource = Resource::builder_empty()
        .with_attribute(KeyValue::new("service.name", service_name.to_string()))
        .build();

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    // bridge tracing to opentelemetry
    let telemetry =
        tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.to_string()));

    tracing_subscriber::registry()
        .with(telemetry)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter())
        .try_init()
        .map_err(|e| CsvSqlError::Tracing(e.to_string()))?;

    tracing::info!(
        "opentelemetry tracing initialized for {} (endpoint: {})",
        service_name,
        endpoint
    );

    Ok(OtelGuard {
        tracer_provider: Some(provider),
    })
}
