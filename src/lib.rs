//! Telemetry module for OpenTelemetry integration.
//!
//! It sets up an OTLP/gRPC metrics pipeline authenticated with a bearer token,
//! console logging, and optionally OTLP log and span export.

pub mod config;
mod exporter;
mod logging;
mod metrics;
pub mod sample;

pub use config::{Config, ExporterConfig, ResourceConfig, SampleConfig};
use eyre::Result;
use logging::Logging;
use metrics::Metrics;
use opentelemetry::{KeyValue, metrics::Meter};
use opentelemetry_sdk::Resource;
use tracing::info;

pub struct Telemetry {
    logging: Logging,
    metrics: Metrics,
}

impl Telemetry {
    pub fn init(config: &Config) -> Result<Self> {
        config.exporter.validate()?;

        let resource = Resource::builder()
            .with_service_name(config.resource.service_name.clone())
            .with_attributes(vec![KeyValue::new(
                "service.version",
                config.resource.service_version.clone(),
            )])
            .build();

        let logging = Logging::init(&config.exporter, resource.clone(), config.export_traces)?;
        let metrics = Metrics::init(&config.exporter, resource)?;

        info!(
            endpoint = %config.exporter.endpoint_url()?,
            service = %config.resource.service_name,
            export_traces = config.export_traces,
            "Telemetry initialised"
        );

        Ok(Self { logging, metrics })
    }

    pub fn meter(&self, name: impl Into<String>) -> Meter {
        self.metrics.meter(name)
    }

    /// Pushes everything recorded so far. Metrics are flushed even if a log or span flush fails.
    pub fn flush(&self) -> Result<()> {
        let metrics = self.metrics.flush();
        let logging = self.logging.flush();
        metrics.and(logging)
    }

    pub fn shutdown(self) -> Result<()> {
        let metrics = self.metrics.shutdown();
        let logging = self.logging.shutdown();
        metrics.and(logging)
    }
}
