//! Metrics module for OpenTelemetry integration.
//!
//! It sets up a meter provider with periodic exporting of metric data.

use crate::{config::ExporterConfig, exporter};
use eyre::{Result, WrapErr};
use global::set_meter_provider;
use opentelemetry::{
    InstrumentationScope, global,
    metrics::{Meter, MeterProvider},
};
use opentelemetry_otlp::MetricExporter;
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider, Temporality},
};
use tracing::debug;

pub struct Metrics {
    provider: SdkMeterProvider,
}

impl Metrics {
    pub fn init(config: &ExporterConfig, resource: Resource) -> Result<Self> {
        let builder = MetricExporter::builder()
            .with_temporality(Temporality::default())
            .with_tonic();

        let exporter = exporter::configure(builder, config)?
            .build()
            .wrap_err("failed to build OTLP metric exporter")?;

        let reader = PeriodicReader::builder(exporter)
            .with_interval(config.interval)
            .build();
        let provider = SdkMeterProvider::builder()
            .with_reader(reader)
            .with_resource(resource)
            .build();

        set_meter_provider(provider.clone());
        debug!(interval = ?config.interval, "Meter provider installed");

        Ok(Self { provider })
    }

    pub fn meter(&self, name: impl Into<String>) -> Meter {
        self.provider
            .meter_with_scope(InstrumentationScope::builder(name.into()).build())
    }

    pub fn flush(&self) -> Result<()> {
        self.provider
            .force_flush()
            .wrap_err("failed to flush meter provider")
    }

    pub fn shutdown(&self) -> Result<()> {
        self.provider
            .shutdown()
            .wrap_err("failed to shut down meter provider")
    }
}
