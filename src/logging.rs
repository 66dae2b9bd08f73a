//! Logging module for OpenTelemetry integration.
//!
//! Console output is always JSON. Exporting logs and spans over OTLP is opt-in
//! and reuses the metric exporter's endpoint and credentials.

use crate::{config::ExporterConfig, exporter};
use eyre::{Result, WrapErr};
use fmt::layer;
use global::{set_text_map_propagator, set_tracer_provider};
use opentelemetry::{global, trace::TracerProvider};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, SpanExporter};
use opentelemetry_sdk::{
    Resource, logs::SdkLoggerProvider, propagation::TraceContextPropagator,
    trace::SdkTracerProvider,
};
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{
    EnvFilter, Layer, fmt, layer::SubscriberExt, registry, util::SubscriberInitExt,
};

const TRACER_NAME: &str = "otel-spans";

const DEFAULT_FILTER: &str = "info,h2=off,hyper=off,tonic=off,tower=off";

// Events from the export pipeline itself must never be exported, whatever RUST_LOG says.
const EXPORT_FILTER: &str = "trace,opentelemetry=off,opentelemetry_sdk=off,opentelemetry_otlp=off,\
tonic=off,h2=off,hyper=off,hyper_util=off,tower=off";

pub struct Logging {
    tracer_provider: Option<SdkTracerProvider>,
    logger_provider: Option<SdkLoggerProvider>,
}

impl Logging {
    pub fn init(config: &ExporterConfig, resource: Resource, export: bool) -> Result<Self> {
        let (logger_provider, tracer_provider) = if export {
            let log_exporter = exporter::configure(LogExporter::builder().with_tonic(), config)?
                .build()
                .wrap_err("failed to build OTLP log exporter")?;

            let logger_provider = SdkLoggerProvider::builder()
                .with_batch_exporter(log_exporter)
                .with_resource(resource.clone())
                .build();

            let span_exporter = exporter::configure(SpanExporter::builder().with_tonic(), config)?
                .build()
                .wrap_err("failed to build OTLP span exporter")?;

            let tracer_provider = SdkTracerProvider::builder()
                .with_batch_exporter(span_exporter)
                .with_resource(resource)
                .build();

            set_tracer_provider(tracer_provider.clone());
            set_text_map_propagator(TraceContextPropagator::new());

            (Some(logger_provider), Some(tracer_provider))
        } else {
            (None, None)
        };

        subscriber(logger_provider.as_ref(), tracer_provider.as_ref())
            .try_init()
            .wrap_err("failed to install tracing subscriber")?;

        Ok(Self {
            tracer_provider,
            logger_provider,
        })
    }

    /// Flushes both providers, returning the first error.
    pub fn flush(&self) -> Result<()> {
        let tracer = match &self.tracer_provider {
            Some(provider) => provider
                .force_flush()
                .wrap_err("failed to flush tracer provider"),
            None => Ok(()),
        };
        let logger = match &self.logger_provider {
            Some(provider) => provider
                .force_flush()
                .wrap_err("failed to flush logger provider"),
            None => Ok(()),
        };
        tracer.and(logger)
    }

    /// Shuts down both providers, returning the first error.
    pub fn shutdown(&self) -> Result<()> {
        let tracer = match &self.tracer_provider {
            Some(provider) => provider
                .shutdown()
                .wrap_err("failed to shut down tracer provider"),
            None => Ok(()),
        };
        let logger = match &self.logger_provider {
            Some(provider) => provider
                .shutdown()
                .wrap_err("failed to shut down logger provider"),
            None => Ok(()),
        };
        tracer.and(logger)
    }
}

fn subscriber(
    logger_provider: Option<&SdkLoggerProvider>,
    tracer_provider: Option<&SdkTracerProvider>,
) -> impl Subscriber + Send + Sync + 'static {
    let console_logger = layer()
        .json()
        .with_current_span(true)
        .flatten_event(true)
        .with_target(true)
        .with_span_list(false);

    let otel_logger = logger_provider.map(|provider| {
        OpenTelemetryTracingBridge::new(provider).with_filter(EnvFilter::new(EXPORT_FILTER))
    });
    let otel_tracer = tracer_provider.map(|provider| {
        OpenTelemetryLayer::new(provider.tracer(TRACER_NAME))
            .with_filter(EnvFilter::new(EXPORT_FILTER))
    });

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    registry()
        .with(env_filter)
        .with(otel_logger)
        .with(otel_tracer)
        .with(console_logger)
}
