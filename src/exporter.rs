//! Shared OTLP/gRPC exporter settings.

use crate::config::ExporterConfig;
use eyre::Result;
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};

/// Points a tonic exporter builder at the configured endpoint with the bearer metadata.
pub(crate) fn configure<B>(builder: B, config: &ExporterConfig) -> Result<B>
where
    B: WithExportConfig + WithTonicConfig,
{
    let mut builder = builder
        .with_endpoint(config.endpoint_url()?)
        .with_timeout(config.timeout)
        .with_metadata(config.metadata()?);

    if let Some(tls) = config.tls_config()? {
        builder = builder.with_tls_config(tls);
    }

    Ok(builder)
}
