//! Command line and environment configuration.
//!
//! Every flag can also be set through the environment. `CX_ENDPOINT` and
//! `CX_TOKEN` are required; the rest have defaults.

use clap::{Args, Parser};
use eyre::{Result, WrapErr, bail};
use std::time::Duration;
use tonic::{
    metadata::{Ascii, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Emit sample metrics to an OTLP/gRPC endpoint")]
pub struct Config {
    #[command(flatten)]
    pub exporter: ExporterConfig,

    #[command(flatten)]
    pub resource: ResourceConfig,

    #[command(flatten)]
    pub sample: SampleConfig,

    /// How long to wait after flushing before shutting down
    #[arg(long, env = "CX_LINGER", default_value = "3s", value_parser = humantime::parse_duration)]
    pub linger: Duration,

    /// Also export logs and spans over OTLP
    #[arg(long, env = "CX_EXPORT_TRACES")]
    pub export_traces: bool,
}

/// Where and how exported data is sent.
#[derive(Debug, Clone, Args)]
pub struct ExporterConfig {
    /// OTLP/gRPC endpoint, `https://` is assumed when no scheme is given
    #[arg(long, env = "CX_ENDPOINT")]
    pub endpoint: String,

    /// Bearer token sent in the `authorization` header
    #[arg(long, env = "CX_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Timeout for a single export request
    #[arg(long, env = "CX_EXPORT_TIMEOUT", default_value = "1s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Interval between periodic metric exports
    #[arg(long, env = "CX_EXPORT_INTERVAL", default_value = "60s", value_parser = humantime::parse_duration)]
    pub interval: Duration,
}

impl ExporterConfig {
    /// Checks the endpoint and token before any exporter is built.
    pub fn validate(&self) -> Result<()> {
        self.endpoint_url()?;
        self.metadata()?;
        Ok(())
    }

    pub fn endpoint_url(&self) -> Result<String> {
        let endpoint = self.endpoint.trim().trim_end_matches('/');

        if endpoint.is_empty() {
            bail!("exporter endpoint is empty");
        }

        let lowered = endpoint.to_ascii_lowercase();
        for scheme in ["https://", "http://"] {
            if lowered.starts_with(scheme) {
                return Ok(format!("{scheme}{}", &endpoint[scheme.len()..]));
            }
        }

        Ok(format!("https://{endpoint}"))
    }

    pub fn uses_tls(&self) -> Result<bool> {
        Ok(self.endpoint_url()?.starts_with("https://"))
    }

    /// TLS settings for `https` endpoints, verified against the platform's native roots.
    pub fn tls_config(&self) -> Result<Option<ClientTlsConfig>> {
        Ok(self
            .uses_tls()?
            .then(|| ClientTlsConfig::new().with_native_roots()))
    }

    /// gRPC metadata attached to every export request.
    pub fn metadata(&self) -> Result<MetadataMap> {
        let token = self.token.trim();

        if token.is_empty() {
            bail!("bearer token is empty");
        }

        let value = format!("Bearer {token}")
            .parse::<MetadataValue<Ascii>>()
            .wrap_err("bearer token is not a valid header value")?;

        let mut metadata = MetadataMap::new();
        metadata.insert("authorization", value);
        Ok(metadata)
    }
}

/// Attributes describing the emitting service.
#[derive(Debug, Clone, Args)]
pub struct ResourceConfig {
    #[arg(long, env = "OTEL_SERVICE_NAME", default_value = "my-test-service")]
    pub service_name: String,

    #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
    pub service_version: String,
}

/// The metrics recorded by a run.
#[derive(Debug, Clone, Args)]
pub struct SampleConfig {
    /// Instrumentation scope the instruments are created under
    #[arg(long, default_value = "test")]
    pub meter_name: String,

    #[arg(long, default_value = "java_test_counter1")]
    pub counter_name: String,

    /// Amount added to the counter
    #[arg(long, default_value_t = 100)]
    pub counter_increment: u64,

    #[arg(long, default_value = "java_test_gauge1")]
    pub gauge_name: String,

    /// Value reported by the gauge callback
    #[arg(long, default_value_t = 0.8)]
    pub gauge_value: f64,

    /// `service.name` attribute written on every data point
    #[arg(long, default_value = "my-test-service")]
    pub point_service_name: String,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            meter_name: "test".to_string(),
            counter_name: "java_test_counter1".to_string(),
            counter_increment: 100,
            gauge_name: "java_test_gauge1".to_string(),
            gauge_value: 0.8,
            point_service_name: "my-test-service".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn exporter(endpoint: &str, token: &str) -> ExporterConfig {
        ExporterConfig {
            endpoint: endpoint.to_string(),
            token: token.to_string(),
            timeout: Duration::from_secs(1),
            interval: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_endpoint_without_scheme_defaults_to_https() {
        let config = exporter("ingress.example.com:443", "token");
        assert_eq!(
            config.endpoint_url().unwrap(),
            "https://ingress.example.com:443"
        );
        assert!(config.uses_tls().unwrap());
        assert!(config.tls_config().unwrap().is_some());
    }

    #[test]
    fn test_endpoint_scheme_is_kept() {
        let config = exporter("http://localhost:4317", "token");
        assert_eq!(config.endpoint_url().unwrap(), "http://localhost:4317");
        assert!(!config.uses_tls().unwrap());
        assert!(config.tls_config().unwrap().is_none());

        let config = exporter("https://ingress.example.com", "token");
        assert_eq!(
            config.endpoint_url().unwrap(),
            "https://ingress.example.com"
        );
    }

    #[test]
    fn test_endpoint_trailing_slash_is_stripped() {
        let config = exporter(" https://ingress.example.com/ ", "token");
        assert_eq!(
            config.endpoint_url().unwrap(),
            "https://ingress.example.com"
        );
    }

    #[test]
    fn test_empty_endpoint_is_rejected() {
        assert!(exporter("", "token").endpoint_url().is_err());
        assert!(exporter("   ", "token").validate().is_err());
    }

    #[test]
    fn test_metadata_carries_bearer_token() {
        let metadata = exporter("localhost:4317", "secret").metadata().unwrap();
        assert_eq!(metadata.len(), 1);
        assert_eq!(
            metadata.get("authorization").unwrap().to_str().unwrap(),
            "Bearer secret"
        );
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        assert!(exporter("localhost:4317", "").metadata().is_err());
        assert!(exporter("localhost:4317", "bad\ntoken").metadata().is_err());
        assert!(exporter("localhost:4317", "").validate().is_err());
    }

    #[test]
    fn test_endpoint_scheme_is_case_insensitive() {
        let config = exporter("HTTPS://Ingress.example.com", "token");
        assert_eq!(
            config.endpoint_url().unwrap(),
            "https://Ingress.example.com"
        );
        assert!(config.uses_tls().unwrap());

        let config = exporter("Http://localhost:4317", "token");
        assert_eq!(config.endpoint_url().unwrap(), "http://localhost:4317");
        assert!(!config.uses_tls().unwrap());
    }

    fn default_of(id: &str) -> String {
        let mut command = Config::command();
        command.build();
        let arg = command
            .get_arguments()
            .find(|arg| arg.get_id() == id)
            .unwrap_or_else(|| panic!("no argument {id}"));
        arg.get_default_values()
            .iter()
            .map(|value| value.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(",")
    }

    #[test]
    fn test_cli_defaults() {
        let duration = |id: &str| humantime::parse_duration(&default_of(id)).unwrap();

        assert_eq!(duration("timeout"), Duration::from_secs(1));
        assert_eq!(duration("interval"), Duration::from_secs(60));
        assert_eq!(duration("linger"), Duration::from_secs(3));
        assert_eq!(default_of("export_traces"), "false");
        assert_eq!(default_of("service_name"), "my-test-service");
        assert_eq!(default_of("service_version"), env!("CARGO_PKG_VERSION"));
        assert_eq!(default_of("meter_name"), "test");
        assert_eq!(default_of("counter_name"), "java_test_counter1");
        assert_eq!(default_of("counter_increment"), "100");
        assert_eq!(default_of("gauge_name"), "java_test_gauge1");
        assert_eq!(default_of("gauge_value"), "0.8");
        assert_eq!(default_of("point_service_name"), "my-test-service");
    }

    #[test]
    fn test_cli_requires_endpoint_and_token() {
        assert!(default_of("endpoint").is_empty());
        assert!(default_of("token").is_empty());

        let command = Config::command();
        let required: Vec<_> = command
            .get_arguments()
            .filter(|arg| arg.is_required_set())
            .map(|arg| arg.get_id().to_string())
            .collect();
        assert!(required.contains(&"endpoint".to_string()));
        assert!(required.contains(&"token".to_string()));
    }

    #[test]
    fn test_cli_parses_humantime_durations() {
        let config = Config::try_parse_from([
            "otlp-metrics-example",
            "--endpoint",
            "localhost:4317",
            "--token",
            "secret",
            "--interval",
            "500ms",
            "--linger",
            "1m",
        ])
        .unwrap();

        assert_eq!(config.exporter.interval, Duration::from_millis(500));
        assert_eq!(config.linger, Duration::from_secs(60));
    }
}
