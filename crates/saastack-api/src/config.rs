//! Server configuration read from the environment.

use std::net::SocketAddr;

use crate::error::AppError;

/// Default service name reported to OpenTelemetry.
pub const DEFAULT_SERVICE_NAME: &str = "saastack-api";

/// Settings for the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// PostgreSQL connection string; the in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Maximum pooled database connections.
    pub max_connections: u32,
    /// OTLP collector endpoint; trace export is disabled when absent.
    pub otel_endpoint: Option<String>,
    /// Service name attached to exported traces.
    pub service_name: String,
}

impl ApiConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of a
    /// variable or `None` if it is unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable holds an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(value) => value
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => 3000,
        };
        let max_connections = match non_empty("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value.parse().map_err(|e| {
                AppError::Config(format!("DATABASE_MAX_CONNECTIONS must be a valid u32: {e}"))
            })?,
            None => 10,
        };

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            max_connections,
            otel_endpoint: non_empty("OTEL_EXPORTER_OTLP_ENDPOINT"),
            service_name: non_empty("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
        })
    }

    /// The address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `host` and `port` do not form a socket
    /// address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ApiConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.database_url, None);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.otel_endpoint, None);
        assert_eq!(config.service_name, DEFAULT_SERVICE_NAME);
    }

    #[test]
    fn test_reads_every_variable() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/saastack"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4317"),
            ("OTEL_SERVICE_NAME", "eventing"),
        ])
        .unwrap();

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/saastack")
        );
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.otel_endpoint.as_deref(), Some("http://collector:4317"));
        assert_eq!(config.service_name, "eventing");
        assert_eq!(
            config.socket_addr().unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = config_from(&[("DATABASE_URL", "  "), ("PORT", "")]).unwrap();

        assert_eq!(config.database_url, None);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let result = config_from(&[("PORT", "eighty")]);

        match result {
            Err(AppError::Config(message)) => assert!(message.contains("PORT")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_host_is_config_error() {
        let config = config_from(&[("HOST", "not a host")]).unwrap();

        assert!(matches!(config.socket_addr(), Err(AppError::Config(_))));
    }
}
