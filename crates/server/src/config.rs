//! Listener configuration for the WellShare API process

use crate::error::{Result, ServerError};
use std::net::SocketAddr;

/// Default port assignments
pub mod ports {
    /// REST API and health endpoints
    pub const API_HTTP: u16 = 8080;
    /// Prometheus scrape endpoint
    pub const METRICS: u16 = 9090;
}

/// Addresses the API process binds
///
/// Port `0` asks the OS for an ephemeral port, which tests rely on.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    pub http_port: Option<u16>,
    /// Bound by the metrics exporter, not by this crate
    pub metrics_port: Option<u16>,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, http_port: u16) -> Self {
        Self {
            host: host.into(),
            http_port: Some(http_port),
            metrics_port: None,
        }
    }

    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = Some(port);
        self
    }

    pub fn http_addr(&self) -> Option<Result<SocketAddr>> {
        self.http_port.map(|p| self.parse_addr(p))
    }

    /// Every configured port with a label, for startup checks
    pub fn ports(&self) -> Vec<(&'static str, u16)> {
        let mut ports = Vec::new();
        if let Some(port) = self.http_port {
            ports.push(("HTTP", port));
        }
        if let Some(port) = self.metrics_port {
            ports.push(("metrics", port));
        }
        ports
    }

    fn parse_addr(&self, port: u16) -> Result<SocketAddr> {
        format!("{}:{}", self.host, port)
            .parse()
            .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", self.host, port)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: Some(ports::API_HTTP),
            metrics_port: Some(ports::METRICS),
        }
    }
}
