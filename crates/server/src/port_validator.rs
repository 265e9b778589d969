//! Startup port checks
//!
//! A free port here can still be taken before the real bind; this only
//! gives an early, readable failure.

use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};

/// Fail fast if any configured port is already bound
pub async fn validate_ports_available(config: &ServerConfig) -> Result<()> {
    let ports = config.ports();
    if ports.is_empty() {
        warn!("No ports configured for server");
        return Ok(());
    }

    for (label, port) in ports {
        validate_port_range(port)?;
        validate_single_port(&config.host, port, label).await?;
    }

    info!("All server ports validated successfully");
    Ok(())
}

async fn validate_single_port(host: &str, port: u16, label: &str) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    debug!("Checking {} port {}", label, port);

    match TcpListener::bind(&addr).await {
        Ok(listener) => {
            drop(listener);
            Ok(())
        }
        Err(e) => {
            error!("{} port {} is NOT available: {}", label, port, e);
            Err(ServerError::port_in_use(port, e.to_string()))
        }
    }
}

pub async fn is_port_in_use(host: &str, port: u16) -> bool {
    let addr = format!("{}:{}", host, port);
    TcpListener::bind(&addr).await.is_err()
}

pub fn validate_port_range(port: u16) -> Result<()> {
    if port == 0 {
        return Err(ServerError::ConfigError(
            "Port cannot be 0 for a configured listener".to_string(),
        ));
    }
    if port < 1024 {
        warn!("Port {} is a privileged port (requires root/admin privileges)", port);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_port_range() {
        assert!(validate_port_range(0).is_err());
        assert!(validate_port_range(80).is_ok());
        assert!(validate_port_range(8080).is_ok());
    }

    #[tokio::test]
    async fn test_bound_port_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(is_port_in_use("127.0.0.1", port).await);

        let config = ServerConfig::new("127.0.0.1", port);
        let result = validate_ports_available(&config).await;
        assert!(matches!(result, Err(ServerError::PortInUse { port: p, .. }) if p == port));
    }
}
