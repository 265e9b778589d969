//! Liveness and dependency health

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Result;

/// Reachability of a dependency such as the database or payment service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub component: String,
    pub address: String,
    pub healthy: bool,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

/// Shared state behind the health routes
#[derive(Clone)]
pub struct HealthState {
    pub service_name: String,
    pub start_time: Instant,
    components: Arc<tokio::sync::RwLock<Vec<ComponentStatus>>>,
}

impl HealthState {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            start_time: Instant::now(),
            components: Arc::new(tokio::sync::RwLock::new(Vec::new())),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Replace the entry for `status.component`
    pub async fn update_component(&self, status: ComponentStatus) {
        let mut components = self.components.write().await;
        components.retain(|c| c.component != status.component);
        components.push(status);
    }

    pub async fn components(&self) -> Vec<ComponentStatus> {
        self.components.read().await.clone()
    }

    pub async fn is_healthy(&self) -> bool {
        self.components.read().await.iter().all(|c| c.healthy)
    }

    /// Poll an HTTP dependency's `/health` until `shutdown` fires
    pub fn spawn_http_probe(
        &self,
        client: HealthClient,
        component: impl Into<String>,
        base_url: impl Into<String>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        let component = component.into();
        let base_url = base_url.into();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let status = client.check_http(&component, &base_url).await;
                        if !status.healthy {
                            warn!(component = %component, error = ?status.error, "Dependency unhealthy");
                        }
                        state.update_component(status).await;
                    }
                }
            }
            debug!(component = %component, "Health probe stopped");
        })
    }
}

/// Liveness: always 200 while the process serves requests
pub async fn health_handler(State(state): State<Arc<HealthState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
    }))
}

/// Readiness: 503 while any dependency is down
pub async fn detailed_health_handler(
    State(state): State<Arc<HealthState>>,
) -> (StatusCode, Json<Value>) {
    let components = state.components().await;
    let all_healthy = components.iter().all(|c| c.healthy);
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let health = json!({
        "status": if all_healthy { "healthy" } else { "degraded" },
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
        "components": components,
    });

    (status_code, Json(health))
}

pub fn health_routes(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/health/detailed", get(detailed_health_handler))
        .with_state(state)
}

/// Reusable HTTP client for dependency checks
#[derive(Clone)]
pub struct HealthClient {
    client: reqwest::Client,
}

impl HealthClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// GET `{base_url}/health`; any 2xx counts as healthy
    pub async fn check_http(&self, component: &str, base_url: &str) -> ComponentStatus {
        let start = Instant::now();
        let health_url = format!("{}/health", base_url.trim_end_matches('/'));

        let (healthy, error) = match self.client.get(&health_url).send().await {
            Ok(response) if response.status().is_success() => (true, None),
            Ok(response) => (false, Some(format!("HTTP {}", response.status()))),
            Err(e) => (false, Some(e.to_string())),
        };

        ComponentStatus {
            component: component.to_string(),
            address: base_url.to_string(),
            healthy,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, healthy: bool) -> ComponentStatus {
        ComponentStatus {
            component: name.to_string(),
            address: "localhost:5432".to_string(),
            healthy,
            latency_ms: None,
            error: (!healthy).then(|| "Connection refused".to_string()),
        }
    }

    #[tokio::test]
    async fn test_component_updates_replace_previous_entry() {
        let state = HealthState::new("wellshare");
        assert!(state.is_healthy().await);

        state.update_component(component("postgres", false)).await;
        assert!(!state.is_healthy().await);

        state.update_component(component("postgres", true)).await;
        assert!(state.is_healthy().await);
        assert_eq!(state.components().await.len(), 1);
    }

    #[tokio::test]
    async fn test_detailed_handler_reports_degraded() {
        let state = Arc::new(HealthState::new("wellshare"));
        state.update_component(component("payments", false)).await;

        let (code, Json(body)) = detailed_health_handler(State(state)).await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
    }

    #[tokio::test]
    async fn test_unreachable_dependency_is_unhealthy() {
        let client = HealthClient::new(Duration::from_millis(200)).unwrap();
        let status = client.check_http("payments", "http://127.0.0.1:1").await;
        assert!(!status.healthy);
        assert!(status.error.is_some());
    }
}
