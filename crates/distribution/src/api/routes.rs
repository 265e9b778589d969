//! HTTP routes for the distribution API

use std::sync::Arc;

use axum::{routing::post, Router};

use super::handlers::*;
use crate::service::DistributionService;

/// Create the distribution router
///
/// Routes:
/// - POST /api/v1/division-orders/:id/distributions/preview - Read-only preview
pub fn create_router(service: Arc<DistributionService>) -> Router {
    let state = Arc::new(DistributionApiState { service });

    Router::new()
        .route(
            "/api/v1/division-orders/:id/distributions/preview",
            post(preview_distribution),
        )
        .with_state(state)
}
