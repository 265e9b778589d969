//! API handlers for distribution HTTP endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use common::{DataResponse, DivisionOrderId, ErrorResponse};

use crate::error::DistributionError;
use crate::service::DistributionService;
use crate::types::{DistributionRequest, RevenueDistribution};

pub struct DistributionApiState {
    pub service: Arc<DistributionService>,
}

fn error_response(e: &DistributionError) -> (StatusCode, Json<ErrorResponse>) {
    match e {
        DistributionError::NoOwners => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::new("NO_OWNERS", e.to_string())),
        ),
        DistributionError::InvalidAmount(_) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("INVALID_AMOUNT", e.to_string())),
        ),
        DistributionError::Ledger(inner) => ledger::api::error_response(inner),
    }
}

/// Preview a revenue distribution
pub async fn preview_distribution(
    State(state): State<Arc<DistributionApiState>>,
    Path(id): Path<DivisionOrderId>,
    Json(req): Json<DistributionRequest>,
) -> Result<Json<DataResponse<RevenueDistribution>>, (StatusCode, Json<ErrorResponse>)> {
    state
        .service
        .preview(id, req)
        .await
        .map(|dist| Json(DataResponse::new(dist)))
        .map_err(|e| error_response(&e))
}
