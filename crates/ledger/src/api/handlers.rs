//! API handlers for ledger HTTP endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use common::{DataResponse, DivisionOrderId, ErrorResponse};

use crate::error::LedgerError;
use crate::ledger::OwnershipLedger;
use crate::types::{AllocationEntry, DivisionOrder, DivisionOrderSummary, LedgerSnapshot};

pub struct LedgerApiState {
    pub ledger: Arc<OwnershipLedger>,
}

type ApiResult<T> = Result<Json<DataResponse<T>>, (StatusCode, Json<ErrorResponse>)>;

/// Initial allocation import request
#[derive(Debug, Deserialize)]
pub struct AllocateRequest {
    pub asset_reference: String,
    pub owners: Vec<AllocationEntry>,
}

/// Map a ledger error to an HTTP status and error body
pub fn error_response(e: &LedgerError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match e {
        LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        LedgerError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
        LedgerError::InsufficientInterest { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_INTEREST")
        }
        LedgerError::OverAllocated { .. } => (StatusCode::BAD_REQUEST, "OVER_ALLOCATED"),
        LedgerError::InvalidAllocation(_) => (StatusCode::BAD_REQUEST, "INVALID_ALLOCATION"),
        LedgerError::InvalidTransfer(_) => (StatusCode::BAD_REQUEST, "INVALID_TRANSFER"),
        LedgerError::Retired(_) => (StatusCode::CONFLICT, "RETIRED"),
        LedgerError::InvariantViolation(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INVARIANT_VIOLATION")
        }
        LedgerError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
    };

    let mut body = ErrorResponse::new(code, e.to_string());
    if let LedgerError::Conflict { expected, actual, .. } = e {
        body = body.with_details(serde_json::json!({ "expected": expected, "actual": actual }));
    }
    (status, Json(body))
}

/// Import an initial allocation
pub async fn allocate(
    State(state): State<Arc<LedgerApiState>>,
    Json(req): Json<AllocateRequest>,
) -> ApiResult<DivisionOrder> {
    state
        .ledger
        .allocate(req.asset_reference, req.owners)
        .await
        .map(|order| Json(DataResponse::new(order)))
        .map_err(|e| error_response(&e))
}

/// List division orders
pub async fn list_division_orders(
    State(state): State<Arc<LedgerApiState>>,
) -> ApiResult<Vec<DivisionOrderSummary>> {
    state
        .ledger
        .list()
        .await
        .map(|list| Json(DataResponse::new(list)))
        .map_err(|e| error_response(&e))
}

/// Current version and owners of a division order
pub async fn get_division_order(
    State(state): State<Arc<LedgerApiState>>,
    Path(id): Path<DivisionOrderId>,
) -> ApiResult<LedgerSnapshot> {
    state
        .ledger
        .get_interests(id)
        .await
        .map(|snapshot| Json(DataResponse::new(snapshot)))
        .map_err(|e| error_response(&e))
}

/// Soft-retire a division order
pub async fn retire_division_order(
    State(state): State<Arc<LedgerApiState>>,
    Path(id): Path<DivisionOrderId>,
) -> ApiResult<LedgerSnapshot> {
    state
        .ledger
        .retire(id)
        .await
        .map(|order| Json(DataResponse::new(order.snapshot())))
        .map_err(|e| error_response(&e))
}
