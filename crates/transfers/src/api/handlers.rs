//! API handlers for transfer HTTP endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use common::{DataResponse, DivisionOrderId, ErrorResponse, TransferId};

use crate::error::TransferError;
use crate::types::{OwnershipTransfer, ProposeTransfer, TransferStatus};
use crate::workflow::TransferWorkflow;

pub struct TransferApiState {
    pub workflow: Arc<TransferWorkflow>,
}

type ApiResult<T> = Result<Json<DataResponse<T>>, (StatusCode, Json<ErrorResponse>)>;

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ListTransfersQuery {
    pub status: Option<TransferStatus>,
}

/// Map a transfer error to an HTTP status and error body
pub fn error_response(e: &TransferError) -> (StatusCode, Json<ErrorResponse>) {
    if let TransferError::Ledger(inner) = e {
        return ledger::api::error_response(inner);
    }

    let (status, code) = match e {
        TransferError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        TransferError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        TransferError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
        TransferError::InsufficientInterest { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_INTEREST")
        }
        TransferError::Conflict { .. } | TransferError::StatusConflict { .. } => {
            (StatusCode::CONFLICT, "CONFLICT")
        }
        TransferError::Ledger(_) | TransferError::Storage(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
        }
    };

    let mut body = ErrorResponse::new(code, e.to_string());
    if let TransferError::InvalidTransition { operation, actual, .. } = e {
        body = body.with_details(serde_json::json!({ "operation": operation, "actual": actual }));
    }
    (status, Json(body))
}

fn respond(result: Result<OwnershipTransfer, TransferError>) -> ApiResult<OwnershipTransfer> {
    result
        .map(|t| Json(DataResponse::new(t)))
        .map_err(|e| error_response(&e))
}

/// Propose a transfer
pub async fn propose_transfer(
    State(state): State<Arc<TransferApiState>>,
    Json(req): Json<ProposeTransfer>,
) -> ApiResult<OwnershipTransfer> {
    respond(state.workflow.propose(req).await)
}

/// Get a transfer
pub async fn get_transfer(
    State(state): State<Arc<TransferApiState>>,
    Path(id): Path<TransferId>,
) -> ApiResult<OwnershipTransfer> {
    respond(state.workflow.get(id).await)
}

/// Approve a pending transfer
pub async fn approve_transfer(
    State(state): State<Arc<TransferApiState>>,
    Path(id): Path<TransferId>,
) -> ApiResult<OwnershipTransfer> {
    respond(state.workflow.approve(id).await)
}

/// Apply an approved transfer
pub async fn apply_transfer(
    State(state): State<Arc<TransferApiState>>,
    Path(id): Path<TransferId>,
) -> ApiResult<OwnershipTransfer> {
    respond(state.workflow.apply(id).await)
}

/// Reject a pending transfer
pub async fn reject_transfer(
    State(state): State<Arc<TransferApiState>>,
    Path(id): Path<TransferId>,
    Json(req): Json<RejectRequest>,
) -> ApiResult<OwnershipTransfer> {
    respond(state.workflow.reject(id, req.reason).await)
}

/// List transfers on a division order
pub async fn list_transfers(
    State(state): State<Arc<TransferApiState>>,
    Path(id): Path<DivisionOrderId>,
    Query(query): Query<ListTransfersQuery>,
) -> ApiResult<Vec<OwnershipTransfer>> {
    state
        .workflow
        .list(id, query.status)
        .await
        .map(|list| Json(DataResponse::new(list)))
        .map_err(|e| error_response(&e))
}
