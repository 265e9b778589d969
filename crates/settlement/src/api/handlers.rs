//! API handlers for settlement HTTP endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;

use common::{DataResponse, ErrorResponse, TransactionId, TransferId};

use crate::error::SettlementError;
use crate::machine::SettlementStateMachine;
use crate::types::{Cancellation, Closing, DealTerms, DueDiligence, EarnestDeposit, Funding, Transaction};

/// Header carrying the caller's idempotency key
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

pub struct SettlementApiState {
    pub machine: Arc<SettlementStateMachine>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<DataResponse<T>>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct AttachTransferRequest {
    pub transfer_id: TransferId,
}

fn error_response(e: &SettlementError) -> ApiError {
    let (status, code) = match e {
        SettlementError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        SettlementError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
        SettlementError::IdempotencyConflict { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "IDEMPOTENCY_CONFLICT")
        }
        SettlementError::InvalidIdempotencyKey(_) => {
            (StatusCode::BAD_REQUEST, "INVALID_IDEMPOTENCY_KEY")
        }
        SettlementError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
        SettlementError::PaymentNotCleared { .. } => {
            (StatusCode::PAYMENT_REQUIRED, "PAYMENT_NOT_CLEARED")
        }
        SettlementError::PaymentUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "PAYMENT_UNAVAILABLE")
        }
        SettlementError::Finalization { .. } => (StatusCode::CONFLICT, "FINALIZATION_FAILED"),
        SettlementError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        SettlementError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
    };

    let mut body = ErrorResponse::new(code, e.to_string());
    if let SettlementError::InvalidTransition { operation, expected, actual, .. } = e {
        body = body.with_details(serde_json::json!({
            "operation": operation,
            "expected": expected,
            "actual": actual,
        }));
    }
    (status, Json(body))
}

fn idempotency_key(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| {
            error_response(&SettlementError::InvalidIdempotencyKey(
                "Idempotency-Key header is required".to_string(),
            ))
        })
}

fn respond(result: Result<Transaction, SettlementError>) -> ApiResult<Transaction> {
    result
        .map(|tx| Json(DataResponse::new(tx)))
        .map_err(|e| error_response(&e))
}

/// Initiate a deal
pub async fn initiate(
    State(state): State<Arc<SettlementApiState>>,
    Json(terms): Json<DealTerms>,
) -> ApiResult<Transaction> {
    respond(state.machine.initiate(terms).await)
}

/// List deals
pub async fn list_transactions(State(state): State<Arc<SettlementApiState>>) -> ApiResult<Vec<Transaction>> {
    state
        .machine
        .list()
        .await
        .map(|list| Json(DataResponse::new(list)))
        .map_err(|e| error_response(&e))
}

/// Get a deal
pub async fn get_transaction(
    State(state): State<Arc<SettlementApiState>>,
    Path(id): Path<TransactionId>,
) -> ApiResult<Transaction> {
    respond(state.machine.get(id).await)
}

/// Link an ownership transfer
pub async fn attach_transfer(
    State(state): State<Arc<SettlementApiState>>,
    Path(id): Path<TransactionId>,
    Json(req): Json<AttachTransferRequest>,
) -> ApiResult<Transaction> {
    respond(state.machine.attach_transfer(id, req.transfer_id).await)
}

/// Deposit earnest
pub async fn deposit_earnest(
    State(state): State<Arc<SettlementApiState>>,
    Path(id): Path<TransactionId>,
    headers: HeaderMap,
    Json(payload): Json<EarnestDeposit>,
) -> ApiResult<Transaction> {
    let key = idempotency_key(&headers)?;
    respond(state.machine.deposit_earnest(id, payload, &key).await)
}

/// Complete due diligence
pub async fn complete_due_diligence(
    State(state): State<Arc<SettlementApiState>>,
    Path(id): Path<TransactionId>,
    headers: HeaderMap,
    Json(payload): Json<DueDiligence>,
) -> ApiResult<Transaction> {
    let key = idempotency_key(&headers)?;
    respond(state.machine.complete_due_diligence(id, payload, &key).await)
}

/// Fund
pub async fn fund(
    State(state): State<Arc<SettlementApiState>>,
    Path(id): Path<TransactionId>,
    headers: HeaderMap,
    Json(payload): Json<Funding>,
) -> ApiResult<Transaction> {
    let key = idempotency_key(&headers)?;
    respond(state.machine.fund(id, payload, &key).await)
}

/// Close and finalize linked transfers
pub async fn close(
    State(state): State<Arc<SettlementApiState>>,
    Path(id): Path<TransactionId>,
    headers: HeaderMap,
    Json(payload): Json<Closing>,
) -> ApiResult<Transaction> {
    let key = idempotency_key(&headers)?;
    respond(state.machine.close(id, payload, &key).await)
}

/// Cancel
pub async fn cancel(
    State(state): State<Arc<SettlementApiState>>,
    Path(id): Path<TransactionId>,
    headers: HeaderMap,
    Json(payload): Json<Cancellation>,
) -> ApiResult<Transaction> {
    let key = idempotency_key(&headers)?;
    respond(state.machine.cancel(id, payload.reason, &key).await)
}
