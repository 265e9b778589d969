//! HTTP routes for the settlement API

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::*;
use crate::machine::SettlementStateMachine;

/// Create the settlement router
///
/// Keyed transitions read the `Idempotency-Key` header.
///
/// Routes:
/// - POST /api/v1/transactions                   - Initiate a deal
/// - GET  /api/v1/transactions                   - List deals
/// - GET  /api/v1/transactions/:id               - Get a deal
/// - POST /api/v1/transactions/:id/transfers     - Link an ownership transfer
/// - POST /api/v1/transactions/:id/earnest       - Deposit earnest
/// - POST /api/v1/transactions/:id/due-diligence - Complete due diligence
/// - POST /api/v1/transactions/:id/funding       - Fund
/// - POST /api/v1/transactions/:id/close         - Close and finalize transfers
/// - POST /api/v1/transactions/:id/cancel        - Cancel
pub fn create_router(machine: Arc<SettlementStateMachine>) -> Router {
    let state = Arc::new(SettlementApiState { machine });

    Router::new()
        .route("/api/v1/transactions", post(initiate).get(list_transactions))
        .route("/api/v1/transactions/:id", get(get_transaction))
        .route("/api/v1/transactions/:id/transfers", post(attach_transfer))
        .route("/api/v1/transactions/:id/earnest", post(deposit_earnest))
        .route("/api/v1/transactions/:id/due-diligence", post(complete_due_diligence))
        .route("/api/v1/transactions/:id/funding", post(fund))
        .route("/api/v1/transactions/:id/close", post(close))
        .route("/api/v1/transactions/:id/cancel", post(cancel))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body, Bytes};
    use axum::http::{HeaderValue, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt as _;

    use common::OwnerId;
    use ledger::OwnershipLedger;
    use transfers::TransferWorkflow;

    use crate::machine::SettlementConfig;
    use crate::payments::StaticPaymentVerifier;
    use crate::store::{InMemoryIdempotencyStore, InMemoryTransactionStore};
    use crate::types::DealTerms;

    fn router() -> Router {
        let workflow = TransferWorkflow::in_memory(Arc::new(OwnershipLedger::in_memory()));
        let machine = SettlementStateMachine::new(
            Arc::new(InMemoryTransactionStore::new()),
            Arc::new(InMemoryIdempotencyStore::new()),
            Arc::new(StaticPaymentVerifier::new()),
            Arc::new(workflow),
            SettlementConfig::default(),
        );
        create_router(Arc::new(machine))
    }

    fn post(uri: &str, body: Value, key: Option<HeaderValue>) -> Request<Body> {
        let mut builder = Request::post(uri).header("content-type", "application/json");
        if let Some(key) = key {
            builder = builder.header("idempotency-key", key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn key(value: &'static str) -> Option<HeaderValue> {
        Some(HeaderValue::from_static(value))
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, to_bytes(response.into_body(), usize::MAX).await.unwrap())
    }

    fn json_body(bytes: &Bytes) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    async fn open_deal(router: &Router) -> String {
        let terms = DealTerms {
            buyer_id: OwnerId::new(),
            seller_id: OwnerId::new(),
            asset_id: "LISTING-OK-0310".to_string(),
            division_order_id: None,
            transfer_ids: vec![],
        };
        let (status, body) = send(
            router,
            post("/api/v1/transactions", serde_json::to_value(terms).unwrap(), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        json_body(&body)["data"]["id"].as_str().unwrap().to_string()
    }

    fn earnest(amount: i64) -> Value {
        json!({ "amount": amount, "payment_reference": "ACH-31877" })
    }

    #[tokio::test]
    async fn test_keyed_transition_requires_header() {
        let router = router();
        let id = open_deal(&router).await;
        let uri = format!("/api/v1/transactions/{}/earnest", id);

        let (status, body) = send(&router, post(&uri, earnest(50_000), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body)["error"]["code"], "INVALID_IDEMPOTENCY_KEY");

        let not_utf8 = HeaderValue::from_bytes(&[0xfa, 0x6b, 0x65, 0x79]).unwrap();
        let (status, body) = send(&router, post(&uri, earnest(50_000), Some(not_utf8))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body)["error"]["code"], "INVALID_IDEMPOTENCY_KEY");

        // Nothing moved without a key.
        let (_, body) = send(
            &router,
            Request::get(format!("/api/v1/transactions/{}", id)).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(json_body(&body)["data"]["status"], "created");
    }

    #[tokio::test]
    async fn test_retry_with_same_key_returns_identical_body() {
        let router = router();
        let id = open_deal(&router).await;
        let uri = format!("/api/v1/transactions/{}/earnest", id);

        let (first_status, first) = send(&router, post(&uri, earnest(50_000), key("earnest-1"))).await;
        let (second_status, second) = send(&router, post(&uri, earnest(50_000), key("earnest-1"))).await;

        assert_eq!(first_status, StatusCode::OK);
        assert_eq!(second_status, StatusCode::OK);
        assert_eq!(first, second);
        assert_eq!(json_body(&first)["data"]["version"], 2);
    }

    #[tokio::test]
    async fn test_reused_key_with_other_payload_is_unprocessable() {
        let router = router();
        let id = open_deal(&router).await;
        let uri = format!("/api/v1/transactions/{}/earnest", id);

        send(&router, post(&uri, earnest(50_000), key("earnest-1"))).await;
        let (status, body) = send(&router, post(&uri, earnest(60_000), key("earnest-1"))).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(&body)["error"]["code"], "IDEMPOTENCY_CONFLICT");
    }

    #[tokio::test]
    async fn test_out_of_order_and_unknown_deal() {
        let router = router();
        let id = open_deal(&router).await;

        let funding = json!({ "amount": 9_000_000, "payment_reference": "WIRE-2210" });
        let (status, body) = send(
            &router,
            post(&format!("/api/v1/transactions/{}/funding", id), funding, key("fund-1")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        let body = json_body(&body);
        assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
        assert_eq!(body["error"]["details"]["operation"], "fund");
        assert_eq!(body["error"]["details"]["actual"], "created");

        let missing = common::TransactionId::new();
        let (status, _) = send(
            &router,
            post(&format!("/api/v1/transactions/{}/earnest", missing), earnest(1), key("e")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
