//! HTTP routes for the transfer API

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::*;
use crate::workflow::TransferWorkflow;

/// Create the transfer router
///
/// Routes:
/// - POST /api/v1/transfers                     - Propose a transfer
/// - GET  /api/v1/transfers/:id                 - Get a transfer
/// - POST /api/v1/transfers/:id/approve         - Approve a pending transfer
/// - POST /api/v1/transfers/:id/apply           - Apply an approved transfer
/// - POST /api/v1/transfers/:id/reject          - Reject a pending transfer
/// - GET  /api/v1/division-orders/:id/transfers - Transfers on a division order
pub fn create_router(workflow: Arc<TransferWorkflow>) -> Router {
    let state = Arc::new(TransferApiState { workflow });

    Router::new()
        .route("/api/v1/transfers", post(propose_transfer))
        .route("/api/v1/transfers/:id", get(get_transfer))
        .route("/api/v1/transfers/:id/approve", post(approve_transfer))
        .route("/api/v1/transfers/:id/apply", post(apply_transfer))
        .route("/api/v1/transfers/:id/reject", post(reject_transfer))
        .route("/api/v1/division-orders/:id/transfers", get(list_transfers))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt as _;

    use common::{DecimalInterest, DivisionOrderId, OwnerId, TransferId};
    use ledger::{AllocationEntry, OwnershipLedger};

    use crate::types::ProposeTransfer;

    struct Harness {
        router: Router,
        order: DivisionOrderId,
        seller: OwnerId,
    }

    async fn harness() -> Harness {
        let ledger = Arc::new(OwnershipLedger::in_memory());
        let seller = OwnerId::new();
        let order = ledger
            .allocate(
                "WELL-CO-7781",
                vec![AllocationEntry {
                    party: seller.into(),
                    decimal_interest: DecimalInterest::ONE,
                }],
            )
            .await
            .unwrap();
        Harness {
            router: create_router(Arc::new(TransferWorkflow::in_memory(ledger))),
            order: order.id,
            seller,
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post(uri: String, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    impl Harness {
        async fn propose(&self, amount: &str) -> (StatusCode, Value) {
            let req = ProposeTransfer {
                division_order_id: self.order,
                from_owner_id: self.seller,
                to: OwnerId::new().into(),
                interest_amount: amount.parse().unwrap(),
                transfer_type: Default::default(),
                metadata: Default::default(),
            };
            send(
                &self.router,
                post("/api/v1/transfers".to_string(), serde_json::to_value(req).unwrap()),
            )
            .await
        }

        async fn step(&self, id: &str, action: &str) -> (StatusCode, Value) {
            send(&self.router, post(format!("/api/v1/transfers/{}/{}", id, action), json!({}))).await
        }
    }

    fn id_of(body: &Value) -> String {
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_propose_approve_apply() {
        let h = harness().await;
        let (status, proposed) = h.propose("0.25").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(proposed["data"]["status"], "pending");
        let id = id_of(&proposed);

        let (status, _) = h.step(&id, "approve").await;
        assert_eq!(status, StatusCode::OK);
        let (status, applied) = h.step(&id, "apply").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(applied["data"]["status"], "applied");
        assert_eq!(applied["data"]["applied_version"], 2);

        let (status, listed) = send(
            &h.router,
            Request::get(format!("/api/v1/division-orders/{}/transfers", h.order))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failures_map_to_status_codes() {
        let h = harness().await;

        let (status, body) = h.propose("1.5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = h.step(&TransferId::new().to_string(), "approve").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, pending) = h.propose("0.1").await;
        let (status, body) = h.step(&id_of(&pending), "apply").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
        assert_eq!(body["error"]["details"]["actual"], "pending");
    }

    #[tokio::test]
    async fn test_overdrawn_apply_is_unprocessable() {
        let h = harness().await;
        let (_, first) = h.propose("0.6").await;
        let (_, second) = h.propose("0.6").await;
        let (first, second) = (id_of(&first), id_of(&second));
        h.step(&first, "approve").await;
        h.step(&second, "approve").await;

        let (status, _) = h.step(&first, "apply").await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = h.step(&second, "apply").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "INSUFFICIENT_INTEREST");

        let (_, rejected) = send(
            &h.router,
            Request::get(format!("/api/v1/transfers/{}", second)).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(rejected["data"]["status"], "rejected");
    }
}
