//! HTTP routes for the ownership ledger API

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::*;
use crate::ledger::OwnershipLedger;

/// Create the ledger router
///
/// Routes:
/// - POST /api/v1/division-orders            - Import an initial allocation
/// - GET  /api/v1/division-orders            - List division orders
/// - GET  /api/v1/division-orders/:id        - Ledger version and owners
/// - POST /api/v1/division-orders/:id/retire - Soft-retire a division order
pub fn create_router(ledger: Arc<OwnershipLedger>) -> Router {
    let state = Arc::new(LedgerApiState { ledger });

    Router::new()
        .route(
            "/api/v1/division-orders",
            post(allocate).get(list_division_orders),
        )
        .route("/api/v1/division-orders/:id", get(get_division_order))
        .route("/api/v1/division-orders/:id/retire", post(retire_division_order))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt as _;

    use common::{DecimalInterest, DivisionOrderId, OwnerId};

    use crate::error::LedgerError;
    use crate::types::AllocationEntry;

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn allocation(shares: &[&str]) -> Request<Body> {
        let owners: Vec<_> = shares
            .iter()
            .map(|s| AllocationEntry {
                party: OwnerId::new().into(),
                decimal_interest: s.parse::<DecimalInterest>().unwrap(),
            })
            .collect();
        let body = json!({ "asset_reference": "WELL-NM-5521", "owners": owners });
        Request::post("/api/v1/division-orders")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_allocate_then_read_interests() {
        let router = create_router(Arc::new(OwnershipLedger::in_memory()));

        let (status, created) = send(&router, allocation(&["0.5", "0.375", "0.125"])).await;
        assert_eq!(status, StatusCode::OK);
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let (status, snapshot) = send(
            &router,
            Request::get(format!("/api/v1/division-orders/{}", id)).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["data"]["version"], 1);
        assert_eq!(snapshot["data"]["owners"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_failures_map_to_status_codes() {
        let router = create_router(Arc::new(OwnershipLedger::in_memory()));

        let (status, body) = send(&router, allocation(&["0.7", "0.4"])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "OVER_ALLOCATED");

        let (status, body) = send(
            &router,
            Request::get(format!("/api/v1/division-orders/{}", DivisionOrderId::new()))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_retire_is_visible_on_read() {
        let router = create_router(Arc::new(OwnershipLedger::in_memory()));
        let (_, created) = send(&router, allocation(&["1"])).await;
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let (status, retired) = send(
            &router,
            Request::post(format!("/api/v1/division-orders/{}/retire", id)).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(retired["data"]["retired"], true);
        assert_eq!(retired["data"]["version"], 2);
    }

    #[test]
    fn test_conflict_carries_versions() {
        let (status, body) = error_response(&LedgerError::Conflict {
            division_order_id: DivisionOrderId::new(),
            expected: 3,
            actual: 4,
        });
        assert_eq!(status, StatusCode::CONFLICT);
        let details = body.0.error.details.unwrap();
        assert_eq!(details["expected"], 3);
        assert_eq!(details["actual"], 4);

        let (status, body) = error_response(&LedgerError::InsufficientInterest {
            division_order_id: DivisionOrderId::new(),
            owner: OwnerId::new(),
            available: DecimalInterest::ZERO,
            requested: DecimalInterest::ONE,
        });
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.0.error.code, "INSUFFICIENT_INTEREST");
    }
}
