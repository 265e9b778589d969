//! Ledger-backed distribution previews

use std::sync::Arc;

use chrono::Utc;

use common::DivisionOrderId;
use ledger::OwnershipLedger;
use observability::EngineMetrics;

use crate::calculator;
use crate::error::Result;
use crate::types::{DistributionRequest, RevenueDistribution};

/// Reads a ledger snapshot and runs the calculator over it
///
/// Never mutates the ledger.
pub struct DistributionService {
    ledger: Arc<OwnershipLedger>,
    minor_unit_decimals: u32,
    metrics: EngineMetrics,
}

impl DistributionService {
    pub fn new(ledger: Arc<OwnershipLedger>, minor_unit_decimals: u32) -> Self {
        Self {
            ledger,
            minor_unit_decimals,
            metrics: EngineMetrics,
        }
    }

    /// Preview a distribution against the current ledger state
    pub async fn preview(
        &self,
        division_order_id: DivisionOrderId,
        request: DistributionRequest,
    ) -> Result<RevenueDistribution> {
        let snapshot = self.ledger.get_interests(division_order_id).await?;
        let date = request
            .distribution_date
            .unwrap_or_else(|| Utc::now().date_naive());

        let mut distribution = calculator::calculate(
            &snapshot.owners,
            request.total_revenue,
            request.revenue_type,
            date,
        )?;
        distribution.division_order_id = Some(division_order_id);
        distribution.ledger_version = Some(snapshot.version);

        if !distribution.unallocated_interest.is_zero() {
            tracing::warn!(
                division_order_id = %division_order_id,
                unallocated = %distribution.unallocated_interest,
                "Division order is under-allocated; unallocated interest receives no revenue"
            );
        }
        tracing::info!(
            division_order_id = %division_order_id,
            version = snapshot.version,
            total = %request.total_revenue.format(self.minor_unit_decimals),
            revenue_type = %distribution.revenue_type,
            owners = distribution.payments.len(),
            "Distribution previewed"
        );
        self.metrics.distribution_preview();

        Ok(distribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DistributionError;
    use crate::types::RevenueType;
    use assert_matches::assert_matches;
    use common::{DecimalInterest, Money, OwnerId};
    use ledger::{AllocationEntry, LedgerError};

    fn entry(interest: &str) -> AllocationEntry {
        AllocationEntry {
            party: OwnerId::new().into(),
            decimal_interest: interest.parse().unwrap(),
        }
    }

    fn request(minor: i64) -> DistributionRequest {
        DistributionRequest {
            total_revenue: Money::from_minor(minor),
            revenue_type: RevenueType::Oil,
            distribution_date: None,
        }
    }

    #[tokio::test]
    async fn test_preview_carries_ledger_version() {
        let ledger = Arc::new(OwnershipLedger::in_memory());
        let order = ledger
            .allocate("WELL-ND-3", vec![entry("0.6"), entry("0.4")])
            .await
            .unwrap();
        let service = DistributionService::new(ledger, 2);

        let dist = service.preview(order.id, request(10_000)).await.unwrap();
        assert_eq!(dist.division_order_id, Some(order.id));
        assert_eq!(dist.ledger_version, Some(1));
        assert_eq!(dist.total_paid(), Money::from_minor(10_000));
        assert_eq!(dist.unallocated_interest, DecimalInterest::ZERO);
    }

    #[tokio::test]
    async fn test_preview_reports_unallocated_interest() {
        let ledger = Arc::new(OwnershipLedger::in_memory());
        let order = ledger.allocate("WELL-ND-4", vec![entry("0.75")]).await.unwrap();
        let service = DistributionService::new(ledger, 2);

        let dist = service.preview(order.id, request(400)).await.unwrap();
        assert_eq!(dist.payments[0].payment_amount, Money::from_minor(400));
        assert_eq!(dist.unallocated_interest, "0.25".parse().unwrap());
    }

    #[tokio::test]
    async fn test_preview_unknown_ledger() {
        let service = DistributionService::new(Arc::new(OwnershipLedger::in_memory()), 2);
        let result = service.preview(DivisionOrderId::new(), request(1)).await;
        assert_matches!(result, Err(DistributionError::Ledger(LedgerError::NotFound(_))));
    }
}
