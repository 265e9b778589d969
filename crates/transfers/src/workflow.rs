//! Transfer workflow - proposal, approval and application of transfers

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use common::{DivisionOrderId, Party, TransferId};
use ledger::{LedgerError, OwnershipLedger};
use observability::EngineMetrics;

use crate::error::{Result, TransferError};
use crate::store::{InMemoryTransferStore, TransferStore};
use crate::types::{OwnershipTransfer, ProposeTransfer, TransferStatus};

/// Retry policy for applying transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Ledger attempts before a version conflict is surfaced
    pub max_apply_attempts: u32,
    /// Base backoff, multiplied by the attempt number
    pub retry_backoff: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_apply_attempts: 5,
            retry_backoff: Duration::from_millis(10),
        }
    }
}

/// Transfer workflow
pub struct TransferWorkflow {
    store: Arc<dyn TransferStore>,
    ledger: Arc<OwnershipLedger>,
    config: WorkflowConfig,
    metrics: EngineMetrics,
}

impl TransferWorkflow {
    /// Create a new TransferWorkflow
    pub fn new(store: Arc<dyn TransferStore>, ledger: Arc<OwnershipLedger>, config: WorkflowConfig) -> Self {
        Self {
            store,
            ledger,
            config,
            metrics: EngineMetrics,
        }
    }

    /// Create a workflow with an in-memory store and default retry policy
    pub fn in_memory(ledger: Arc<OwnershipLedger>) -> Self {
        Self::new(Arc::new(InMemoryTransferStore::new()), ledger, WorkflowConfig::default())
    }

    /// Ledger this workflow applies transfers to
    pub fn ledger(&self) -> &Arc<OwnershipLedger> {
        &self.ledger
    }

    /// Propose a transfer
    ///
    /// Reads the ledger to validate the source owner but never mutates it.
    pub async fn propose(&self, req: ProposeTransfer) -> Result<OwnershipTransfer> {
        if req.interest_amount.is_zero() {
            return Err(TransferError::Validation(
                "interest amount must be greater than zero".to_string(),
            ));
        }
        req.to
            .validate()
            .map_err(|e| TransferError::Validation(e.to_string()))?;
        if req.to == Party::Owner(req.from_owner_id) {
            return Err(TransferError::Validation(
                "cannot transfer interest to the same owner".to_string(),
            ));
        }

        let order = match self.ledger.get(req.division_order_id).await {
            Ok(order) => order,
            Err(LedgerError::NotFound(id)) => {
                return Err(TransferError::Validation(format!("unknown division order {}", id)))
            }
            Err(e) => return Err(e.into()),
        };
        if order.retired {
            return Err(TransferError::Validation(format!(
                "division order {} is retired",
                order.id
            )));
        }

        let held = order
            .active_interest_of(&Party::Owner(req.from_owner_id))
            .map(|i| i.decimal_interest)
            .ok_or_else(|| {
                TransferError::Validation(format!(
                    "owner {} holds no active interest in division order {}",
                    req.from_owner_id, order.id
                ))
            })?;
        if req.interest_amount > held {
            return Err(TransferError::Validation(format!(
                "requested {} exceeds current interest {}",
                req.interest_amount, held
            )));
        }

        let transfer = OwnershipTransfer::pending(req);
        self.store.insert(&transfer).await?;

        tracing::info!(
            transfer_id = %transfer.id,
            division_order_id = %transfer.division_order_id,
            from = %transfer.from_owner_id,
            to = %transfer.to,
            amount = %transfer.interest_amount,
            "Transfer proposed"
        );
        self.metrics.transfer_proposed();

        Ok(transfer)
    }

    /// Get a transfer by id
    pub async fn get(&self, id: TransferId) -> Result<OwnershipTransfer> {
        self.store.get(id).await?.ok_or(TransferError::NotFound(id))
    }

    /// List transfers on a division order
    pub async fn list(
        &self,
        division_order_id: DivisionOrderId,
        status: Option<TransferStatus>,
    ) -> Result<Vec<OwnershipTransfer>> {
        self.store.list(Some(division_order_id), status).await
    }

    /// Approve a pending transfer; re-approval is a no-op
    pub async fn approve(&self, id: TransferId) -> Result<OwnershipTransfer> {
        loop {
            let mut transfer = self.get(id).await?;
            match transfer.status {
                TransferStatus::Approved => return Ok(transfer),
                TransferStatus::Pending => {}
                actual => {
                    return Err(TransferError::InvalidTransition {
                        transfer_id: id,
                        operation: "approve",
                        actual,
                    })
                }
            }

            transfer.status = TransferStatus::Approved;
            transfer.approved_at = Some(Utc::now());
            match self.store.compare_and_set(&transfer, TransferStatus::Pending).await {
                Ok(()) => {
                    tracing::info!(transfer_id = %id, "Transfer approved");
                    return Ok(transfer);
                }
                // Someone else moved it; re-read and decide again.
                Err(TransferError::StatusConflict { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Reject a pending transfer; rejecting twice is a no-op
    ///
    /// Approved transfers cannot be rejected by callers.
    pub async fn reject(&self, id: TransferId, reason: impl Into<String>) -> Result<OwnershipTransfer> {
        let reason = reason.into();
        loop {
            let transfer = self.get(id).await?;
            match transfer.status {
                TransferStatus::Rejected => return Ok(transfer),
                TransferStatus::Pending => {}
                actual => {
                    return Err(TransferError::InvalidTransition {
                        transfer_id: id,
                        operation: "reject",
                        actual,
                    })
                }
            }

            match self.mark_rejected(transfer, TransferStatus::Pending, &reason).await {
                Ok(transfer) => {
                    self.metrics.transfer_rejected("caller");
                    return Ok(transfer);
                }
                Err(TransferError::StatusConflict { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Apply an approved transfer to the ledger
    ///
    /// Version conflicts are retried up to the configured budget with a
    /// linear backoff. Insufficient interest rejects the transfer and is
    /// not retried. Applying an already applied transfer returns it.
    pub async fn apply(&self, id: TransferId) -> Result<OwnershipTransfer> {
        let transfer = self.get(id).await?;
        match transfer.status {
            TransferStatus::Applied => return Ok(transfer),
            TransferStatus::Approved => {}
            actual => {
                return Err(TransferError::InvalidTransition {
                    transfer_id: id,
                    operation: "apply",
                    actual,
                })
            }
        }

        let instruction = transfer.instruction();
        let attempts = self.config.max_apply_attempts.max(1);
        for attempt in 1..=attempts {
            let version = self.ledger.get(transfer.division_order_id).await?.version;
            match self
                .ledger
                .apply_transfer(transfer.division_order_id, &instruction, version)
                .await
            {
                Ok(new_version) => return self.mark_applied(transfer, new_version).await,
                Err(LedgerError::Conflict { expected, actual, .. }) => {
                    tracing::debug!(
                        transfer_id = %id,
                        attempt,
                        expected,
                        actual,
                        "Ledger version moved, retrying"
                    );
                    self.metrics.apply_retry();
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_backoff * attempt).await;
                    }
                }
                Err(LedgerError::InsufficientInterest { available, requested, .. }) => {
                    let reason = format!(
                        "insufficient interest at application: holds {}, requested {}",
                        available, requested
                    );
                    self.reject_after_failed_apply(id, &reason).await?;
                    self.metrics.transfer_rejected("insufficient_interest");
                    return Err(TransferError::InsufficientInterest {
                        transfer_id: id,
                        available,
                        requested,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(transfer_id = %id, attempts, "Transfer apply gave up after sustained contention");
        Err(TransferError::Conflict {
            transfer_id: id,
            attempts,
        })
    }

    async fn mark_applied(&self, mut transfer: OwnershipTransfer, version: u64) -> Result<OwnershipTransfer> {
        transfer.status = TransferStatus::Applied;
        transfer.applied_version = Some(version);
        transfer.applied_at = Some(Utc::now());

        match self.store.compare_and_set(&transfer, TransferStatus::Approved).await {
            Ok(()) => {
                tracing::info!(
                    transfer_id = %transfer.id,
                    division_order_id = %transfer.division_order_id,
                    version,
                    "Transfer applied"
                );
                Ok(transfer)
            }
            // A concurrent apply of the same transfer won; the ledger
            // deduplicated ours, so its record is the answer.
            Err(TransferError::StatusConflict {
                actual: TransferStatus::Applied,
                ..
            }) => self.get(transfer.id).await,
            Err(e) => Err(e),
        }
    }

    async fn reject_after_failed_apply(&self, id: TransferId, reason: &str) -> Result<()> {
        let transfer = self.get(id).await?;
        if transfer.status != TransferStatus::Approved {
            return Ok(());
        }
        match self.mark_rejected(transfer, TransferStatus::Approved, reason).await {
            Ok(_) | Err(TransferError::StatusConflict { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn mark_rejected(
        &self,
        mut transfer: OwnershipTransfer,
        expected: TransferStatus,
        reason: &str,
    ) -> Result<OwnershipTransfer> {
        transfer.status = TransferStatus::Rejected;
        transfer.rejection_reason = Some(reason.to_string());
        transfer.rejected_at = Some(Utc::now());
        self.store.compare_and_set(&transfer, expected).await?;

        tracing::warn!(transfer_id = %transfer.id, reason, "Transfer rejected");
        Ok(transfer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use common::{DecimalInterest, OwnerId};
    use ledger::{AllocationEntry, DivisionOrder};

    fn interest(s: &str) -> DecimalInterest {
        s.parse().unwrap()
    }

    struct Fixture {
        workflow: TransferWorkflow,
        ledger: Arc<OwnershipLedger>,
        order: DivisionOrder,
        a: OwnerId,
        b: OwnerId,
    }

    async fn fixture() -> Fixture {
        let ledger = Arc::new(OwnershipLedger::in_memory());
        let a = OwnerId::new();
        let b = OwnerId::new();
        let order = ledger
            .allocate(
                "LEASE-OK-117",
                vec![
                    AllocationEntry { party: a.into(), decimal_interest: interest("0.6") },
                    AllocationEntry { party: b.into(), decimal_interest: interest("0.4") },
                ],
            )
            .await
            .unwrap();
        Fixture {
            workflow: TransferWorkflow::in_memory(ledger.clone()),
            ledger,
            order,
            a,
            b,
        }
    }

    fn proposal(f: &Fixture, to: impl Into<Party>, amount: &str) -> ProposeTransfer {
        ProposeTransfer {
            division_order_id: f.order.id,
            from_owner_id: f.a,
            to: to.into(),
            interest_amount: interest(amount),
            transfer_type: Default::default(),
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let f = fixture().await;
        let c = OwnerId::new();

        let proposed = f.workflow.propose(proposal(&f, c, "0.25")).await.unwrap();
        assert_eq!(proposed.status, TransferStatus::Pending);
        assert_eq!(f.ledger.get(f.order.id).await.unwrap().version, 1);

        let approved = f.workflow.approve(proposed.id).await.unwrap();
        assert_eq!(approved.status, TransferStatus::Approved);

        let applied = f.workflow.apply(proposed.id).await.unwrap();
        assert_eq!(applied.status, TransferStatus::Applied);
        assert_eq!(applied.applied_version, Some(2));

        let order = f.ledger.get(f.order.id).await.unwrap();
        assert_eq!(order.interest_of_owner(f.a), interest("0.35"));
        assert_eq!(order.interest_of_owner(c), interest("0.25"));
        assert_eq!(order.active_total(), DecimalInterest::ONE);
    }

    #[tokio::test]
    async fn test_propose_rejects_amount_above_holding() {
        let f = fixture().await;
        let result = f.workflow.propose(proposal(&f, f.b, "0.7")).await;
        assert_matches!(result, Err(TransferError::Validation(_)));
        assert_eq!(f.ledger.get(f.order.id).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_propose_validation() {
        let f = fixture().await;
        assert_matches!(
            f.workflow.propose(proposal(&f, f.b, "0")).await,
            Err(TransferError::Validation(_))
        );
        assert_matches!(
            f.workflow.propose(proposal(&f, f.a, "0.1")).await,
            Err(TransferError::Validation(_))
        );
        assert_matches!(
            f.workflow
                .propose(proposal(&f, Party::External(" ".to_string()), "0.1"))
                .await,
            Err(TransferError::Validation(_))
        );

        let mut stranger = proposal(&f, f.b, "0.1");
        stranger.from_owner_id = OwnerId::new();
        assert_matches!(
            f.workflow.propose(stranger).await,
            Err(TransferError::Validation(_))
        );

        let mut unknown = proposal(&f, f.b, "0.1");
        unknown.division_order_id = DivisionOrderId::new();
        assert_matches!(
            f.workflow.propose(unknown).await,
            Err(TransferError::Validation(_))
        );
    }

    #[tokio::test]
    async fn test_apply_requires_approval() {
        let f = fixture().await;
        let t = f.workflow.propose(proposal(&f, f.b, "0.1")).await.unwrap();
        assert_matches!(
            f.workflow.apply(t.id).await,
            Err(TransferError::InvalidTransition { actual: TransferStatus::Pending, .. })
        );
    }

    #[tokio::test]
    async fn test_approve_and_apply_are_idempotent() {
        let f = fixture().await;
        let t = f.workflow.propose(proposal(&f, f.b, "0.1")).await.unwrap();
        f.workflow.approve(t.id).await.unwrap();
        f.workflow.approve(t.id).await.unwrap();
        let first = f.workflow.apply(t.id).await.unwrap();
        let second = f.workflow.apply(t.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(f.ledger.get(f.order.id).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_reject_rules() {
        let f = fixture().await;
        let pending = f.workflow.propose(proposal(&f, f.b, "0.1")).await.unwrap();
        let rejected = f.workflow.reject(pending.id, "buyer withdrew").await.unwrap();
        assert_eq!(rejected.status, TransferStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("buyer withdrew"));
        f.workflow.reject(pending.id, "again").await.unwrap();
        assert_matches!(
            f.workflow.approve(pending.id).await,
            Err(TransferError::InvalidTransition { .. })
        );

        let approved = f.workflow.propose(proposal(&f, f.b, "0.1")).await.unwrap();
        f.workflow.approve(approved.id).await.unwrap();
        assert_matches!(
            f.workflow.reject(approved.id, "changed mind").await,
            Err(TransferError::InvalidTransition { actual: TransferStatus::Approved, .. })
        );
    }

    #[tokio::test]
    async fn test_insufficient_interest_at_apply_rejects_transfer() {
        let f = fixture().await;
        let first = f.workflow.propose(proposal(&f, f.b, "0.5")).await.unwrap();
        let second = f.workflow.propose(proposal(&f, f.b, "0.5")).await.unwrap();
        f.workflow.approve(first.id).await.unwrap();
        f.workflow.approve(second.id).await.unwrap();

        f.workflow.apply(first.id).await.unwrap();
        let result = f.workflow.apply(second.id).await;
        assert_matches!(result, Err(TransferError::InsufficientInterest { .. }));

        let second = f.workflow.get(second.id).await.unwrap();
        assert_eq!(second.status, TransferStatus::Rejected);
        assert!(second.rejection_reason.is_some());

        let order = f.ledger.get(f.order.id).await.unwrap();
        assert_eq!(order.interest_of_owner(f.a), interest("0.1"));
        assert_eq!(order.active_total(), DecimalInterest::ONE);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let f = fixture().await;
        let t1 = f.workflow.propose(proposal(&f, f.b, "0.1")).await.unwrap();
        f.workflow.propose(proposal(&f, f.b, "0.1")).await.unwrap();
        f.workflow.approve(t1.id).await.unwrap();

        let all = f.workflow.list(f.order.id, None).await.unwrap();
        let approved = f
            .workflow
            .list(f.order.id, Some(TransferStatus::Approved))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].id, t1.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_applies_conserve_interest() {
        let f = fixture().await;
        let workflow = Arc::new(TransferWorkflow::new(
            Arc::new(InMemoryTransferStore::new()),
            f.ledger.clone(),
            WorkflowConfig {
                max_apply_attempts: 50,
                retry_backoff: Duration::from_millis(1),
            },
        ));

        // Eight approved transfers of 0.1 against a 0.6 holding.
        let mut ids = Vec::new();
        for _ in 0..8 {
            let t = workflow.propose(proposal(&f, OwnerId::new(), "0.1")).await.unwrap();
            workflow.approve(t.id).await.unwrap();
            ids.push(t.id);
        }

        let handles: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let workflow = workflow.clone();
                tokio::spawn(async move { workflow.apply(id).await })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(t) => {
                    assert_eq!(t.status, TransferStatus::Applied);
                    applied += 1;
                }
                Err(e) => assert_matches!(
                    e,
                    TransferError::InsufficientInterest { .. } | TransferError::Conflict { .. }
                ),
            }
        }

        let order = f.ledger.get(f.order.id).await.unwrap();
        assert!(applied <= 6);
        assert_eq!(order.active_total(), DecimalInterest::ONE);
        assert_eq!(order.version, 1 + applied as u64);
        assert_eq!(
            order.interest_of_owner(f.a),
            interest("0.6").checked_sub(DecimalInterest::from_units(10_000_000 * applied as u64)).unwrap()
        );
    }
}
