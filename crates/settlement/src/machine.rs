//! Settlement state machine - drives a deal through its lifecycle

use std::sync::Arc;

use chrono::Utc;

use common::{Money, TransactionId, TransferId};
use ledger::KeyedLocks;
use observability::EngineMetrics;

use crate::error::{Result, SettlementError};
use crate::finalizer::{DealLink, TransferFinalizer};
use crate::idempotency::{self, IdempotencyRecord, KeyDecision};
use crate::payments::{PaymentCheck, PaymentKind, PaymentVerifier};
use crate::store::{IdempotencyStore, TransactionStore};
use crate::types::{
    Cancellation, Closing, DealTerms, DueDiligence, EarnestDeposit, Funding, Operation, Transaction,
    TransitionInput,
};

/// Default upper bound on idempotency key length, in bytes
pub const DEFAULT_MAX_IDEMPOTENCY_KEY_LENGTH: usize = 255;

/// Settlement engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementConfig {
    pub max_idempotency_key_length: usize,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            max_idempotency_key_length: DEFAULT_MAX_IDEMPOTENCY_KEY_LENGTH,
        }
    }
}

/// Settlement state machine
///
/// Each keyed transition runs under a per-transaction lock:
/// 1. Validate the key and fingerprint the request
/// 2. Replay a stored result, or fail on a mismatched fingerprint
/// 3. Check the exact predecessor state
/// 4. Consult collaborators (payments, transfer finalization)
/// 5. Persist with a compare-and-swap on the version
/// 6. Record the result under the key
pub struct SettlementStateMachine {
    transactions: Arc<dyn TransactionStore>,
    keys: Arc<dyn IdempotencyStore>,
    payments: Arc<dyn PaymentVerifier>,
    finalizer: Arc<dyn TransferFinalizer>,
    locks: KeyedLocks<TransactionId>,
    config: SettlementConfig,
    metrics: EngineMetrics,
}

impl SettlementStateMachine {
    /// Create a new SettlementStateMachine
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        keys: Arc<dyn IdempotencyStore>,
        payments: Arc<dyn PaymentVerifier>,
        finalizer: Arc<dyn TransferFinalizer>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            transactions,
            keys,
            payments,
            finalizer,
            locks: KeyedLocks::new(),
            config,
            metrics: EngineMetrics,
        }
    }

    /// Start a deal in `Created`
    pub async fn initiate(&self, terms: DealTerms) -> Result<Transaction> {
        if terms.buyer_id == terms.seller_id {
            return Err(SettlementError::Validation(
                "buyer and seller must differ".to_string(),
            ));
        }
        if terms.asset_id.trim().is_empty() {
            return Err(SettlementError::Validation("asset id is required".to_string()));
        }
        let link = DealLink {
            seller_id: terms.seller_id,
            division_order_id: terms.division_order_id,
        };
        for &transfer_id in &terms.transfer_ids {
            self.check_linkable(transfer_id, link).await?;
        }

        let transaction = Transaction::initiate(terms);
        self.transactions.insert(&transaction).await?;

        tracing::info!(
            transaction_id = %transaction.id,
            buyer = %transaction.buyer_id,
            seller = %transaction.seller_id,
            asset = %transaction.asset_id,
            transfers = transaction.transfer_ids.len(),
            "Deal initiated"
        );
        Ok(transaction)
    }

    /// Get a deal by id
    pub async fn get(&self, id: TransactionId) -> Result<Transaction> {
        self.transactions
            .get(id)
            .await?
            .ok_or(SettlementError::NotFound(id))
    }

    /// List all deals
    pub async fn list(&self) -> Result<Vec<Transaction>> {
        self.transactions.list().await
    }

    /// Link an ownership transfer to a deal that is not yet funded
    ///
    /// Linking the same transfer twice is a no-op.
    pub async fn attach_transfer(&self, id: TransactionId, transfer_id: TransferId) -> Result<Transaction> {
        let _guard = self.locks.lock(id).await;

        let mut transaction = self.get(id).await?;
        if transaction.transfer_ids.contains(&transfer_id) {
            return Ok(transaction);
        }
        if !transaction.accepts_transfers() {
            return Err(SettlementError::InvalidTransition {
                transaction_id: id,
                operation: "attach_transfer",
                expected: "a state before funded",
                actual: transaction.status,
            });
        }
        let link = DealLink {
            seller_id: transaction.seller_id,
            division_order_id: transaction.division_order_id,
        };
        self.check_linkable(transfer_id, link).await?;

        let expected = transaction.version;
        transaction.transfer_ids.push(transfer_id);
        transaction.version += 1;
        transaction.updated_at = Utc::now();
        self.transactions.compare_and_swap(&transaction, expected).await?;

        tracing::info!(transaction_id = %id, transfer_id = %transfer_id, "Transfer linked to deal");
        Ok(transaction)
    }

    /// `Created -> EarnestDeposited`
    pub async fn deposit_earnest(&self, id: TransactionId, payload: EarnestDeposit, key: &str) -> Result<Transaction> {
        self.transition(id, TransitionInput::DepositEarnest(payload), key).await
    }

    /// `EarnestDeposited -> DueDiligenceComplete`
    pub async fn complete_due_diligence(&self, id: TransactionId, payload: DueDiligence, key: &str) -> Result<Transaction> {
        self.transition(id, TransitionInput::CompleteDueDiligence(payload), key).await
    }

    /// `DueDiligenceComplete -> Funded`
    pub async fn fund(&self, id: TransactionId, payload: Funding, key: &str) -> Result<Transaction> {
        self.transition(id, TransitionInput::Fund(payload), key).await
    }

    /// `Funded -> Closed`, finalizing linked transfers first
    pub async fn close(&self, id: TransactionId, payload: Closing, key: &str) -> Result<Transaction> {
        self.transition(id, TransitionInput::Close(payload), key).await
    }

    /// Any non-terminal state `-> Cancelled`
    pub async fn cancel(&self, id: TransactionId, reason: impl Into<String>, key: &str) -> Result<Transaction> {
        let payload = Cancellation { reason: reason.into() };
        self.transition(id, TransitionInput::Cancel(payload), key).await
    }

    async fn transition(&self, id: TransactionId, input: TransitionInput, key: &str) -> Result<Transaction> {
        idempotency::validate_key(key, self.config.max_idempotency_key_length)?;
        let operation = input.operation();
        let fingerprint = idempotency::fingerprint(&input)?;

        let _guard = self.locks.lock(id).await;

        let mut transaction = self.get(id).await?;
        let existing = self.keys.get(id, key).await?;
        match idempotency::decide(existing, id, key, &fingerprint) {
            Ok(KeyDecision::Replay(response)) => {
                tracing::debug!(transaction_id = %id, operation = %operation, key, "Replaying keyed result");
                self.metrics.idempotent_replay(operation.as_str());
                return Ok(*response);
            }
            Ok(KeyDecision::Execute) => {}
            Err(e) => {
                tracing::warn!(transaction_id = %id, operation = %operation, key, "Idempotency key reused with a different payload");
                self.metrics.idempotency_conflict(operation.as_str());
                return Err(e);
            }
        }

        self.check_predecessor(&transaction, operation)?;
        self.validate_payload(&transaction, &input).await?;

        let from = transaction.status;
        let expected = transaction.version;
        transaction.advance(input, key);
        self.transactions.compare_and_swap(&transaction, expected).await?;

        self.keys
            .record(&IdempotencyRecord {
                transaction_id: id,
                key: key.to_string(),
                operation,
                fingerprint,
                response: transaction.clone(),
                recorded_at: Utc::now(),
            })
            .await?;

        tracing::info!(
            transaction_id = %id,
            operation = %operation,
            from = %from,
            to = %transaction.status,
            version = transaction.version,
            "Settlement transition"
        );
        self.metrics.settlement_transition(operation.as_str());

        Ok(transaction)
    }

    fn check_predecessor(&self, transaction: &Transaction, operation: Operation) -> Result<()> {
        let allowed = match operation.requires() {
            Some(required) => transaction.status == required,
            None => !transaction.status.is_terminal(),
        };
        if allowed {
            return Ok(());
        }
        Err(SettlementError::InvalidTransition {
            transaction_id: transaction.id,
            operation: operation.as_str(),
            expected: operation.requires().map_or("a non-terminal state", |s| s.as_str()),
            actual: transaction.status,
        })
    }

    async fn validate_payload(&self, transaction: &Transaction, input: &TransitionInput) -> Result<()> {
        match input {
            TransitionInput::DepositEarnest(p) => {
                self.verify_payment(transaction.id, PaymentKind::Earnest, p.amount, &p.payment_reference)
                    .await
            }
            TransitionInput::Fund(p) => {
                self.verify_payment(transaction.id, PaymentKind::Funding, p.amount, &p.payment_reference)
                    .await
            }
            TransitionInput::CompleteDueDiligence(p) => {
                require_text(&p.reviewed_by, "reviewed_by")
            }
            TransitionInput::Cancel(p) => require_text(&p.reason, "reason"),
            TransitionInput::Close(_) => {
                self.finalizer
                    .finalize(&transaction.transfer_ids)
                    .await
                    .map_err(|f| {
                        tracing::warn!(
                            transaction_id = %transaction.id,
                            transfer_id = %f.transfer_id,
                            reason = %f.reason,
                            "Close aborted; deal stays funded"
                        );
                        SettlementError::Finalization {
                            transfer_id: f.transfer_id,
                            reason: f.reason,
                        }
                    })
            }
        }
    }

    async fn verify_payment(
        &self,
        transaction_id: TransactionId,
        kind: PaymentKind,
        amount: Money,
        payment_reference: &str,
    ) -> Result<()> {
        if amount.is_negative() || amount.is_zero() {
            return Err(SettlementError::Validation(
                "payment amount must be greater than zero".to_string(),
            ));
        }
        require_text(payment_reference, "payment_reference")?;

        let check = PaymentCheck {
            transaction_id,
            kind,
            amount,
            payment_reference: payment_reference.to_string(),
        };
        if !self.payments.verify(&check).await? {
            return Err(SettlementError::PaymentNotCleared {
                payment_reference: payment_reference.to_string(),
            });
        }
        Ok(())
    }

    async fn check_linkable(&self, transfer_id: TransferId, link: DealLink) -> Result<()> {
        self.finalizer
            .check_linkable(transfer_id, link)
            .await
            .map_err(|f| SettlementError::Validation(format!(
                "transfer {} cannot be linked: {}",
                f.transfer_id, f.reason
            )))
    }
}

fn require_text(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SettlementError::Validation(format!("{} is required", field)));
    }
    Ok(())
}
