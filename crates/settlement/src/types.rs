//! Settlement domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{DivisionOrderId, Money, OwnerId, TransactionId, TransferId};

/// Lifecycle status of a deal
///
/// `Created -> EarnestDeposited -> DueDiligenceComplete -> Funded -> Closed`,
/// with `Cancelled` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Created,
    EarnestDeposited,
    DueDiligenceComplete,
    Funded,
    Closed,
    Cancelled,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Created => "created",
            SettlementStatus::EarnestDeposited => "earnest_deposited",
            SettlementStatus::DueDiligenceComplete => "due_diligence_complete",
            SettlementStatus::Funded => "funded",
            SettlementStatus::Closed => "closed",
            SettlementStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SettlementStatus::Closed | SettlementStatus::Cancelled)
    }
}

impl std::fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyed settlement operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    DepositEarnest,
    CompleteDueDiligence,
    Fund,
    Close,
    Cancel,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::DepositEarnest => "deposit_earnest",
            Operation::CompleteDueDiligence => "complete_due_diligence",
            Operation::Fund => "fund",
            Operation::Close => "close",
            Operation::Cancel => "cancel",
        }
    }

    /// Exact predecessor state for forward operations; `None` for cancel
    pub fn requires(&self) -> Option<SettlementStatus> {
        match self {
            Operation::DepositEarnest => Some(SettlementStatus::Created),
            Operation::CompleteDueDiligence => Some(SettlementStatus::EarnestDeposited),
            Operation::Fund => Some(SettlementStatus::DueDiligenceComplete),
            Operation::Close => Some(SettlementStatus::Funded),
            Operation::Cancel => None,
        }
    }

    pub fn target(&self) -> SettlementStatus {
        match self {
            Operation::DepositEarnest => SettlementStatus::EarnestDeposited,
            Operation::CompleteDueDiligence => SettlementStatus::DueDiligenceComplete,
            Operation::Fund => SettlementStatus::Funded,
            Operation::Close => SettlementStatus::Closed,
            Operation::Cancel => SettlementStatus::Cancelled,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terms a deal is initiated with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealTerms {
    pub buyer_id: OwnerId,
    pub seller_id: OwnerId,
    /// Listed asset being sold
    pub asset_id: String,
    pub division_order_id: Option<DivisionOrderId>,
    /// Ownership transfers finalized when the deal closes
    #[serde(default)]
    pub transfer_ids: Vec<TransferId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnestDeposit {
    pub amount: Money,
    pub payment_reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueDiligence {
    pub reviewed_by: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Funding {
    pub amount: Money,
    pub payment_reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Closing {
    #[serde(default)]
    pub recording_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub reason: String,
}

/// Operation plus its payload
///
/// Serializes as `{"operation": ..., "payload": ...}`, which is exactly
/// what the idempotency fingerprint hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "payload", rename_all = "snake_case")]
pub enum TransitionInput {
    DepositEarnest(EarnestDeposit),
    CompleteDueDiligence(DueDiligence),
    Fund(Funding),
    Close(Closing),
    Cancel(Cancellation),
}

impl TransitionInput {
    pub fn operation(&self) -> Operation {
        match self {
            TransitionInput::DepositEarnest(_) => Operation::DepositEarnest,
            TransitionInput::CompleteDueDiligence(_) => Operation::CompleteDueDiligence,
            TransitionInput::Fund(_) => Operation::Fund,
            TransitionInput::Close(_) => Operation::Close,
            TransitionInput::Cancel(_) => Operation::Cancel,
        }
    }
}

/// One entry of a deal's status history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: SettlementStatus,
    pub to: SettlementStatus,
    pub at: DateTime<Utc>,
    pub idempotency_key: String,
}

/// Settlement envelope for a deal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub buyer_id: OwnerId,
    pub seller_id: OwnerId,
    pub asset_id: String,
    pub division_order_id: Option<DivisionOrderId>,
    pub transfer_ids: Vec<TransferId>,
    pub status: SettlementStatus,
    /// Optimistic concurrency version, incremented on every mutation
    pub version: u64,
    pub earnest: Option<EarnestDeposit>,
    pub due_diligence: Option<DueDiligence>,
    pub funding: Option<Funding>,
    pub closing: Option<Closing>,
    pub cancellation_reason: Option<String>,
    pub history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// New deal in `Created` at version 1
    pub fn initiate(terms: DealTerms) -> Self {
        let now = Utc::now();
        let mut transfer_ids = Vec::with_capacity(terms.transfer_ids.len());
        for id in terms.transfer_ids {
            if !transfer_ids.contains(&id) {
                transfer_ids.push(id);
            }
        }
        Self {
            id: TransactionId::new(),
            buyer_id: terms.buyer_id,
            seller_id: terms.seller_id,
            asset_id: terms.asset_id,
            division_order_id: terms.division_order_id,
            transfer_ids,
            status: SettlementStatus::Created,
            version: 1,
            earnest: None,
            due_diligence: None,
            funding: None,
            closing: None,
            cancellation_reason: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether transfers may still be linked
    pub fn accepts_transfers(&self) -> bool {
        matches!(
            self.status,
            SettlementStatus::Created
                | SettlementStatus::EarnestDeposited
                | SettlementStatus::DueDiligenceComplete
        )
    }

    /// Record the payload, move to the operation's target and bump the version
    pub(crate) fn advance(&mut self, input: TransitionInput, key: &str) {
        let now = Utc::now();
        let to = input.operation().target();
        match input {
            TransitionInput::DepositEarnest(p) => self.earnest = Some(p),
            TransitionInput::CompleteDueDiligence(p) => self.due_diligence = Some(p),
            TransitionInput::Fund(p) => self.funding = Some(p),
            TransitionInput::Close(p) => self.closing = Some(p),
            TransitionInput::Cancel(p) => self.cancellation_reason = Some(p.reason),
        }
        self.history.push(StatusChange {
            from: self.status,
            to,
            at: now,
            idempotency_key: key.to_string(),
        });
        self.status = to;
        self.version += 1;
        self.updated_at = now;
    }
}
