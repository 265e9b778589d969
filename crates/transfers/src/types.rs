//! Transfer domain types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{DecimalInterest, DivisionOrderId, OwnerId, Party, TransferId};
use ledger::TransferInstruction;

/// Reason ownership is changing hands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransferType {
    #[default]
    Sale,
    Inheritance,
    Gift,
    Other,
}

/// Transfer lifecycle status
///
/// `pending -> approved -> applied`, or `pending -> rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Approved,
    Applied,
    Rejected,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Approved => "approved",
            TransferStatus::Applied => "applied",
            TransferStatus::Rejected => "rejected",
        }
    }

    /// Applied and rejected transfers never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Applied | TransferStatus::Rejected)
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TransferStatus::Pending),
            "approved" => Ok(TransferStatus::Approved),
            "applied" => Ok(TransferStatus::Applied),
            "rejected" => Ok(TransferStatus::Rejected),
            other => Err(format!("unknown transfer status: {}", other)),
        }
    }
}

/// Request to propose a transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeTransfer {
    pub division_order_id: DivisionOrderId,
    pub from_owner_id: OwnerId,
    /// Registered owner or external name receiving the interest
    pub to: Party,
    pub interest_amount: DecimalInterest,
    #[serde(default)]
    pub transfer_type: TransferType,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// A proposed or applied movement of interest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipTransfer {
    pub id: TransferId,
    pub division_order_id: DivisionOrderId,
    pub from_owner_id: OwnerId,
    pub to: Party,
    pub interest_amount: DecimalInterest,
    pub transfer_type: TransferType,
    pub status: TransferStatus,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub rejection_reason: Option<String>,
    /// Ledger version produced by the application
    pub applied_version: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub applied_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl OwnershipTransfer {
    /// Create a pending transfer from a proposal
    pub fn pending(req: ProposeTransfer) -> Self {
        Self {
            id: TransferId::new(),
            division_order_id: req.division_order_id,
            from_owner_id: req.from_owner_id,
            to: req.to,
            interest_amount: req.interest_amount,
            transfer_type: req.transfer_type,
            status: TransferStatus::Pending,
            metadata: req.metadata,
            rejection_reason: None,
            applied_version: None,
            created_at: Utc::now(),
            approved_at: None,
            applied_at: None,
            rejected_at: None,
        }
    }

    /// Instruction handed to the ledger when applying
    pub fn instruction(&self) -> TransferInstruction {
        TransferInstruction {
            transfer_id: self.id,
            from_owner_id: self.from_owner_id,
            to: self.to.clone(),
            interest_amount: self.interest_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("Approved".parse::<TransferStatus>(), Ok(TransferStatus::Approved));
        assert_eq!(TransferStatus::Rejected.to_string(), "rejected");
        assert!("settled".parse::<TransferStatus>().is_err());
    }

    #[test]
    fn test_propose_request_defaults() {
        let json = serde_json::json!({
            "division_order_id": DivisionOrderId::new(),
            "from_owner_id": OwnerId::new(),
            "to": { "kind": "external", "value": "Hale Family Trust" },
            "interest_amount": "0.125"
        });
        let req: ProposeTransfer = serde_json::from_value(json).unwrap();
        assert_eq!(req.transfer_type, TransferType::Sale);
        assert!(req.metadata.is_empty());
        assert_eq!(req.interest_amount, "0.125".parse::<DecimalInterest>().unwrap());
    }
}
