//! Ledger change events
//!
//! Published on a broadcast channel after each committed mutation so that
//! downstream consumers (audit, notifications) can follow the ledger.

use serde::{Deserialize, Serialize};

use common::{DecimalInterest, DivisionOrderId, OwnerId, Party, TransferId};

/// Event emitted by the ownership ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Initial allocation imported
    Allocated {
        division_order_id: DivisionOrderId,
        owner_count: usize,
        total_interest: DecimalInterest,
        version: u64,
    },

    /// Transfer committed to the ledger
    TransferApplied {
        division_order_id: DivisionOrderId,
        transfer_id: TransferId,
        from_owner_id: OwnerId,
        to: Party,
        interest_amount: DecimalInterest,
        version: u64,
    },

    /// Ledger soft-retired
    Retired {
        division_order_id: DivisionOrderId,
        version: u64,
    },
}

impl LedgerEvent {
    /// Division order the event belongs to
    pub fn division_order_id(&self) -> DivisionOrderId {
        match self {
            LedgerEvent::Allocated { division_order_id, .. } => *division_order_id,
            LedgerEvent::TransferApplied { division_order_id, .. } => *division_order_id,
            LedgerEvent::Retired { division_order_id, .. } => *division_order_id,
        }
    }

    /// Ledger version after the event
    pub fn version(&self) -> u64 {
        match self {
            LedgerEvent::Allocated { version, .. } => *version,
            LedgerEvent::TransferApplied { version, .. } => *version,
            LedgerEvent::Retired { version, .. } => *version,
        }
    }
}
