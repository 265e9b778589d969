//! Ownership ledger domain types
//!
//! A [`DivisionOrder`] is the authoritative record of who owns what share
//! of one asset. Its mutation methods are pure: they validate, mutate, and
//! re-check conservation, but never touch storage or locks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{DecimalInterest, DivisionOrderId, OwnerId, Party, TransferId};

use crate::error::{LedgerError, Result};

/// Status of an interest record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestStatus {
    /// Counts toward the division order's total
    Active,
    /// Fully transferred away; kept for history
    Superseded,
}

impl std::fmt::Display for InterestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterestStatus::Active => write!(f, "active"),
            InterestStatus::Superseded => write!(f, "superseded"),
        }
    }
}

/// One holder's fractional interest in a division order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerInterest {
    /// Registered owner or external name
    pub party: Party,
    /// Fraction of the asset held
    pub decimal_interest: DecimalInterest,
    pub status: InterestStatus,
    pub updated_at: DateTime<Utc>,
}

impl OwnerInterest {
    /// Create a new active interest
    pub fn active(party: Party, decimal_interest: DecimalInterest) -> Self {
        Self {
            party,
            decimal_interest,
            status: InterestStatus::Active,
            updated_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == InterestStatus::Active
    }
}

/// Entry in an initial allocation import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub party: Party,
    pub decimal_interest: DecimalInterest,
}

/// Movement of interest requested of the ledger
///
/// Built by the transfer workflow from an approved transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInstruction {
    /// Transfer being applied; the ledger applies each id at most once
    pub transfer_id: TransferId,
    pub from_owner_id: OwnerId,
    pub to: Party,
    pub interest_amount: DecimalInterest,
}

/// Authoritative ownership record for one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionOrder {
    pub id: DivisionOrderId,
    /// Reference to the listed asset (well, lease or unit)
    pub asset_reference: String,
    /// Optimistic concurrency version, incremented on every mutation
    pub version: u64,
    /// Ordered interest records, superseded rows included
    pub interests: Vec<OwnerInterest>,
    /// Soft-retired when the asset is delisted
    pub retired: bool,
    /// Transfers already applied to this ledger
    #[serde(default)]
    pub applied_transfer_ids: Vec<TransferId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DivisionOrder {
    /// Build a division order from an initial allocation
    ///
    /// Checks: at least one entry, valid parties, no duplicate party,
    /// every interest within [0, 1], total within 1.0.
    pub fn from_allocation(
        asset_reference: impl Into<String>,
        entries: Vec<AllocationEntry>,
    ) -> Result<Self> {
        let asset_reference = asset_reference.into();
        if asset_reference.trim().is_empty() {
            return Err(LedgerError::InvalidAllocation(
                "asset reference is required".to_string(),
            ));
        }
        if entries.is_empty() {
            return Err(LedgerError::InvalidAllocation(
                "allocation must contain at least one owner".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for entry in &entries {
            entry
                .party
                .validate()
                .map_err(|e| LedgerError::InvalidAllocation(e.to_string()))?;
            if !seen.insert(&entry.party) {
                return Err(LedgerError::InvalidAllocation(format!(
                    "{} is listed more than once",
                    entry.party
                )));
            }
            if !entry.decimal_interest.is_at_most_whole() {
                return Err(LedgerError::InvalidAllocation(format!(
                    "interest {} for {} exceeds 1.0",
                    entry.decimal_interest, entry.party
                )));
            }
        }

        let total = DecimalInterest::checked_sum(entries.iter().map(|e| e.decimal_interest))
            .ok_or_else(|| LedgerError::InvalidAllocation("interest total overflowed".to_string()))?;
        if !total.is_at_most_whole() {
            return Err(LedgerError::OverAllocated { total });
        }

        let now = Utc::now();
        Ok(Self {
            id: DivisionOrderId::new(),
            asset_reference,
            version: 1,
            interests: entries
                .into_iter()
                .map(|e| OwnerInterest::active(e.party, e.decimal_interest))
                .collect(),
            retired: false,
            applied_transfer_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Sum of active interests
    pub fn active_total(&self) -> DecimalInterest {
        // Allocation caps the total at 1.0 and transfers conserve it, so the
        // sum of active rows cannot overflow u64.
        DecimalInterest::from_units(
            self.active_interests()
                .map(|i| i.decimal_interest.units())
                .sum(),
        )
    }

    /// Iterator over active interest records
    pub fn active_interests(&self) -> impl Iterator<Item = &OwnerInterest> {
        self.interests.iter().filter(|i| i.is_active())
    }

    /// Active record for a party, if any
    pub fn active_interest_of(&self, party: &Party) -> Option<&OwnerInterest> {
        self.active_interests().find(|i| &i.party == party)
    }

    /// Current interest held by a registered owner (zero if none)
    pub fn interest_of_owner(&self, owner: OwnerId) -> DecimalInterest {
        self.active_interest_of(&Party::Owner(owner))
            .map(|i| i.decimal_interest)
            .unwrap_or(DecimalInterest::ZERO)
    }

    /// Whether the given transfer has already been applied here
    pub fn has_applied(&self, transfer_id: TransferId) -> bool {
        self.applied_transfer_ids.contains(&transfer_id)
    }

    /// Move interest between parties and bump the version
    ///
    /// Decrements the source (superseding it at zero), creates or
    /// increments the destination, then re-checks that the active total
    /// is unchanged. On error `self` is left untouched.
    pub fn apply_transfer(&mut self, instruction: &TransferInstruction) -> Result<u64> {
        if self.retired {
            return Err(LedgerError::Retired(self.id));
        }
        if instruction.interest_amount.is_zero() {
            return Err(LedgerError::InvalidTransfer(
                "interest amount must be greater than zero".to_string(),
            ));
        }
        instruction
            .to
            .validate()
            .map_err(|e| LedgerError::InvalidTransfer(e.to_string()))?;
        let source_party = Party::Owner(instruction.from_owner_id);
        if instruction.to == source_party {
            return Err(LedgerError::InvalidTransfer(
                "source and destination are the same party".to_string(),
            ));
        }

        let available = self.interest_of_owner(instruction.from_owner_id);
        let remaining = available
            .checked_sub(instruction.interest_amount)
            .ok_or(LedgerError::InsufficientInterest {
                division_order_id: self.id,
                owner: instruction.from_owner_id,
                available,
                requested: instruction.interest_amount,
            })?;

        let before = self.active_total();
        let mut next = self.interests.clone();
        let now = Utc::now();

        let source = next
            .iter_mut()
            .find(|i| i.is_active() && i.party == source_party)
            .ok_or_else(|| {
                LedgerError::InvariantViolation("source interest vanished during transfer".to_string())
            })?;
        source.decimal_interest = remaining;
        source.updated_at = now;
        if remaining.is_zero() {
            source.status = InterestStatus::Superseded;
        }

        match next
            .iter_mut()
            .find(|i| i.is_active() && i.party == instruction.to)
        {
            Some(dest) => {
                dest.decimal_interest = dest
                    .decimal_interest
                    .checked_add(instruction.interest_amount)
                    .ok_or_else(|| {
                        LedgerError::InvariantViolation("destination interest overflowed".to_string())
                    })?;
                dest.updated_at = now;
            }
            None => next.push(OwnerInterest::active(
                instruction.to.clone(),
                instruction.interest_amount,
            )),
        }

        let after = DecimalInterest::from_units(
            next.iter()
                .filter(|i| i.is_active())
                .map(|i| i.decimal_interest.units())
                .sum(),
        );
        if after != before {
            return Err(LedgerError::InvariantViolation(format!(
                "active total changed from {} to {}",
                before, after
            )));
        }

        self.interests = next;
        self.applied_transfer_ids.push(instruction.transfer_id);
        self.version += 1;
        self.updated_at = now;
        Ok(self.version)
    }

    /// Soft-retire the ledger; returns false if it was already retired
    pub fn retire(&mut self) -> bool {
        if self.retired {
            return false;
        }
        self.retired = true;
        self.version += 1;
        self.updated_at = Utc::now();
        true
    }

    /// Read model for callers
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            division_order_id: self.id,
            asset_reference: self.asset_reference.clone(),
            version: self.version,
            retired: self.retired,
            owners: self.interests.clone(),
        }
    }

    /// Summary row for listings
    pub fn summary(&self) -> DivisionOrderSummary {
        DivisionOrderSummary {
            division_order_id: self.id,
            asset_reference: self.asset_reference.clone(),
            version: self.version,
            retired: self.retired,
            active_owner_count: self.active_interests().count(),
            allocated_interest: self.active_total(),
        }
    }
}

/// Ledger state as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub division_order_id: DivisionOrderId,
    pub asset_reference: String,
    pub version: u64,
    pub retired: bool,
    /// Ordered interest records, superseded rows included
    pub owners: Vec<OwnerInterest>,
}

impl LedgerSnapshot {
    /// Active interest records in ledger order
    pub fn active_owners(&self) -> Vec<OwnerInterest> {
        self.owners.iter().filter(|o| o.is_active()).cloned().collect()
    }
}

/// Listing row for a division order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionOrderSummary {
    pub division_order_id: DivisionOrderId,
    pub asset_reference: String,
    pub version: u64,
    pub retired: bool,
    pub active_owner_count: usize,
    pub allocated_interest: DecimalInterest,
}
