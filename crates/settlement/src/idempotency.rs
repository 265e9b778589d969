//! Idempotency keys for settlement transitions
//!
//! A key is scoped to one transaction. The first successful transition
//! under a key stores the request fingerprint and the resulting
//! transaction; a retry with the same fingerprint gets that stored result
//! back, a retry with a different fingerprint is a protocol error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use common::TransactionId;

use crate::error::{Result, SettlementError};
use crate::types::{Operation, Transaction, TransitionInput};

/// Stored outcome of a keyed transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub transaction_id: TransactionId,
    pub key: String,
    pub operation: Operation,
    /// SHA-256 of the canonical `{operation, payload}` JSON
    pub fingerprint: String,
    /// Transaction as returned by the original call
    pub response: Transaction,
    pub recorded_at: DateTime<Utc>,
}

/// What to do with an incoming keyed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDecision {
    /// Key unseen; run the transition
    Execute,
    /// Same request seen before; return its result
    Replay(Box<Transaction>),
}

/// Fingerprint a transition request
///
/// `serde_json::Value` keeps object keys sorted, so the serialized form is
/// canonical regardless of field order in the caller's JSON.
pub fn fingerprint(input: &TransitionInput) -> Result<String> {
    let canonical = serde_json::to_value(input)?.to_string();
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Check key shape: non-empty, no surrounding whitespace, bounded length
pub fn validate_key(key: &str, max_len: usize) -> Result<()> {
    if key.is_empty() {
        return Err(SettlementError::InvalidIdempotencyKey(
            "idempotency key is required".to_string(),
        ));
    }
    if key.trim() != key {
        return Err(SettlementError::InvalidIdempotencyKey(
            "idempotency key must not have surrounding whitespace".to_string(),
        ));
    }
    if key.len() > max_len {
        return Err(SettlementError::InvalidIdempotencyKey(format!(
            "idempotency key is {} bytes, limit is {}",
            key.len(),
            max_len
        )));
    }
    Ok(())
}

/// Decide between executing and replaying
pub fn decide(
    existing: Option<IdempotencyRecord>,
    transaction_id: TransactionId,
    key: &str,
    fingerprint: &str,
) -> Result<KeyDecision> {
    match existing {
        None => Ok(KeyDecision::Execute),
        Some(record) if record.fingerprint == fingerprint => {
            Ok(KeyDecision::Replay(Box::new(record.response)))
        }
        Some(_) => Err(SettlementError::IdempotencyConflict {
            transaction_id,
            key: key.to_string(),
        }),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cancellation, DealTerms, EarnestDeposit};
    use assert_matches::assert_matches;
    use common::{Money, OwnerId};

    fn earnest(amount: i64) -> TransitionInput {
        TransitionInput::DepositEarnest(EarnestDeposit {
            amount: Money::from_minor(amount),
            payment_reference: "ACH-2231".to_string(),
        })
    }

    fn record(fingerprint: String) -> IdempotencyRecord {
        let tx = Transaction::initiate(DealTerms {
            buyer_id: OwnerId::new(),
            seller_id: OwnerId::new(),
            asset_id: "LISTING-1".to_string(),
            division_order_id: None,
            transfer_ids: vec![],
        });
        IdempotencyRecord {
            transaction_id: tx.id,
            key: "k-1".to_string(),
            operation: Operation::DepositEarnest,
            fingerprint,
            response: tx,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_fingerprint_is_stable_and_payload_sensitive() {
        let a = fingerprint(&earnest(500_000)).unwrap();
        let b = fingerprint(&earnest(500_000)).unwrap();
        let c = fingerprint(&earnest(500_001)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_covers_operation() {
        let cancel = TransitionInput::Cancel(Cancellation { reason: "x".to_string() });
        assert_ne!(fingerprint(&cancel).unwrap(), fingerprint(&earnest(1)).unwrap());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("2b1f6c1e-7d0a-4a57-9a55-1f1f0b3b2a10", 64).is_ok());
        assert_matches!(validate_key("", 64), Err(SettlementError::InvalidIdempotencyKey(_)));
        assert_matches!(validate_key(" k ", 64), Err(SettlementError::InvalidIdempotencyKey(_)));
        assert_matches!(validate_key("abcdef", 5), Err(SettlementError::InvalidIdempotencyKey(_)));
    }

    #[test]
    fn test_decide() {
        let fp = fingerprint(&earnest(100)).unwrap();
        let rec = record(fp.clone());
        let id = rec.transaction_id;

        assert_eq!(decide(None, id, "k-1", &fp).unwrap(), KeyDecision::Execute);
        assert_matches!(decide(Some(rec.clone()), id, "k-1", &fp), Ok(KeyDecision::Replay(_)));
        assert_matches!(
            decide(Some(rec), id, "k-1", "different"),
            Err(SettlementError::IdempotencyConflict { .. })
        );
    }
}
