//! Common types used across WellShare
//!
//! This module provides the identifiers and party model shared by the
//! ledger, transfer, distribution and settlement crates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Identifier of a division order (one asset's ownership ledger)
    DivisionOrderId
);
define_id!(
    /// Identifier of a registered platform owner
    OwnerId
);
define_id!(
    /// Identifier of an ownership transfer
    TransferId
);
define_id!(
    /// Identifier of a settlement transaction (deal)
    TransactionId
);

/// Holder of an ownership interest.
///
/// An interest belongs either to a registered owner or to an unregistered
/// party known only by name. Exactly one of the two is ever set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Party {
    /// Registered owner
    Owner(OwnerId),
    /// Unregistered owner identified by name
    External(String),
}

impl Party {
    /// Registered owner id, if any
    pub fn owner_id(&self) -> Option<OwnerId> {
        match self {
            Party::Owner(id) => Some(*id),
            Party::External(_) => None,
        }
    }

    /// External name, if any
    pub fn external_name(&self) -> Option<&str> {
        match self {
            Party::Owner(_) => None,
            Party::External(name) => Some(name),
        }
    }

    /// Check structural validity (external names must not be blank)
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            Party::Owner(_) => Ok(()),
            Party::External(name) if name.trim().is_empty() => Err(
                crate::Error::invalid_input("external owner name must not be blank"),
            ),
            Party::External(_) => Ok(()),
        }
    }
}

impl From<OwnerId> for Party {
    fn from(id: OwnerId) -> Self {
        Party::Owner(id)
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Party::Owner(id) => write!(f, "owner:{}", id),
            Party::External(name) => write!(f, "external:{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_party_accessors() {
        let id = OwnerId::new();
        let owner = Party::from(id);
        assert_eq!(owner.owner_id(), Some(id));
        assert_eq!(owner.external_name(), None);

        let ext = Party::External("Estate of J. Smith".to_string());
        assert_eq!(ext.owner_id(), None);
        assert_eq!(ext.external_name(), Some("Estate of J. Smith"));
    }

    #[test]
    fn test_blank_external_name_rejected() {
        assert!(Party::External("   ".to_string()).validate().is_err());
        assert!(Party::External("Mesa Royalty LLC".to_string()).validate().is_ok());
    }

    #[test]
    fn test_party_ordering_is_deterministic() {
        let a = Party::Owner(OwnerId::from_uuid(Uuid::from_u128(1)));
        let b = Party::Owner(OwnerId::from_uuid(Uuid::from_u128(2)));
        let ext = Party::External("Alpha".to_string());
        assert!(a < b);
        assert!(b < ext);
    }

    #[test]
    fn test_party_serde_shape() {
        let ext = Party::External("Alpha".to_string());
        let json = serde_json::to_value(&ext).unwrap();
        assert_eq!(json["kind"], "external");
        assert_eq!(json["value"], "Alpha");
    }

    #[test]
    fn test_id_roundtrip_from_str() {
        let id = TransferId::new();
        let parsed: TransferId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }
}
