//! Distribution types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use common::{DecimalInterest, DivisionOrderId, Money, Party};

/// Product the revenue was earned on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RevenueType {
    #[default]
    Oil,
    Gas,
    Ngl,
    Condensate,
    Other,
}

impl std::fmt::Display for RevenueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RevenueType::Oil => "oil",
            RevenueType::Gas => "gas",
            RevenueType::Ngl => "ngl",
            RevenueType::Condensate => "condensate",
            RevenueType::Other => "other",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for RevenueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "oil" => Ok(RevenueType::Oil),
            "gas" => Ok(RevenueType::Gas),
            "ngl" => Ok(RevenueType::Ngl),
            "condensate" => Ok(RevenueType::Condensate),
            "other" => Ok(RevenueType::Other),
            other => Err(format!("unknown revenue type: {}", other)),
        }
    }
}

/// One owner's share fed into the calculator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerShare {
    pub party: Party,
    pub decimal_interest: DecimalInterest,
}

/// Payment line for one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerPayment {
    pub party: Party,
    pub decimal_interest: DecimalInterest,
    /// Rounded payment in minor units
    pub payment_amount: Money,
    /// Unrounded share in minor units, truncated to 8 decimals
    pub exact_share: String,
}

/// Request for a distribution preview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionRequest {
    /// Total revenue in minor units
    pub total_revenue: Money,
    #[serde(default)]
    pub revenue_type: RevenueType,
    /// Defaults to today (UTC)
    pub distribution_date: Option<NaiveDate>,
}

/// Computed per-owner payment schedule
///
/// `payments` always sums to `total_revenue` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueDistribution {
    pub division_order_id: Option<DivisionOrderId>,
    /// Ledger version the shares were read at
    pub ledger_version: Option<u64>,
    pub total_revenue: Money,
    pub revenue_type: RevenueType,
    pub distribution_date: NaiveDate,
    /// 1.0 minus the sum of interests paid; receives nothing
    pub unallocated_interest: DecimalInterest,
    pub payments: Vec<OwnerPayment>,
}

impl RevenueDistribution {
    /// Sum of every payment line
    pub fn total_paid(&self) -> Money {
        Money::checked_sum(self.payments.iter().map(|p| p.payment_amount)).unwrap_or(Money::ZERO)
    }
}
