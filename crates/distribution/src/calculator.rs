//! Largest-remainder revenue calculator
//!
//! Splits a revenue total across owners in proportion to the interests
//! present. Each raw share is truncated to the minor unit, then the
//! leftover units go one at a time to the owners with the largest
//! truncated remainder, ties broken by party ascending. The payments
//! therefore sum to the total exactly and no owner is off by more than
//! one minor unit from their exact share.
//!
//! Everything here is pure integer arithmetic.

use chrono::NaiveDate;

use common::{DecimalInterest, Money, INTEREST_SCALE};
use ledger::OwnerInterest;

use crate::error::{DistributionError, Result};
use crate::types::{OwnerPayment, OwnerShare, RevenueDistribution, RevenueType};

/// Compute payment lines for a set of owner shares
///
/// Lines come back in input order. Zero-interest owners get a zero line.
///
/// # Errors
/// - `InvalidAmount` if `total_revenue` is negative
/// - `NoOwners` if `shares` is empty or every interest is zero
pub fn allocate(shares: &[OwnerShare], total_revenue: Money) -> Result<Vec<OwnerPayment>> {
    if total_revenue.is_negative() {
        return Err(DistributionError::InvalidAmount(format!(
            "total revenue must not be negative, got {}",
            total_revenue
        )));
    }
    if shares.is_empty() {
        return Err(DistributionError::NoOwners);
    }

    let denominator: u128 = shares
        .iter()
        .map(|s| u128::from(s.decimal_interest.units()))
        .sum();
    if denominator == 0 {
        return Err(DistributionError::NoOwners);
    }

    let total = total_revenue.minor() as u128;
    let mut floors = Vec::with_capacity(shares.len());
    let mut remainders = Vec::with_capacity(shares.len());
    for share in shares {
        let numerator = total * u128::from(share.decimal_interest.units());
        floors.push(numerator / denominator);
        remainders.push(numerator % denominator);
    }

    let assigned: u128 = floors.iter().sum();
    // Each truncation loses less than one unit, so this is below shares.len().
    let leftover = (total - assigned) as usize;

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| {
        remainders[b]
            .cmp(&remainders[a])
            .then_with(|| shares[a].party.cmp(&shares[b].party))
    });
    for &index in order.iter().take(leftover) {
        floors[index] += 1;
    }

    shares
        .iter()
        .enumerate()
        .map(|(i, share)| {
            let amount = i64::try_from(floors[i]).map_err(|_| {
                DistributionError::InvalidAmount("payment exceeds representable range".to_string())
            })?;
            Ok(OwnerPayment {
                party: share.party.clone(),
                decimal_interest: share.decimal_interest,
                payment_amount: Money::from_minor(amount),
                exact_share: exact_share(total, share.decimal_interest, denominator),
            })
        })
        .collect()
}

/// Build a full distribution from ledger interest records
///
/// Only active records are paid; superseded rows are skipped.
pub fn calculate(
    owner_interests: &[OwnerInterest],
    total_revenue: Money,
    revenue_type: RevenueType,
    distribution_date: NaiveDate,
) -> Result<RevenueDistribution> {
    let shares: Vec<OwnerShare> = owner_interests
        .iter()
        .filter(|o| o.is_active())
        .map(|o| OwnerShare {
            party: o.party.clone(),
            decimal_interest: o.decimal_interest,
        })
        .collect();

    let payments = allocate(&shares, total_revenue)?;
    Ok(RevenueDistribution {
        division_order_id: None,
        ledger_version: None,
        total_revenue,
        revenue_type,
        distribution_date,
        unallocated_interest: unallocated(&shares),
        payments,
    })
}

/// Interest left over below a whole, for the shares given
pub fn unallocated(shares: &[OwnerShare]) -> DecimalInterest {
    let held: u128 = shares
        .iter()
        .map(|s| u128::from(s.decimal_interest.units()))
        .sum();
    DecimalInterest::from_units(u64::try_from(held).unwrap_or(u64::MAX)).remainder_to_whole()
}

fn exact_share(total: u128, interest: DecimalInterest, denominator: u128) -> String {
    let numerator = total * u128::from(interest.units());
    let whole = numerator / denominator;
    let frac = (numerator % denominator) * u128::from(INTEREST_SCALE) / denominator;
    format!("{}.{:08}", whole, frac)
}
