//! Offline distribution preview for `wellshare distribute`

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::Deserialize;
use std::path::Path;

use common::{DecimalInterest, Money, OwnerId, Party};
use distribution::{calculate, RevenueDistribution, RevenueType};
use ledger::OwnerInterest;

/// One row of the interests file
///
/// `owner` is a registered owner id when it parses as one, otherwise the
/// name of an unregistered party.
#[derive(Debug, Deserialize)]
pub struct InterestRow {
    pub owner: String,
    pub decimal_interest: DecimalInterest,
}

impl InterestRow {
    fn party(&self) -> Party {
        match self.owner.parse::<OwnerId>() {
            Ok(id) => Party::Owner(id),
            Err(_) => Party::External(self.owner.trim().to_string()),
        }
    }
}

pub fn parse_interests(yaml: &str) -> Result<Vec<OwnerInterest>> {
    let rows: Vec<InterestRow> =
        serde_yaml::from_str(yaml).context("Interests file must be a YAML list of {owner, decimal_interest}")?;
    if rows.is_empty() {
        bail!("Interests file lists no owners");
    }

    let mut interests = Vec::with_capacity(rows.len());
    for row in &rows {
        let party = row.party();
        party
            .validate()
            .with_context(|| format!("Invalid owner entry: {:?}", row.owner))?;
        interests.push(OwnerInterest::active(party, row.decimal_interest));
    }

    let total = DecimalInterest::checked_sum(interests.iter().map(|i| i.decimal_interest));
    match total {
        Some(t) if t.is_at_most_whole() => Ok(interests),
        Some(t) => bail!("Interests sum to {}, which exceeds 1", t),
        None => bail!("Interests overflow when summed"),
    }
}

pub fn preview(
    path: &Path,
    revenue: &str,
    revenue_type: &str,
    minor_unit_decimals: u32,
) -> Result<RevenueDistribution> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read interests file: {:?}", path))?;
    let interests = parse_interests(&yaml)?;

    let total = Money::parse(revenue, minor_unit_decimals)
        .with_context(|| format!("Invalid revenue amount: {}", revenue))?;
    let revenue_type: RevenueType = revenue_type
        .parse()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let distribution = calculate(&interests, total, revenue_type, Utc::now().date_naive())?;
    Ok(distribution)
}

pub fn render_table(distribution: &RevenueDistribution, minor_unit_decimals: u32) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Revenue: {} ({})\n\n",
        distribution.total_revenue.format(minor_unit_decimals),
        distribution.revenue_type
    ));
    out.push_str(&format!("{:<40} {:>12} {:>16}\n", "OWNER", "INTEREST", "PAYMENT"));
    for line in &distribution.payments {
        out.push_str(&format!(
            "{:<40} {:>12} {:>16}\n",
            line.party.to_string(),
            line.decimal_interest.to_string(),
            line.payment_amount.format(minor_unit_decimals)
        ));
    }
    out.push_str(&format!(
        "\nTotal paid: {}\n",
        distribution.total_paid().format(minor_unit_decimals)
    ));
    if !distribution.unallocated_interest.is_zero() {
        out.push_str(&format!(
            "Unallocated interest: {} (shares scaled to what is held)\n",
            distribution.unallocated_interest
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_owner_kinds() {
        let id = uuid::Uuid::from_u128(7);
        let yaml = format!(
            "- owner: {}\n  decimal_interest: \"0.75\"\n- owner: Dale Royalty LP\n  decimal_interest: \"0.25\"\n",
            id
        );
        let interests = parse_interests(&yaml).unwrap();
        assert_eq!(interests.len(), 2);
        assert_eq!(interests[0].party, Party::Owner(OwnerId::from_uuid(id)));
        assert_eq!(interests[1].party, Party::External("Dale Royalty LP".to_string()));
    }

    #[test]
    fn test_over_allocated_file_rejected() {
        let yaml = "- owner: A\n  decimal_interest: \"0.6\"\n- owner: B\n  decimal_interest: \"0.6\"\n";
        assert!(parse_interests(yaml).is_err());
    }

    #[test]
    fn test_empty_file_rejected() {
        assert!(parse_interests("[]").is_err());
    }

    #[test]
    fn test_preview_from_file() {
        let path = std::env::temp_dir().join(format!("wellshare-interests-{}.yaml", std::process::id()));
        std::fs::write(
            &path,
            "- owner: A\n  decimal_interest: \"0.333333\"\n- owner: B\n  decimal_interest: \"0.333333\"\n- owner: C\n  decimal_interest: \"0.333334\"\n",
        )
        .unwrap();

        let dist = preview(&path, "100.01", "gas", 2).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(dist.total_paid(), Money::from_minor(10_001));
        let table = render_table(&dist, 2);
        assert!(table.contains("100.01"));
    }
}
