//! Prometheus metrics infrastructure
//!
//! The engine crates record through [`EngineMetrics`]. Without an installed
//! recorder every call is a no-op, so unit tests need no setup.

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize the Prometheus metrics exporter
///
/// Starts an HTTP listener exposing `/metrics` on the given port.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Metric names emitted by the ledger and settlement engine
pub mod names {
    pub const LEDGER_ALLOCATIONS: &str = "ledger_allocations_total";
    pub const LEDGER_TRANSFERS_APPLIED: &str = "ledger_transfers_applied_total";
    pub const LEDGER_VERSION_CONFLICTS: &str = "ledger_version_conflicts_total";
    pub const TRANSFERS_PROPOSED: &str = "transfers_proposed_total";
    pub const TRANSFERS_REJECTED: &str = "transfers_rejected_total";
    pub const TRANSFER_APPLY_RETRIES: &str = "transfer_apply_retries_total";
    pub const DISTRIBUTION_PREVIEWS: &str = "distribution_previews_total";
    pub const SETTLEMENT_TRANSITIONS: &str = "settlement_transitions_total";
    pub const IDEMPOTENT_REPLAYS: &str = "settlement_idempotent_replays_total";
    pub const IDEMPOTENCY_CONFLICTS: &str = "settlement_idempotency_conflicts_total";
}

/// Counter helpers for the engine
///
/// Zero-sized; the label sets are fixed per call site.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineMetrics;

impl EngineMetrics {
    pub fn allocation_imported(&self) {
        counter!(names::LEDGER_ALLOCATIONS).increment(1);
    }

    pub fn transfer_applied(&self) {
        counter!(names::LEDGER_TRANSFERS_APPLIED).increment(1);
    }

    pub fn version_conflict(&self) {
        counter!(names::LEDGER_VERSION_CONFLICTS).increment(1);
    }

    pub fn transfer_proposed(&self) {
        counter!(names::TRANSFERS_PROPOSED).increment(1);
    }

    /// `reason` is a short static tag such as `"insufficient_interest"`
    pub fn transfer_rejected(&self, reason: &'static str) {
        counter!(names::TRANSFERS_REJECTED, "reason" => reason).increment(1);
    }

    pub fn apply_retry(&self) {
        counter!(names::TRANSFER_APPLY_RETRIES).increment(1);
    }

    pub fn distribution_preview(&self) {
        counter!(names::DISTRIBUTION_PREVIEWS).increment(1);
    }

    pub fn settlement_transition(&self, operation: &'static str) {
        counter!(names::SETTLEMENT_TRANSITIONS, "operation" => operation).increment(1);
    }

    pub fn idempotent_replay(&self, operation: &'static str) {
        counter!(names::IDEMPOTENT_REPLAYS, "operation" => operation).increment(1);
    }

    pub fn idempotency_conflict(&self, operation: &'static str) {
        counter!(names::IDEMPOTENCY_CONFLICTS, "operation" => operation).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_metrics_without_recorder() {
        // No recorder installed: calls must be harmless no-ops
        let metrics = EngineMetrics;
        metrics.transfer_applied();
        metrics.transfer_rejected("insufficient_interest");
        metrics.idempotent_replay("fund");
    }
}
