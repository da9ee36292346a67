//! # Commitment Finality Metrics
//!
//! Prometheus metrics, enabled with the `metrics` feature:
//! ```toml
//! commitment-finality = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `settlement_commitments_submitted_total` - Counter of recorded commitments
//! - `settlement_commitments_rejected_total` - Counter of rejected submissions (by reason)
//! - `settlement_blocks_accepted_total` - Counter of accepted heights
//! - `settlement_cascade_depth` - Gauge of heights accepted by the last cascade
//! - `settlement_frontier_height` - Gauge of the last accepted height

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_gauge, register_int_counter, register_int_counter_vec, Gauge, IntCounter,
    IntCounterVec,
};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref COMMITMENTS_SUBMITTED: IntCounter = register_int_counter!(
        "settlement_commitments_submitted_total",
        "Total number of commitments recorded"
    )
    .expect("Failed to create COMMITMENTS_SUBMITTED metric");

    pub static ref COMMITMENTS_REJECTED: IntCounterVec = register_int_counter_vec!(
        "settlement_commitments_rejected_total",
        "Total number of rejected commitment submissions",
        &["reason"]
    )
    .expect("Failed to create COMMITMENTS_REJECTED metric");

    pub static ref BLOCKS_ACCEPTED: IntCounter = register_int_counter!(
        "settlement_blocks_accepted_total",
        "Total number of accepted block heights"
    )
    .expect("Failed to create BLOCKS_ACCEPTED metric");

    pub static ref CASCADE_DEPTH: Gauge = register_gauge!(
        "settlement_cascade_depth",
        "Heights accepted by the most recent cascade"
    )
    .expect("Failed to create CASCADE_DEPTH metric");

    pub static ref FRONTIER_HEIGHT: Gauge = register_gauge!(
        "settlement_frontier_height",
        "Last accepted block height"
    )
    .expect("Failed to create FRONTIER_HEIGHT metric");
}

#[cfg(feature = "metrics")]
pub fn record_commitment_submitted() {
    COMMITMENTS_SUBMITTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_commitment_rejected(reason: &str) {
    COMMITMENTS_REJECTED.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_cascade(accepted: usize, frontier: u64) {
    BLOCKS_ACCEPTED.inc_by(accepted as u64);
    CASCADE_DEPTH.set(accepted as f64);
    FRONTIER_HEIGHT.set(frontier as f64);
}

#[cfg(not(feature = "metrics"))]
pub fn record_commitment_submitted() {}

#[cfg(not(feature = "metrics"))]
pub fn record_commitment_rejected(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_cascade(_accepted: usize, _frontier: u64) {}
