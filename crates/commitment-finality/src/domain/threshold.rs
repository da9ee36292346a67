//! Supermajority arithmetic
//!
//! A commitment is accepted once its accumulated stake is strictly greater
//! than `floor(2 * total / 3)`. Equality does not finalize.

use super::commitment::Stake;

/// Compute `floor(2 * total / 3)` without overflowing.
///
/// When `2 * total` does not fit in a u128 the value is rebuilt from the
/// quotient and remainder of `total / 3`, which is exact.
pub fn supermajority_threshold(total_stake: Stake) -> Stake {
    total_stake.checked_mul(2).map(|v| v / 3).unwrap_or_else(|| {
        let quotient = total_stake / 3;
        let remainder = total_stake % 3;
        quotient * 2 + (remainder * 2) / 3
    })
}

/// Whether `stake` clears the bar for `threshold`.
pub fn exceeds_threshold(stake: Stake, threshold: Stake) -> bool {
    stake > threshold
}

/// Participation of `stake` in `total` as a whole percentage (metrics only).
pub fn participation_percent(stake: Stake, total: Stake) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = stake.saturating_mul(100) / total;
    percent.min(100) as u8
}
