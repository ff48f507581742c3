//! Simulation configuration.
//!
//! The strategy constants are pinned to the reference policy: the economic
//! rules (ratio sets, blending, windows) are configuration, not something to
//! re-derive per run.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Configuration for one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Symbols each track may trade per day (one batch's worth).
    pub daily_quota: usize,

    /// Dollar budget per traded symbol, split across the call and put legs.
    pub notional_per_symbol: Decimal,

    /// Quotes must bid strictly above this to be tradable.
    pub min_bid: Decimal,

    /// Hypothetical adverse-move ratios; each spawns an isolated track set.
    pub move_ratios: Vec<Decimal>,

    /// Bid/ask blend ratios for the assumed execution price.
    pub bid_ratios: Vec<Decimal>,

    /// Maximum trade batches per (move ratio, bid ratio) pair.
    pub max_batches: usize,

    /// Cap on ranked (symbol, expiration) pairs scanned per day.
    pub scan_limit: usize,

    /// Minimum days to expiry for the tradable subset (inclusive).
    pub hold_days_min: i64,

    /// Maximum days to expiry for the tradable subset (inclusive).
    pub hold_days_max: i64,

    /// Maximum days to expiry when picking legs to sell (inclusive; the
    /// lower bound is `hold_days_min`, exclusive).
    pub entry_days_max: i64,

    /// Quotes with implied volatility at or above this are degenerate.
    pub iv_ceiling: f64,

    /// Process at most this many trading days (None = all).
    pub max_days: Option<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            daily_quota: 5,
            notional_per_symbol: dec!(1000),
            min_bid: Decimal::ZERO,
            move_ratios: vec![dec!(0), dec!(0.01), dec!(0.02), dec!(0.05), dec!(0.10)],
            bid_ratios: vec![dec!(1.0), dec!(0.5)],
            max_batches: 2,
            scan_limit: 60,
            hold_days_min: 1,
            hold_days_max: 8,
            entry_days_max: 7,
            iv_ceiling: 4.0,
            max_days: None,
        }
    }
}

impl SimConfig {
    /// Per-day symbol capacity of one (move ratio, bid ratio) pair across
    /// all of its batches.
    pub fn group_capacity(&self) -> usize {
        self.daily_quota * self.max_batches
    }

    /// Dollar budget for a single leg.
    pub fn leg_budget(&self) -> Decimal {
        self.notional_per_symbol / dec!(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_values() {
        let config = SimConfig::default();
        assert_eq!(config.daily_quota, 5);
        assert_eq!(config.notional_per_symbol, dec!(1000));
        assert_eq!(config.hold_days_min, 1);
        assert_eq!(config.hold_days_max, 8);
        assert_eq!(config.entry_days_max, 7);
        assert_eq!(config.move_ratios.len(), 5);
        assert_eq!(config.bid_ratios, vec![dec!(1.0), dec!(0.5)]);
    }

    #[test]
    fn test_derived_budgets() {
        let config = SimConfig::default();
        assert_eq!(config.group_capacity(), 10);
        assert_eq!(config.leg_budget(), dec!(500));
    }
}
