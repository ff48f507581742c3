//! Strategy parameter tracks.
//!
//! Each (move ratio, bid ratio, batch) combination is one isolated
//! simulation track with its own position book and accumulators. The typed
//! composite key makes that isolation a type-level fact instead of a nested
//! dictionary convention.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::config::SimConfig;

/// Identity of one simulation track.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TrackKey {
    /// Hypothetical adverse underlying move the sold option must cover.
    pub move_ratio: Decimal,

    /// Weight of the bid in the assumed execution price.
    pub bid_ratio: Decimal,

    /// Trade batch index within the (move, bid) pair.
    pub batch: usize,
}

impl TrackKey {
    pub fn new(move_ratio: Decimal, bid_ratio: Decimal, batch: usize) -> Self {
        Self {
            move_ratio,
            bid_ratio,
            batch,
        }
    }

    /// Stable label used as a key in result files and chart legends.
    pub fn label(&self) -> String {
        format!("m{}_r{}_b{}", self.move_ratio, self.bid_ratio, self.batch)
    }
}

/// A (move ratio, bid ratio) pair: the unit that shares one daily scan of
/// the ranked symbol list, split across `max_batches` tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamPair {
    pub move_ratio: Decimal,
    pub bid_ratio: Decimal,
}

impl ParamPair {
    pub fn track(&self, batch: usize) -> TrackKey {
        TrackKey::new(self.move_ratio, self.bid_ratio, batch)
    }
}

/// All (move, bid) pairs in configuration order.
pub fn param_pairs(config: &SimConfig) -> Vec<ParamPair> {
    let mut pairs = Vec::with_capacity(config.move_ratios.len() * config.bid_ratios.len());
    for &move_ratio in &config.move_ratios {
        for &bid_ratio in &config.bid_ratios {
            pairs.push(ParamPair {
                move_ratio,
                bid_ratio,
            });
        }
    }
    pairs
}

/// The full track grid: every pair crossed with every batch index.
pub fn track_grid(config: &SimConfig) -> Vec<TrackKey> {
    let mut keys = Vec::new();
    for pair in param_pairs(config) {
        for batch in 0..config.max_batches {
            keys.push(pair.track(batch));
        }
    }
    keys
}
