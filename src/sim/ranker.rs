//! Day selector and IV ranker.
//!
//! Reduces one day's chain to the tradable subset, then ranks
//! (symbol, expiration) pairs by the mean implied volatility of the
//! contracts nearest the money. The output drives trade selection order.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::data::{ChainSnapshot, OptionQuote};

use super::config::SimConfig;

/// One ranked (symbol, expiration) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub symbol: String,
    pub expiration: NaiveDate,
    pub mean_iv: f64,
}

/// Whether a quote belongs to the day's tradable subset.
///
/// Expiry window is inclusive on both ends; degenerate IV and untraded or
/// bid-less quotes are excluded rather than treated as errors.
pub fn is_tradable(quote: &OptionQuote, date: NaiveDate, config: &SimConfig) -> bool {
    let dte = quote.days_to_expiry(date);
    dte >= config.hold_days_min
        && dte <= config.hold_days_max
        && quote.volume > 0
        && quote.bid > config.min_bid
        && quote.iv > 0.0
        && quote.iv < config.iv_ceiling
}

/// Rank (symbol, expiration) pairs by descending mean IV of the
/// closest-to-strike contracts, capped at the configured scan limit.
///
/// Ties on distance keep every equally-close contract; ties on mean IV keep
/// natural table order (stable sort) — that ordering is part of the policy.
pub fn rank_by_iv(snapshot: &ChainSnapshot, config: &SimConfig) -> Vec<RankedCandidate> {
    let tradable: Vec<&OptionQuote> = snapshot
        .quotes
        .iter()
        .filter(|q| is_tradable(q, snapshot.date, config))
        .collect();

    // Closest strike distance per symbol.
    let mut min_distance: HashMap<&str, Decimal> = HashMap::new();
    for quote in &tradable {
        let distance = quote.strike_distance();
        min_distance
            .entry(quote.underlying.as_str())
            .and_modify(|d| {
                if distance < *d {
                    *d = distance;
                }
            })
            .or_insert(distance);
    }

    // Mean IV per (symbol, expiration) over the equally-closest contracts,
    // preserving first-appearance order for the stable tie-break.
    let mut order: Vec<(&str, NaiveDate)> = Vec::new();
    let mut iv_sums: HashMap<(&str, NaiveDate), (f64, u32)> = HashMap::new();
    for quote in &tradable {
        if quote.strike_distance() != min_distance[quote.underlying.as_str()] {
            continue;
        }
        let key = (quote.underlying.as_str(), quote.expiration);
        let entry = iv_sums.entry(key).or_insert_with(|| {
            order.push(key);
            (0.0, 0)
        });
        entry.0 += quote.iv;
        entry.1 += 1;
    }

    let mut ranked: Vec<RankedCandidate> = order
        .into_iter()
        .map(|key| {
            let (sum, count) = iv_sums[&key];
            RankedCandidate {
                symbol: key.0.to_string(),
                expiration: key.1,
                mean_iv: sum / count as f64,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.mean_iv.total_cmp(&a.mean_iv));
    ranked.truncate(config.scan_limit);
    ranked
}
