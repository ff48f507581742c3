//! Trade selection engine.
//!
//! Walks the IV-ranked (symbol, expiration) list and, for each parameter
//! group independently, sells one call and one put per symbol: the nearest
//! strike on each side that still breaks even under the group's assumed
//! adverse move, priced at the group's bid/ask blend.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::data::{ChainSnapshot, OptionQuote, OptionType};

use super::book::{Position, Track};
use super::config::SimConfig;
use super::params::{param_pairs, ParamPair, TrackKey};
use super::ranker::RankedCandidate;

/// One executed leg of a sold strangle.
#[derive(Debug, Clone, Serialize)]
pub struct TradeLeg {
    pub option_symbol: String,
    pub option_type: OptionType,
    pub strike: Decimal,
    pub expiration: NaiveDate,
    /// Blended execution price.
    pub price: Decimal,
    pub contracts: i64,
}

/// A call/put pair sold for one symbol by one track.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutedTrade {
    pub track: TrackKey,
    pub symbol: String,
    pub call: TradeLeg,
    pub put: TradeLeg,
}

/// Run one day's selection over the ranked candidates.
///
/// Each (move, bid) group fills up to `daily_quota * max_batches` symbols;
/// the n-th fill lands in batch `n / daily_quota`. A symbol that fails a
/// group's breakeven filter is skipped for that group only.
pub fn select_trades(
    snapshot: &ChainSnapshot,
    ranked: &[RankedCandidate],
    config: &SimConfig,
    tracks: &mut BTreeMap<TrackKey, Track>,
) -> Vec<ExecutedTrade> {
    let pairs = param_pairs(config);
    let capacity = config.group_capacity();
    let mut filled: HashMap<ParamPair, usize> = pairs.iter().map(|p| (*p, 0)).collect();
    let mut traded: HashMap<ParamPair, HashSet<String>> = HashMap::new();
    let mut executed = Vec::new();

    for candidate in ranked {
        if filled.values().all(|&count| count >= capacity) {
            break;
        }

        let (calls, puts) = candidate_legs(snapshot, &candidate.symbol, config);
        if calls.is_empty() || puts.is_empty() {
            debug!(symbol = %candidate.symbol, "no tradable call/put pair");
            continue;
        }

        for pair in &pairs {
            if filled[pair] >= capacity {
                continue;
            }
            if traded
                .get(pair)
                .is_some_and(|symbols| symbols.contains(&candidate.symbol))
            {
                continue;
            }
            let Some((call, put)) = pick_legs(&calls, &puts, *pair, config) else {
                continue;
            };

            let batch = filled[pair] / config.daily_quota;
            let key = pair.track(batch);
            let Some(track) = tracks.get_mut(&key) else {
                continue;
            };
            track.sell(leg_position(&candidate.symbol, &call));
            track.sell(leg_position(&candidate.symbol, &put));
            executed.push(ExecutedTrade {
                track: key,
                symbol: candidate.symbol.clone(),
                call,
                put,
            });

            *filled.entry(*pair).or_insert(0) += 1;
            traded
                .entry(*pair)
                .or_default()
                .insert(candidate.symbol.clone());
        }
    }

    executed
}

/// The symbol's in-the-money-adjacent candidates for today, split by side.
///
/// Window is `(hold_days_min, entry_days_max]`: tighter than the ranker's
/// tradable window on both ends.
fn candidate_legs<'a>(
    snapshot: &'a ChainSnapshot,
    symbol: &'a str,
    config: &SimConfig,
) -> (Vec<&'a OptionQuote>, Vec<&'a OptionQuote>) {
    let mut calls = Vec::new();
    let mut puts = Vec::new();
    for quote in snapshot.quotes_for(symbol) {
        let dte = quote.days_to_expiry(snapshot.date);
        if dte <= config.hold_days_min || dte > config.entry_days_max {
            continue;
        }
        if quote.volume <= 0 || quote.bid <= config.min_bid {
            continue;
        }
        match quote.option_type {
            OptionType::Call if quote.strike + quote.bid > quote.underlying_price => {
                calls.push(quote)
            }
            OptionType::Put if quote.strike - quote.bid < quote.underlying_price => {
                puts.push(quote)
            }
            _ => {}
        }
    }
    (calls, puts)
}

/// Pick the nearest viable strike on each side under the pair's assumed
/// move, sized from the per-leg budget. `None` when either side has no
/// qualifying contract or would size to zero contracts.
fn pick_legs(
    calls: &[&OptionQuote],
    puts: &[&OptionQuote],
    pair: ParamPair,
    config: &SimConfig,
) -> Option<(TradeLeg, TradeLeg)> {
    let up = Decimal::ONE + pair.move_ratio;
    let down = Decimal::ONE - pair.move_ratio;

    let mut viable_calls: Vec<(&OptionQuote, Decimal)> = calls
        .iter()
        .filter_map(|q| {
            let blended = q.blended_price(pair.bid_ratio);
            (q.strike + blended >= q.underlying_price * up).then_some((*q, blended))
        })
        .collect();
    let mut viable_puts: Vec<(&OptionQuote, Decimal)> = puts
        .iter()
        .filter_map(|q| {
            let blended = q.blended_price(pair.bid_ratio);
            (q.strike - blended <= q.underlying_price * down).then_some((*q, blended))
        })
        .collect();

    // first strike that breaks even under the assumed move on each side
    viable_calls.sort_by(|a, b| a.0.strike.cmp(&b.0.strike));
    viable_puts.sort_by(|a, b| b.0.strike.cmp(&a.0.strike));

    let (call, call_price) = *viable_calls.first()?;
    let (put, put_price) = *viable_puts.first()?;

    let call_leg = sized_leg(call, call_price, config)?;
    let put_leg = sized_leg(put, put_price, config)?;
    Some((call_leg, put_leg))
}

fn sized_leg(quote: &OptionQuote, price: Decimal, config: &SimConfig) -> Option<TradeLeg> {
    if price <= Decimal::ZERO {
        return None;
    }
    let contracts = (config.leg_budget() / price).floor().to_i64()?;
    if contracts == 0 {
        return None;
    }
    Some(TradeLeg {
        option_symbol: quote.option_symbol.clone(),
        option_type: quote.option_type,
        strike: quote.strike,
        expiration: quote.expiration,
        price,
        contracts,
    })
}

fn leg_position(symbol: &str, leg: &TradeLeg) -> Position {
    Position {
        option_symbol: leg.option_symbol.clone(),
        underlying: symbol.to_string(),
        option_type: leg.option_type,
        strike: leg.strike,
        expiration: leg.expiration,
        execution_price: leg.price,
        contracts: leg.contracts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::params::track_grid;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn quote(
        symbol: &str,
        option_type: OptionType,
        strike: Decimal,
        bid: Decimal,
        ask: Decimal,
        underlying_price: Decimal,
        expiration: NaiveDate,
    ) -> OptionQuote {
        OptionQuote {
            underlying: symbol.to_string(),
            option_symbol: format!("{symbol}-{strike}-{}", option_type.as_str()),
            option_type,
            strike,
            expiration,
            bid,
            ask,
            last: bid,
            volume: 10,
            iv: 0.5,
            underlying_price,
        }
    }

    fn single_pair_config() -> SimConfig {
        SimConfig {
            move_ratios: vec![dec!(0)],
            bid_ratios: vec![dec!(1.0)],
            max_batches: 1,
            ..SimConfig::default()
        }
    }

    fn tracks_for(config: &SimConfig) -> BTreeMap<TrackKey, Track> {
        track_grid(config)
            .into_iter()
            .map(|key| (key, Track::new(key)))
            .collect()
    }

    fn ranked(symbol: &str, expiration: NaiveDate) -> RankedCandidate {
        RankedCandidate {
            symbol: symbol.to_string(),
            expiration,
            mean_iv: 0.5,
        }
    }

    #[test]
    fn test_strangle_selected_and_sized() {
        let config = single_pair_config();
        let day = date(2013, 11, 3);
        let expiry = date(2013, 11, 8); // day + 5
        let snap = ChainSnapshot {
            date: day,
            quotes: vec![
                quote("ABC", OptionType::Call, dec!(100), dec!(5), dec!(5.5), dec!(102), expiry),
                quote("ABC", OptionType::Put, dec!(100), dec!(4), dec!(4.5), dec!(102), expiry),
            ],
            equities: Vec::new(),
        };
        let mut tracks = tracks_for(&config);

        let executed = select_trades(&snap, &[ranked("ABC", expiry)], &config, &mut tracks);
        assert_eq!(executed.len(), 1);
        let trade = &executed[0];
        // budget 1000 split across legs: floor(500/5)=100 calls, floor(500/4)=125 puts
        assert_eq!(trade.call.contracts, 100);
        assert_eq!(trade.call.price, dec!(5));
        assert_eq!(trade.put.contracts, 125);
        assert_eq!(trade.put.price, dec!(4));

        let track = &tracks[&TrackKey::new(dec!(0), dec!(1.0), 0)];
        assert_eq!(track.book.open_count(), 2);
        assert_eq!(track.book.due_dates(expiry), vec![expiry]);
    }

    #[test]
    fn test_blended_price_at_half_ratio() {
        let mut config = single_pair_config();
        config.bid_ratios = vec![dec!(0.5)];
        let day = date(2013, 11, 3);
        let expiry = date(2013, 11, 8);
        let snap = ChainSnapshot {
            date: day,
            quotes: vec![
                quote("ABC", OptionType::Call, dec!(100), dec!(5), dec!(5.5), dec!(102), expiry),
                quote("ABC", OptionType::Put, dec!(100), dec!(4), dec!(4.5), dec!(102), expiry),
            ],
            equities: Vec::new(),
        };
        let mut tracks = tracks_for(&config);

        let executed = select_trades(&snap, &[ranked("ABC", expiry)], &config, &mut tracks);
        assert_eq!(executed[0].call.price, dec!(5.25));
        assert_eq!(executed[0].put.price, dec!(4.25));
    }

    #[test]
    fn test_move_ratio_filters_independently() {
        // At move 0 the 100-strike call breaks even; at move 0.10 the stock
        // would need to be covered to 112.2, which 100 + 5 does not reach.
        let mut config = single_pair_config();
        config.move_ratios = vec![dec!(0), dec!(0.10)];
        let day = date(2013, 11, 3);
        let expiry = date(2013, 11, 8);
        let snap = ChainSnapshot {
            date: day,
            quotes: vec![
                quote("ABC", OptionType::Call, dec!(100), dec!(5), dec!(5.5), dec!(102), expiry),
                quote("ABC", OptionType::Put, dec!(100), dec!(4), dec!(4.5), dec!(102), expiry),
            ],
            equities: Vec::new(),
        };
        let mut tracks = tracks_for(&config);

        let executed = select_trades(&snap, &[ranked("ABC", expiry)], &config, &mut tracks);
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].track.move_ratio, dec!(0));
        assert!(tracks[&TrackKey::new(dec!(0.10), dec!(1.0), 0)]
            .book
            .is_empty());
    }

    #[test]
    fn test_nearest_viable_strike_per_side() {
        let config = single_pair_config();
        let day = date(2013, 11, 3);
        let expiry = date(2013, 11, 8);
        let snap = ChainSnapshot {
            date: day,
            quotes: vec![
                // both calls qualify; the lower strike is the nearest viable
                quote("ABC", OptionType::Call, dec!(95), dec!(8), dec!(8.5), dec!(102), expiry),
                quote("ABC", OptionType::Call, dec!(100), dec!(5), dec!(5.5), dec!(102), expiry),
                // both puts qualify; the higher strike wins
                quote("ABC", OptionType::Put, dec!(105), dec!(6), dec!(6.5), dec!(102), expiry),
                quote("ABC", OptionType::Put, dec!(100), dec!(4), dec!(4.5), dec!(102), expiry),
            ],
            equities: Vec::new(),
        };
        let mut tracks = tracks_for(&config);

        let executed = select_trades(&snap, &[ranked("ABC", expiry)], &config, &mut tracks);
        assert_eq!(executed[0].call.strike, dec!(95));
        assert_eq!(executed[0].put.strike, dec!(105));
    }

    #[test]
    fn test_entry_window_excludes_next_day_and_beyond_week() {
        let config = single_pair_config();
        let day = date(2013, 11, 3);
        let make = |days: i64| ChainSnapshot {
            date: day,
            quotes: vec![
                quote(
                    "ABC",
                    OptionType::Call,
                    dec!(100),
                    dec!(5),
                    dec!(5.5),
                    dec!(102),
                    day + chrono::Duration::days(days),
                ),
                quote(
                    "ABC",
                    OptionType::Put,
                    dec!(100),
                    dec!(4),
                    dec!(4.5),
                    dec!(102),
                    day + chrono::Duration::days(days),
                ),
            ],
            equities: Vec::new(),
        };

        for (days, expect) in [(1, 0), (2, 1), (7, 1), (8, 0)] {
            let snap = make(days);
            let mut tracks = tracks_for(&config);
            let executed = select_trades(
                &snap,
                &[ranked("ABC", snap.quotes[0].expiration)],
                &config,
                &mut tracks,
            );
            assert_eq!(executed.len(), expect, "dte {days}");
        }
    }

    #[test]
    fn test_missing_side_skips_symbol_for_group() {
        let config = single_pair_config();
        let day = date(2013, 11, 3);
        let expiry = date(2013, 11, 8);
        let snap = ChainSnapshot {
            date: day,
            quotes: vec![quote(
                "ABC",
                OptionType::Call,
                dec!(100),
                dec!(5),
                dec!(5.5),
                dec!(102),
                expiry,
            )],
            equities: Vec::new(),
        };
        let mut tracks = tracks_for(&config);
        let executed = select_trades(&snap, &[ranked("ABC", expiry)], &config, &mut tracks);
        assert!(executed.is_empty());
    }

    #[test]
    fn test_batches_fill_in_ranked_order() {
        let mut config = single_pair_config();
        config.daily_quota = 1;
        config.max_batches = 2;
        let day = date(2013, 11, 3);
        let expiry = date(2013, 11, 8);

        let mut quotes = Vec::new();
        for symbol in ["AAA", "BBB", "CCC"] {
            quotes.push(quote(symbol, OptionType::Call, dec!(100), dec!(5), dec!(5.5), dec!(102), expiry));
            quotes.push(quote(symbol, OptionType::Put, dec!(100), dec!(4), dec!(4.5), dec!(102), expiry));
        }
        let snap = ChainSnapshot {
            date: day,
            quotes,
            equities: Vec::new(),
        };
        let mut tracks = tracks_for(&config);

        let candidates = vec![
            ranked("AAA", expiry),
            ranked("BBB", expiry),
            ranked("CCC", expiry),
        ];
        let executed = select_trades(&snap, &candidates, &config, &mut tracks);
        // capacity is quota * batches = 2; CCC does not fit
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0].symbol, "AAA");
        assert_eq!(executed[0].track.batch, 0);
        assert_eq!(executed[1].symbol, "BBB");
        assert_eq!(executed[1].track.batch, 1);
    }

    #[test]
    fn test_zero_size_leg_skips_symbol() {
        let mut config = single_pair_config();
        config.notional_per_symbol = dec!(8); // leg budget 4, below the call price
        let day = date(2013, 11, 3);
        let expiry = date(2013, 11, 8);
        let snap = ChainSnapshot {
            date: day,
            quotes: vec![
                quote("ABC", OptionType::Call, dec!(100), dec!(5), dec!(5.5), dec!(102), expiry),
                quote("ABC", OptionType::Put, dec!(100), dec!(4), dec!(4.5), dec!(102), expiry),
            ],
            equities: Vec::new(),
        };
        let mut tracks = tracks_for(&config);
        let executed = select_trades(&snap, &[ranked("ABC", expiry)], &config, &mut tracks);
        assert!(executed.is_empty());
    }
}
