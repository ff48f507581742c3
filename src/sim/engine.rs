//! Simulation run driver.
//!
//! Runs the daily loop over the trading calendar:
//! 1. Load the day's chain snapshot
//! 2. Settle every track's due positions against the day's prices
//! 3. Rank (symbol, expiration) pairs by mean IV
//! 4. Select and sell strangles per parameter track
//! 5. Close each track's day ledger and record its status row
//!
//! Tracks settle in parallel; their books never share state. Selection and
//! bookkeeping stay sequential so fill order follows the ranked list.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::data::{ChainSnapshot, LoaderError, MarketDataLoader, Universe};

use super::book::{Track, TrackDayStatus};
use super::config::SimConfig;
use super::params::{track_grid, TrackKey};
use super::ranker::rank_by_iv;
use super::selection::{select_trades, ExecutedTrade};

/// Trades executed on one simulated day, across all tracks.
#[derive(Debug, Clone)]
pub struct DayTrades {
    pub date: NaiveDate,
    pub trades: Vec<ExecutedTrade>,
}

/// Result of a completed simulation run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Configuration used.
    pub config: SimConfig,

    /// One status row per track per simulated day.
    pub status: Vec<TrackDayStatus>,

    /// Executed trades grouped by day.
    pub trades: Vec<DayTrades>,

    /// Final profit per track, open positions charged at execution cost.
    pub final_profit: BTreeMap<TrackKey, Decimal>,

    /// Days actually simulated.
    pub trading_days: usize,
}

impl RunResult {
    /// The best-performing track by final profit.
    pub fn best_track(&self) -> Option<(TrackKey, Decimal)> {
        self.final_profit
            .iter()
            .max_by_key(|(_, profit)| **profit)
            .map(|(key, profit)| (*key, *profit))
    }
}

/// The simulation engine: one track per parameter combination, stepped
/// through the trading calendar one day at a time.
pub struct SimulationEngine {
    config: SimConfig,
    tracks: BTreeMap<TrackKey, Track>,
    status: Vec<TrackDayStatus>,
    trades: Vec<DayTrades>,
}

impl SimulationEngine {
    pub fn new(config: SimConfig) -> Self {
        let tracks = track_grid(&config)
            .into_iter()
            .map(|key| (key, Track::new(key)))
            .collect();
        Self {
            config,
            tracks,
            status: Vec::new(),
            trades: Vec::new(),
        }
    }

    /// Run over the loader's trading calendar, restricted to the universe
    /// and the optional date range.
    ///
    /// A day that fails to load is skipped with a warning; the run itself
    /// only fails when the calendar cannot be enumerated at all.
    pub fn run(
        &mut self,
        loader: &MarketDataLoader,
        universe: &Universe,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<RunResult, LoaderError> {
        let mut days = loader.trading_days(start, end)?;
        if let Some(max_days) = self.config.max_days {
            days.truncate(max_days);
        }
        info!(days = days.len(), tracks = self.tracks.len(), "starting run");

        let bar = ProgressBar::new(days.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        for day in &days {
            bar.set_message(day.date.to_string());
            match loader.load_day(day, universe) {
                Ok(snapshot) => self.process_day(&snapshot),
                Err(err) => {
                    warn!(date = %day.date, error = %err, "failed to load day, skipping");
                }
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        Ok(self.build_result())
    }

    /// Run with pre-loaded snapshots, in order. Used by tests and callers
    /// that assemble data in memory.
    pub fn run_with_days(&mut self, days: &[ChainSnapshot]) -> RunResult {
        let limit = self.config.max_days.unwrap_or(days.len());
        for snapshot in days.iter().take(limit) {
            self.process_day(snapshot);
        }
        self.build_result()
    }

    fn process_day(&mut self, snapshot: &ChainSnapshot) {
        let prices = snapshot.price_index();

        self.tracks.par_iter_mut().for_each(|(_, track)| {
            track.begin_day();
            track.settle_due(snapshot.date, &prices);
        });

        let ranked = rank_by_iv(snapshot, &self.config);
        let executed = select_trades(snapshot, &ranked, &self.config, &mut self.tracks);
        if !executed.is_empty() {
            self.trades.push(DayTrades {
                date: snapshot.date,
                trades: executed,
            });
        }

        for track in self.tracks.values_mut() {
            let row = track.close_day(snapshot.date);
            if row.income != Decimal::ZERO || row.expenses != Decimal::ZERO {
                info!(
                    track = %row.key.label(),
                    date = %row.date,
                    income = %row.income,
                    expenses = %row.expenses,
                    profit = %row.profit,
                    open = row.open_positions,
                    "track day closed"
                );
            }
            self.status.push(row);
        }
    }

    fn build_result(&self) -> RunResult {
        for (key, track) in &self.tracks {
            if !track.book.is_empty() {
                warn!(
                    track = %key.label(),
                    open = track.book.open_count(),
                    "positions still open at end of run, charged at execution cost"
                );
            }
        }
        let days: std::collections::BTreeSet<NaiveDate> =
            self.status.iter().map(|row| row.date).collect();
        RunResult {
            config: self.config.clone(),
            status: self.status.clone(),
            trades: self.trades.clone(),
            final_profit: self
                .tracks
                .iter()
                .map(|(key, track)| (*key, track.final_profit()))
                .collect(),
            trading_days: days.len(),
        }
    }
}
