//! JSON result writers.
//!
//! Status and trade files are keyed by `day/month/year` date string, then by
//! track label. The nesting mirrors the result structure consumers already
//! read, so downstream tooling keys straight into it.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::sim::{DayTrades, TradeLeg, TrackDayStatus};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// `day/month/year`, no zero padding.
pub fn date_key(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

/// One track's entry in the status file.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    pub income: Decimal,
    pub expenses: Decimal,
    pub profit: Decimal,
    pub status: Decimal,
    pub open_positions: usize,
}

/// One executed trade in the trades file.
#[derive(Debug, Clone, Serialize)]
pub struct TradeEntry {
    pub symbol: String,
    pub call: TradeLeg,
    pub put: TradeLeg,
}

/// Write the per-day, per-track status series.
pub fn write_status(path: &Path, status: &[TrackDayStatus]) -> Result<(), ReportError> {
    let mut by_day: BTreeMap<NaiveDate, BTreeMap<String, StatusEntry>> = BTreeMap::new();
    for row in status {
        by_day.entry(row.date).or_default().insert(
            row.key.label(),
            StatusEntry {
                income: row.income,
                expenses: row.expenses,
                profit: row.profit,
                status: row.status,
                open_positions: row.open_positions,
            },
        );
    }
    write_keyed(path, by_day)
}

/// Write the executed trades, grouped by day then track.
pub fn write_trades(path: &Path, trades: &[DayTrades]) -> Result<(), ReportError> {
    let mut by_day: BTreeMap<NaiveDate, BTreeMap<String, Vec<TradeEntry>>> = BTreeMap::new();
    for day in trades {
        let tracks = by_day.entry(day.date).or_default();
        for trade in &day.trades {
            tracks
                .entry(trade.track.label())
                .or_default()
                .push(TradeEntry {
                    symbol: trade.symbol.clone(),
                    call: trade.call.clone(),
                    put: trade.put.clone(),
                });
        }
    }
    write_keyed(path, by_day)
}

fn write_keyed<V: Serialize>(
    path: &Path,
    by_day: BTreeMap<NaiveDate, V>,
) -> Result<(), ReportError> {
    // BTreeMap keeps chronological order; the string keys are emitted in
    // that order, not re-sorted lexically.
    let mut keyed = serde_json::Map::new();
    for (date, value) in by_day {
        keyed.insert(date_key(date), serde_json::to_value(value)?);
    }
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), &serde_json::Value::Object(keyed))?;
    Ok(())
}
