//! Position book and settlement.
//!
//! Each track owns one [`PositionBook`]: expiration date -> open positions.
//! On every simulated day, all due keys (date <= today) settle at intrinsic
//! value against the day's underlying prices. A position whose underlying is
//! absent from the day's table is retained as missing and retried on later
//! days; it is never assumed to settle at zero.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::OptionType;

use super::params::TrackKey;

/// One sold option, owned by exactly one track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Vendor option symbol.
    pub option_symbol: String,

    /// Underlying symbol, used to settle against later data.
    pub underlying: String,

    pub option_type: OptionType,

    pub strike: Decimal,

    pub expiration: NaiveDate,

    /// Blended price the sale was executed at.
    pub execution_price: Decimal,

    /// Contracts sold.
    pub contracts: i64,
}

impl Position {
    /// Notional received at sale; also the capital-at-risk mark while open.
    pub fn notional(&self) -> Decimal {
        self.execution_price * Decimal::from(self.contracts)
    }

    /// Intrinsic value per contract at the given underlying price.
    pub fn payoff(&self, underlying_price: Decimal) -> Decimal {
        match self.option_type {
            OptionType::Call => (underlying_price - self.strike).max(Decimal::ZERO),
            OptionType::Put => (self.strike - underlying_price).max(Decimal::ZERO),
        }
    }
}

/// Open positions keyed by expiration date.
///
/// Invariant: no key maps to an empty list.
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    by_expiration: BTreeMap<NaiveDate, Vec<Position>>,
}

impl PositionBook {
    pub fn insert(&mut self, position: Position) {
        self.by_expiration
            .entry(position.expiration)
            .or_default()
            .push(position);
    }

    /// Expiration keys at or before `on`, oldest first.
    pub fn due_dates(&self, on: NaiveDate) -> Vec<NaiveDate> {
        self.by_expiration
            .range(..=on)
            .map(|(date, _)| *date)
            .collect()
    }

    /// Remove and return all positions under a key.
    pub fn take(&mut self, date: NaiveDate) -> Vec<Position> {
        self.by_expiration.remove(&date).unwrap_or_default()
    }

    /// Put unsettled positions back; an empty list leaves the key deleted.
    pub fn restore(&mut self, date: NaiveDate, positions: Vec<Position>) {
        if !positions.is_empty() {
            self.by_expiration.insert(date, positions);
        }
    }

    /// Sum of `execution_price * contracts` over open positions.
    pub fn open_cost(&self) -> Decimal {
        self.positions().map(Position::notional).sum()
    }

    pub fn open_count(&self) -> usize {
        self.by_expiration.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_expiration.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.by_expiration.values().flatten()
    }
}

/// What one track's settlement pass did on one day.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettleSummary {
    pub expenses: Decimal,
    pub settled: usize,
    pub missing: usize,
}

/// Per-day, per-track status row.
#[derive(Debug, Clone, Serialize)]
pub struct TrackDayStatus {
    pub key: TrackKey,
    pub date: NaiveDate,
    /// Premium received from today's sales.
    pub income: Decimal,
    /// Intrinsic value paid for today's settlements.
    pub expenses: Decimal,
    /// Cumulative income minus expenses so far.
    pub profit: Decimal,
    /// `profit` minus the notional cost of still-open positions.
    pub status: Decimal,
    pub open_positions: usize,
}

/// One isolated simulation track: a parameter combination with its own
/// book and accumulators. Tracks never share position state.
#[derive(Debug, Clone)]
pub struct Track {
    pub key: TrackKey,
    pub book: PositionBook,
    /// Cumulative income minus expenses.
    pub profit: Decimal,
    /// Positions ever created (for conservation checks and reporting).
    pub created: usize,
    /// Positions settled so far.
    pub settled: usize,
    day_income: Decimal,
    day_expenses: Decimal,
}

impl Track {
    pub fn new(key: TrackKey) -> Self {
        Self {
            key,
            book: PositionBook::default(),
            profit: Decimal::ZERO,
            created: 0,
            settled: 0,
            day_income: Decimal::ZERO,
            day_expenses: Decimal::ZERO,
        }
    }

    /// Reset the day ledger. Called once per simulated day before settlement.
    pub fn begin_day(&mut self) {
        self.day_income = Decimal::ZERO;
        self.day_expenses = Decimal::ZERO;
    }

    /// Settle every due expiration key against the day's underlying prices.
    ///
    /// Settling a day with no due keys is a no-op, as is re-settling a date
    /// whose key was already consumed.
    pub fn settle_due(
        &mut self,
        date: NaiveDate,
        prices: &HashMap<String, Decimal>,
    ) -> SettleSummary {
        let mut summary = SettleSummary::default();
        for due in self.book.due_dates(date) {
            let positions = self.book.take(due);
            let mut still_missing = Vec::new();
            for position in positions {
                match prices.get(&position.underlying) {
                    Some(&underlying_price) => {
                        let expense =
                            position.payoff(underlying_price) * Decimal::from(position.contracts);
                        self.day_expenses += expense;
                        summary.expenses += expense;
                        summary.settled += 1;
                        self.settled += 1;
                    }
                    None => {
                        warn!(
                            track = %self.key.label(),
                            option = %position.option_symbol,
                            underlying = %position.underlying,
                            expiration = %due,
                            "underlying absent from day's table, retaining position"
                        );
                        summary.missing += 1;
                        still_missing.push(position);
                    }
                }
            }
            self.book.restore(due, still_missing);
        }
        summary
    }

    /// Record a sale: premium in, position into the book.
    pub fn sell(&mut self, position: Position) {
        self.day_income += position.notional();
        self.created += 1;
        self.book.insert(position);
    }

    /// Fold the day ledger into the running profit and report status.
    pub fn close_day(&mut self, date: NaiveDate) -> TrackDayStatus {
        self.profit += self.day_income - self.day_expenses;
        TrackDayStatus {
            key: self.key,
            date,
            income: self.day_income,
            expenses: self.day_expenses,
            profit: self.profit,
            status: self.profit - self.book.open_cost(),
            open_positions: self.book.open_count(),
        }
    }

    /// Final profit after closing the books: open positions are charged at
    /// their original execution cost one last time.
    pub fn final_profit(&self) -> Decimal {
        self.profit - self.book.open_cost()
    }
}
