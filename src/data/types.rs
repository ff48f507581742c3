//! Core data types for the trade simulation.
//!
//! One `OptionQuote` per chain row, one `ChainSnapshot` per trading day.
//! Prices are `Decimal` (exact money math), implied volatility stays `f64`.

use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

/// A single option quote from one day's chain.
///
/// Immutable snapshot for one trading day; the expiration date has already
/// been normalized to a canonical `NaiveDate` by the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Underlying symbol (e.g., "AMZN").
    pub underlying: String,

    /// Vendor option symbol (unique contract identifier).
    pub option_symbol: String,

    /// Call or put.
    pub option_type: OptionType,

    /// Strike price.
    pub strike: Decimal,

    /// Expiration date.
    pub expiration: NaiveDate,

    /// Bid price.
    pub bid: Decimal,

    /// Ask price.
    pub ask: Decimal,

    /// Last traded price.
    pub last: Decimal,

    /// Trading volume.
    pub volume: i64,

    /// Implied volatility.
    pub iv: f64,

    /// Underlying price at quote time.
    pub underlying_price: Decimal,
}

impl OptionQuote {
    /// Days from `on` until expiration.
    pub fn days_to_expiry(&self, on: NaiveDate) -> i64 {
        (self.expiration - on).num_days()
    }

    /// Absolute distance between strike and the underlying price.
    pub fn strike_distance(&self) -> Decimal {
        (self.strike - self.underlying_price).abs()
    }

    /// Assumed execution price for a sale: `bid_ratio * bid + (1 - bid_ratio) * ask`.
    pub fn blended_price(&self, bid_ratio: Decimal) -> Decimal {
        self.bid * bid_ratio + self.ask * (Decimal::ONE - bid_ratio)
    }
}

/// Daily bar for one underlying equity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityBar {
    pub symbol: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

/// One trading day's data, already restricted to the universe.
#[derive(Debug, Clone, Default)]
pub struct ChainSnapshot {
    /// Trading date.
    pub date: NaiveDate,

    /// All option quotes for the day.
    pub quotes: Vec<OptionQuote>,

    /// Equity bars for the day (may be empty when the source has none).
    pub equities: Vec<EquityBar>,
}

impl ChainSnapshot {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            quotes: Vec::new(),
            equities: Vec::new(),
        }
    }

    /// All quotes for one underlying symbol.
    pub fn quotes_for<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a OptionQuote> {
        self.quotes.iter().filter(move |q| q.underlying == symbol)
    }

    /// Underlying price per symbol, taken from the first quote that carries it.
    ///
    /// Settlement looks prices up here; a symbol absent from the day's table
    /// is a data-completeness gap, not a zero price.
    pub fn price_index(&self) -> HashMap<String, Decimal> {
        let mut index = HashMap::new();
        for quote in &self.quotes {
            index
                .entry(quote.underlying.clone())
                .or_insert(quote.underlying_price);
        }
        index
    }
}

/// The reference symbol universe (e.g., S&P 500 constituents).
///
/// Loaded once from a newline-delimited file, read-only for the run.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    symbols: HashSet<String>,
}

impl Universe {
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// Load from a file with one symbol per line, whitespace-trimmed.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut symbols = HashSet::new();
        for line in std::io::BufReader::new(file).lines() {
            let symbol = line?.trim().to_string();
            if !symbol.is_empty() {
                symbols.insert(symbol);
            }
        }
        Ok(Self { symbols })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
