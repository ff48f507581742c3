//! Market data loader for vendor CSV chains.
//!
//! Resolves an ordered, de-duplicated sequence of trading days from either:
//! - a flat directory of `options_YYYYMMDD.csv` / `stockquotes_YYYYMMDD.csv`
//!   files, or
//! - monthly archives named `YYYY_MonthName.zip` holding the same entries,
//!
//! and loads one universe-filtered [`ChainSnapshot`] per day. A filename that
//! does not match the expected pattern is a fatal configuration error, not a
//! skipped file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Month, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{ChainSnapshot, EquityBar, OptionQuote, OptionType, Universe};

/// Expiration formats the vendor data arrives in, tried in order.
const EXPIRATION_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Filename does not match '{{type}}_YYYYMMDD.csv': {0}")]
    BadDayFilename(String),

    #[error("Archive name does not match 'YYYY_MonthName.zip': {0}")]
    BadArchiveName(String),

    #[error("Unparseable expiration date {value:?} in {context}")]
    BadExpiration { value: String, context: String },

    #[error("No trading days found under {0}")]
    NoTradingDays(String),
}

/// How the source directory is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// One CSV file per day per table, directly in the source directory.
    FlatDir,
    /// Per-month ZIP archives, one CSV entry per day per table.
    MonthlyArchives,
}

/// Where one trading day's tables live.
#[derive(Debug, Clone)]
enum DayLocation {
    Flat {
        options: PathBuf,
        equities: Option<PathBuf>,
    },
    Archived {
        archive: PathBuf,
        options: String,
        equities: Option<String>,
    },
}

/// One resolved trading day.
#[derive(Debug, Clone)]
pub struct TradingDay {
    pub date: NaiveDate,
    location: DayLocation,
}

/// Raw option-chain CSV row. Extra vendor columns are ignored.
#[derive(Debug, Deserialize)]
struct RawOptionRow {
    #[serde(rename = "UnderlyingSymbol")]
    underlying: String,
    #[serde(rename = "UnderlyingPrice")]
    underlying_price: Decimal,
    #[serde(rename = "OptionSymbol")]
    option_symbol: String,
    #[serde(rename = "Type")]
    option_type: String,
    #[serde(rename = "Expiration")]
    expiration: String,
    #[serde(rename = "Strike")]
    strike: Decimal,
    #[serde(rename = "Last")]
    last: Decimal,
    #[serde(rename = "Bid")]
    bid: Decimal,
    #[serde(rename = "Ask")]
    ask: Decimal,
    #[serde(rename = "Volume")]
    volume: i64,
    #[serde(rename = "IV")]
    iv: f64,
}

/// Raw equity CSV row.
#[derive(Debug, Deserialize)]
struct RawEquityRow {
    symbol: String,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: i64,
}

/// Loader over a source directory of vendor market data.
pub struct MarketDataLoader {
    source_dir: PathBuf,
    kind: SourceKind,
}

impl MarketDataLoader {
    pub fn new(source_dir: impl Into<PathBuf>, kind: SourceKind) -> Self {
        Self {
            source_dir: source_dir.into(),
            kind,
        }
    }

    /// Resolve the chronologically ordered, de-duplicated day sequence,
    /// optionally restricted to `[start, end]`.
    ///
    /// A given date appears at most once; when two sources carry the same
    /// date, the earlier source (archive order, then entry order) wins.
    pub fn trading_days(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<TradingDay>, LoaderError> {
        let days = match self.kind {
            SourceKind::FlatDir => self.scan_flat_dir()?,
            SourceKind::MonthlyArchives => self.scan_archives()?,
        };

        let days: Vec<TradingDay> = dedup_chronological(days)
            .into_iter()
            .filter(|d| start.map_or(true, |s| d.date >= s))
            .filter(|d| end.map_or(true, |e| d.date <= e))
            .collect();

        if days.is_empty() {
            return Err(LoaderError::NoTradingDays(
                self.source_dir.display().to_string(),
            ));
        }
        Ok(days)
    }

    /// Load one day's tables, restricted to the universe.
    pub fn load_day(
        &self,
        day: &TradingDay,
        universe: &Universe,
    ) -> Result<ChainSnapshot, LoaderError> {
        let mut snapshot = ChainSnapshot::new(day.date);
        match &day.location {
            DayLocation::Flat { options, equities } => {
                snapshot.quotes = read_options(File::open(options)?, options, universe)?;
                if let Some(path) = equities {
                    snapshot.equities = read_equities(File::open(path)?, universe)?;
                }
            }
            DayLocation::Archived {
                archive,
                options,
                equities,
            } => {
                let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
                snapshot.quotes = read_options(
                    zip.by_name(options)?,
                    Path::new(options),
                    universe,
                )?;
                if let Some(name) = equities {
                    snapshot.equities = read_equities(zip.by_name(name)?, universe)?;
                }
            }
        }
        Ok(snapshot)
    }

    fn scan_flat_dir(&self) -> Result<Vec<TradingDay>, LoaderError> {
        let mut by_date: BTreeMap<NaiveDate, (Option<PathBuf>, Option<PathBuf>)> = BTreeMap::new();

        let mut names: Vec<PathBuf> = Vec::new();
        for entry in std::fs::read_dir(&self.source_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.path());
            }
        }
        names.sort();

        for path in names {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let (kind, date) = parse_day_filename(&name)?;
            let slot = by_date.entry(date).or_default();
            match kind {
                DayFileKind::Options => slot.0.get_or_insert(path),
                DayFileKind::StockQuotes => slot.1.get_or_insert(path),
                DayFileKind::Other => continue,
            };
        }

        Ok(collect_days(by_date, |options, equities| DayLocation::Flat {
            options,
            equities,
        }))
    }

    fn scan_archives(&self) -> Result<Vec<TradingDay>, LoaderError> {
        let mut archives: Vec<(i32, u32, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(&self.source_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let (year, month) = parse_archive_name(&name)?;
            archives.push((year, month, path));
        }
        archives.sort();

        let mut days = Vec::new();
        for (_, _, path) in archives {
            let mut by_date: BTreeMap<NaiveDate, (Option<String>, Option<String>)> =
                BTreeMap::new();
            let archive = zip::ZipArchive::new(File::open(&path)?)?;
            let mut entry_names: Vec<String> =
                archive.file_names().map(str::to_string).collect();
            entry_names.sort();

            for entry_name in entry_names {
                let (kind, date) = parse_day_filename(&entry_name)?;
                let slot = by_date.entry(date).or_default();
                match kind {
                    DayFileKind::Options => slot.0.get_or_insert(entry_name),
                    DayFileKind::StockQuotes => slot.1.get_or_insert(entry_name),
                    DayFileKind::Other => continue,
                };
            }

            let archive_path = path.clone();
            days.extend(collect_days(by_date, move |options, equities| {
                DayLocation::Archived {
                    archive: archive_path.clone(),
                    options,
                    equities,
                }
            }));
        }
        Ok(days)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayFileKind {
    Options,
    StockQuotes,
    /// Matches the pattern but is neither table; ignored.
    Other,
}

/// Parse `{type}_{YYYYMMDD}.csv` into a file kind and date.
fn parse_day_filename(name: &str) -> Result<(DayFileKind, NaiveDate), LoaderError> {
    let bad = || LoaderError::BadDayFilename(name.to_string());
    let stem = name.strip_suffix(".csv").ok_or_else(bad)?;
    let (kind, stamp) = stem.rsplit_once('_').ok_or_else(bad)?;
    let date = NaiveDate::parse_from_str(stamp, "%Y%m%d").map_err(|_| bad())?;
    let kind = match kind {
        "options" => DayFileKind::Options,
        "stockquotes" => DayFileKind::StockQuotes,
        _ => DayFileKind::Other,
    };
    Ok((kind, date))
}

/// Parse `{YYYY}_{MonthName}.zip` into (year, month).
fn parse_archive_name(name: &str) -> Result<(i32, u32), LoaderError> {
    let bad = || LoaderError::BadArchiveName(name.to_string());
    let stem = name.strip_suffix(".zip").ok_or_else(bad)?;
    let (year, month_name) = stem.split_once('_').ok_or_else(bad)?;
    let year: i32 = year.parse().map_err(|_| bad())?;
    let month = month_name
        .parse::<Month>()
        .map_err(|_| bad())?
        .number_from_month();
    Ok((year, month))
}

/// Try each known expiration format in order.
fn parse_expiration(value: &str, context: &str) -> Result<NaiveDate, LoaderError> {
    let trimmed = value.trim();
    for format in EXPIRATION_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    Err(LoaderError::BadExpiration {
        value: value.to_string(),
        context: context.to_string(),
    })
}

/// Turn per-date table slots into `TradingDay`s, dropping dates with no
/// options table (nothing to simulate without a chain).
fn collect_days<L>(
    by_date: BTreeMap<NaiveDate, (Option<L>, Option<L>)>,
    make_location: impl Fn(L, Option<L>) -> DayLocation,
) -> Vec<TradingDay> {
    let mut days = Vec::new();
    for (date, (options, equities)) in by_date {
        match options {
            Some(options) => days.push(TradingDay {
                date,
                location: make_location(options, equities),
            }),
            None => warn!(%date, "date has stock quotes but no options table, dropping"),
        }
    }
    days
}

/// Stable-sort by date and keep the first occurrence of each date.
fn dedup_chronological(mut days: Vec<TradingDay>) -> Vec<TradingDay> {
    days.sort_by_key(|d| d.date);
    days.dedup_by_key(|d| d.date);
    days
}

fn read_options<R: Read>(
    reader: R,
    context: &Path,
    universe: &Universe,
) -> Result<Vec<OptionQuote>, LoaderError> {
    let mut quotes = Vec::new();
    let mut csv_reader = csv::Reader::from_reader(reader);
    for row in csv_reader.deserialize::<RawOptionRow>() {
        let row = row?;
        if !universe.contains(&row.underlying) {
            continue;
        }
        let Some(option_type) = OptionType::from_str(&row.option_type) else {
            debug!(
                symbol = %row.option_symbol,
                value = %row.option_type,
                "unrecognized option type, dropping row"
            );
            continue;
        };
        let expiration = parse_expiration(&row.expiration, &context.display().to_string())?;
        quotes.push(OptionQuote {
            underlying: row.underlying,
            option_symbol: row.option_symbol,
            option_type,
            strike: row.strike,
            expiration,
            bid: row.bid,
            ask: row.ask,
            last: row.last,
            volume: row.volume,
            iv: row.iv,
            underlying_price: row.underlying_price,
        });
    }
    Ok(quotes)
}

fn read_equities<R: Read>(reader: R, universe: &Universe) -> Result<Vec<EquityBar>, LoaderError> {
    let mut bars = Vec::new();
    let mut csv_reader = csv::Reader::from_reader(reader);
    for row in csv_reader.deserialize::<RawEquityRow>() {
        let row = row?;
        if !universe.contains(&row.symbol) {
            continue;
        }
        bars.push(EquityBar {
            symbol: row.symbol,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    Ok(bars)
}
