//! Trade simulation: configuration, parameter tracks, daily ranking and
//! selection, position books, and the run driver.

pub mod book;
pub mod config;
pub mod engine;
pub mod params;
pub mod ranker;
pub mod selection;

pub use book::{Position, PositionBook, SettleSummary, Track, TrackDayStatus};
pub use config::SimConfig;
pub use engine::{DayTrades, RunResult, SimulationEngine};
pub use params::{param_pairs, track_grid, ParamPair, TrackKey};
pub use ranker::{is_tradable, rank_by_iv, RankedCandidate};
pub use selection::{select_trades, ExecutedTrade, TradeLeg};
