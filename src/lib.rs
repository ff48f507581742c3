pub mod data;
pub mod report;
pub mod sim;

// Re-export commonly used types
pub use data::{ChainSnapshot, LoaderError, MarketDataLoader, OptionQuote, OptionType, SourceKind, Universe};
pub use report::ReportError;
pub use sim::{RunResult, SimConfig, SimulationEngine, Track, TrackKey};
