pub mod loader;
pub mod types;

pub use loader::{LoaderError, MarketDataLoader, SourceKind, TradingDay};
pub use types::{ChainSnapshot, EquityBar, OptionQuote, OptionType, Universe};
