//! # Run a simulation over monthly archives
//! shortvol-backtest run --data data/archives --universe data/sp500.txt --output results
//!
//! # Same over a flat directory of per-day CSVs, limited to 2013
//! shortvol-backtest run --data data/days --flat --universe data/sp500.txt \
//!     --start 2013-01-01 --end 2013-12-31
//!
//! # Inspect the resolved trading calendar
//! shortvol-backtest list-days --data data/archives

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shortvol_backtest::data::{MarketDataLoader, SourceKind, Universe};
use shortvol_backtest::report;
use shortvol_backtest::sim::{SimConfig, SimulationEngine};

#[derive(Parser)]
#[command(name = "shortvol-backtest")]
#[command(about = "Short-horizon options-selling strategy simulator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trade simulation and write report artifacts
    Run {
        /// Path to the market data directory
        #[arg(short, long)]
        data: String,

        /// Treat the data directory as flat per-day CSVs instead of
        /// monthly ZIP archives
        #[arg(long)]
        flat: bool,

        /// Path to the universe file (one symbol per line)
        #[arg(short, long)]
        universe: String,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: String,

        /// First trading date to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last trading date to include (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Stop after this many trading days
        #[arg(long)]
        max_days: Option<usize>,

        /// Symbols each track trades per day
        #[arg(long, default_value_t = 5)]
        daily_quota: usize,

        /// Ranked (symbol, expiration) pairs scanned per day
        #[arg(long, default_value_t = 60)]
        scan_limit: usize,
    },

    /// Print the resolved trading-day sequence
    ListDays {
        /// Path to the market data directory
        #[arg(short, long)]
        data: String,

        /// Treat the data directory as flat per-day CSVs
        #[arg(long)]
        flat: bool,

        /// First trading date to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last trading date to include (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

fn source_kind(flat: bool) -> SourceKind {
    if flat {
        SourceKind::FlatDir
    } else {
        SourceKind::MonthlyArchives
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data,
            flat,
            universe,
            output,
            start,
            end,
            max_days,
            daily_quota,
            scan_limit,
        } => {
            let universe = Universe::from_file(universe.as_ref())
                .with_context(|| format!("reading universe file {universe}"))?;
            let loader = MarketDataLoader::new(&data, source_kind(flat));
            let config = SimConfig {
                daily_quota,
                scan_limit,
                max_days,
                ..SimConfig::default()
            };

            let mut engine = SimulationEngine::new(config);
            let result = engine
                .run(&loader, &universe, start, end)
                .with_context(|| format!("running simulation over {data}"))?;

            if let Some((key, profit)) = result.best_track() {
                println!(
                    "Simulated {} trading days; best track {} finished at {profit}",
                    result.trading_days,
                    key.label()
                );
            }
            report::write_all(output.as_ref(), &result)
                .with_context(|| format!("writing reports to {output}"))?;
        }
        Commands::ListDays {
            data,
            flat,
            start,
            end,
        } => {
            let loader = MarketDataLoader::new(&data, source_kind(flat));
            let days = loader
                .trading_days(start, end)
                .with_context(|| format!("enumerating trading days in {data}"))?;
            for day in &days {
                println!("{}", day.date);
            }
            println!("{} trading days", days.len());
        }
    }

    Ok(())
}
