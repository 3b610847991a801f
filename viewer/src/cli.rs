// Command-line arguments for the fakeout-viewer binary.
use clap::{Args, Parser, Subcommand, ValueEnum};
use shared::models::{FakeoutType, TimeFrame};
use std::path::PathBuf;
use viewer::state::SortOrder;

#[derive(Debug, Parser)]
#[command(name = "fakeout-viewer", version, about = "Browse scanner candles and fakeouts from the terminal")]
pub struct Cli {
    /// Config file replacing the embedded defaults.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Read `{symbol}_{timeframe}.csv` tables from this directory instead of the backend.
    #[arg(long, global = true)]
    pub csv_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// One page of candles for a symbol and timeframe.
    Candles {
        symbol: String,
        timeframe: TimeFrame,
        #[arg(long)]
        limit: Option<usize>,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// One page of detected fakeouts, optionally filtered.
    Fakeouts {
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        timeframe: Option<TimeFrame>,
        #[arg(long = "type")]
        fakeout_type: Option<FakeoutType>,
        #[arg(long)]
        limit: Option<usize>,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Context chart for one fakeout.
    Detail {
        id: i64,
        symbol: String,
        timeframe: TimeFrame,
    },
    /// Fakeout counts for today, the last week and the last month.
    Stats,
    /// Backend health and the latest candle per symbol.
    Status,
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub page: isize,
    #[arg(long)]
    pub page_size: Option<usize>,
    #[arg(long, value_enum)]
    pub order: Option<OrderArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Asc => SortOrder::Ascending,
            OrderArg::Desc => SortOrder::Descending,
        }
    }
}
