use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use felica_card::{ScanConfig, StationLayoutRevision};
use tracing_subscriber::EnvFilter;

mod commands;
mod formatters;
use formatters::FormatMode;

#[derive(Parser)]
#[command(name = "felica-history")]
#[command(about = "FeliCa History Reader - Read balance and trip history from transit IC cards")]
#[command(version)]
struct Args {
    /// Output format mode
    #[arg(short, long, value_enum, default_value_t = FormatMode::Human, global = true)]
    format: FormatMode,

    /// Reader to use (defaults to the first one found)
    #[arg(short, long, global = true)]
    reader: Option<String>,

    /// Upper bound for a single card exchange, in milliseconds
    #[arg(long, default_value_t = 3000, global = true)]
    timeout_ms: u64,

    /// Pause between block reads, in milliseconds
    #[arg(long, default_value_t = 30, global = true)]
    delay_ms: u64,

    /// RAPICA station field layout
    #[arg(long, value_enum, default_value_t = LayoutArg::V2, global = true)]
    rapica_layout: LayoutArg,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Read balance and history (default)
    History,
    /// Dump raw blocks of the card's services
    Dump {
        /// Service code to dump in wire byte order, e.g. 8F00
        #[arg(long, value_parser = commands::dump::parse_service_code)]
        service: Option<[u8; 2]>,
        /// Blocks to request from --service
        #[arg(long, default_value_t = 20)]
        blocks: u8,
    },
    /// Show card identity and registry match
    Info,
    /// List registered card families
    Cards,
    /// Read every card presented to the reader
    Watch {
        /// Stop after this many cards
        #[arg(long)]
        count: Option<usize>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LayoutArg {
    V1,
    V2,
}

impl From<LayoutArg> for StationLayoutRevision {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::V1 => StationLayoutRevision::V1,
            LayoutArg::V2 => StationLayoutRevision::V2,
        }
    }
}

impl Args {
    fn scan_config(&self) -> ScanConfig {
        ScanConfig::default()
            .transceive_timeout(Duration::from_millis(self.timeout_ms))
            .inter_read_delay(Duration::from_millis(self.delay_ms))
            .station_layout(self.rapica_layout.into())
    }
}

fn main() {
    // Initialize tracing subscriber with environment-based filtering
    // Set RUST_LOG=debug for detailed logs, RUST_LOG=trace for very verbose
    // Default: info level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = args.scan_config();
    let reader = args.reader.as_deref();

    match args.command.unwrap_or(Command::History) {
        Command::History => commands::history::cmd_history(reader, &config, args.format),
        Command::Dump { service, blocks } => {
            commands::dump::cmd_dump(reader, &config, args.format, service, blocks)
        }
        Command::Info => commands::info::cmd_info(reader, &config, args.format),
        Command::Cards => commands::cards::cmd_cards(),
        Command::Watch { count } => commands::watch::cmd_watch(reader, &config, args.format, count),
    }
}
