//! oddsgate CLI
//!
//! Commands:
//! - `oddsgate scan` - Fetch odds under quota and report arbitrage
//! - `oddsgate calibrate` - Score resolved win-probability predictions

pub mod calibrate;
pub mod output;
pub mod scan;

use clap::{Parser, Subcommand};

/// Rate-limited odds ingestion, arbitrage detection and calibration scoring
#[derive(Parser, Debug)]
#[command(name = "oddsgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding default.toml and per-environment overrides
    #[arg(short, long, default_value = "config", global = true)]
    pub config_dir: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan sportsbooks for cross-book arbitrage
    Scan(scan::ScanArgs),
    /// Score a file of resolved predictions
    Calibrate(calibrate::CalibrateArgs),
}
