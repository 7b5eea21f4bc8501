use clap::Parser;
use oddsgate::cli::{calibrate, scan, Cli, Commands};
use oddsgate::config::AppConfig;
use tracing::{debug, error};

mod main_runtime;

use main_runtime::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir)?;
    init_logging(&config.logging);

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!("Config error: {e}");
        }
        anyhow::bail!("invalid configuration ({} problems)", errors.len());
    }
    debug!(config_dir = %cli.config_dir, "Configuration loaded");

    match cli.command {
        Commands::Scan(args) => scan::run(args, &config).await?,
        Commands::Calibrate(args) => calibrate::run(args, &config)?,
    }

    Ok(())
}
