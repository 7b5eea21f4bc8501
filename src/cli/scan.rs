//! `oddsgate scan`: fetch odds under quota and report arbitrage.

use clap::Args;
use serde::Serialize;
use std::sync::Arc;
use tabled::Tabled;
use tracing::{info, warn};

use super::output::{self, OutputMode};
use crate::adapters::the_odds_api::{OddsApiClient, Sport};
use crate::arbitrage::{ArbitrageDetector, ArbitrageOpportunity};
use crate::config::AppConfig;
use crate::quota::{ProviderStatus, QuotaGovernor};

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Sports to scan (nba, nfl, nhl, mlb, ncaab, ncaaf)
    #[arg(short, long = "sport", required = true, num_args = 1..)]
    pub sports: Vec<String>,
    /// Override the minimum profit threshold, in percent
    #[arg(long)]
    pub min_profit: Option<f64>,
    /// Print JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, Tabled)]
pub struct OpportunityRow {
    pub game: String,
    pub market: String,
    pub line: String,
    pub profit_pct: String,
    pub profit: String,
    pub legs: String,
}

impl From<&ArbitrageOpportunity> for OpportunityRow {
    fn from(opp: &ArbitrageOpportunity) -> Self {
        let legs = opp
            .bets
            .iter()
            .map(|bet| {
                format!(
                    "{} {} @ {:+} stake {:.2}",
                    bet.bookmaker_id, bet.selection, bet.american_odds, bet.stake
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            game: opp.game.clone(),
            market: opp.market.to_string(),
            line: output::fmt_opt(opp.line, 1),
            profit_pct: format!("{:.2}%", opp.profit_pct),
            profit: format!("{:.2}", opp.guaranteed_profit),
            legs,
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct QuotaRow {
    pub provider: String,
    pub minute: String,
    pub daily: String,
    pub backoff_ms: u64,
    pub daily_reset_at: String,
}

impl From<&ProviderStatus> for QuotaRow {
    fn from(status: &ProviderStatus) -> Self {
        Self {
            provider: status.provider.clone(),
            minute: format!("{}/{}", status.minute_used, status.minute_limit),
            daily: format!("{}/{}", status.daily_used, status.daily_limit),
            backoff_ms: status.current_backoff_ms,
            daily_reset_at: status.daily_reset_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ScanReport<'a> {
    opportunities: &'a [ArbitrageOpportunity],
    quota: &'a [ProviderStatus],
}

pub async fn run(args: ScanArgs, config: &AppConfig) -> anyhow::Result<()> {
    let sports = args
        .sports
        .iter()
        .map(|s| s.parse::<Sport>())
        .collect::<Result<Vec<_>, _>>()?;

    let mut arb_config = config.arbitrage.clone();
    if let Some(min_profit) = args.min_profit {
        arb_config.min_profit_pct = min_profit;
    }
    let detector = ArbitrageDetector::new(arb_config);

    let governor = Arc::new(QuotaGovernor::new(config.quota.clone()));
    let client = OddsApiClient::from_env(config.odds_api.clone(), Arc::clone(&governor))?;

    let mut games = Vec::new();
    let mut last_error = None;
    for sport in sports {
        match client.get_game_books(sport).await {
            Ok(mut slate) => games.append(&mut slate),
            Err(e) => {
                warn!(sport = %sport, error = %e, "Skipping sport");
                last_error = Some(e);
            }
        }
    }
    if games.is_empty() {
        if let Some(e) = last_error {
            return Err(e.into());
        }
    }

    let opportunities = detector.find_all(&games);
    info!(
        games = games.len(),
        opportunities = opportunities.len(),
        "Scan complete"
    );
    let quota = governor.all_statuses().await;

    match OutputMode::from_json_flag(args.json) {
        OutputMode::Json => output::print_json(&ScanReport {
            opportunities: &opportunities,
            quota: &quota,
        })?,
        OutputMode::Table => {
            output::print_heading("Arbitrage opportunities");
            let rows: Vec<OpportunityRow> = opportunities.iter().map(Into::into).collect();
            output::print_items(&rows, OutputMode::Table)?;

            output::print_heading("Provider quota");
            let rows: Vec<QuotaRow> = quota.iter().map(Into::into).collect();
            output::print_items(&rows, OutputMode::Table)?;
        }
    }
    Ok(())
}
