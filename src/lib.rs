pub mod adapters;
pub mod arbitrage;
pub mod calibration;
pub mod cli;
pub mod config;
pub mod error;
pub mod odds;
pub mod quota;

pub use adapters::the_odds_api::{OddsApiClient, OddsApiConfig, Sport};
pub use arbitrage::{
    detect_moneyline_arb, detect_spread_arb, detect_total_arb, find_all_opportunities,
    ArbitrageConfig, ArbitrageDetector, ArbitrageOpportunity, BookOdds, GameBooks, MarketType,
};
pub use calibration::{
    bucket_calibration, brier_score, expected_calibration_error, log_loss, platt_calibrate,
    CalibrationReport, CalibrationSample, ConfidenceLabel, PlattParams,
};
pub use config::AppConfig;
pub use error::{OddsGateError, Result};
pub use quota::{GuardedFetcher, ProviderConfig, ProviderTable, QuotaDecision, QuotaGovernor};
