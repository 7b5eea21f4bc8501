//! Upstream odds providers

pub mod the_odds_api;

pub use the_odds_api::{GameEvent, OddsApiClient, OddsApiConfig, Sport, PROVIDER_KEY};
