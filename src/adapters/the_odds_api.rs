// The Odds API integration
// Pulls moneyline, spread and total prices from many sportsbooks per request

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::arbitrage::{BookOdds, GameBooks};
use crate::error::{OddsGateError, Result};
use crate::quota::{Clock, FetchRequest, GuardedFetcher, HttpTransport, QuotaGovernor};

/// Quota key every request from this adapter is charged against
pub const PROVIDER_KEY: &str = "the-odds-api";

const THE_ODDS_API_BASE: &str = "https://api.the-odds-api.com/v4";
const MARKETS: &str = "h2h,spreads,totals";

/// Supported sports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sport {
    #[serde(rename = "basketball_nba")]
    NBA,
    #[serde(rename = "americanfootball_nfl")]
    NFL,
    #[serde(rename = "icehockey_nhl")]
    NHL,
    #[serde(rename = "baseball_mlb")]
    MLB,
    #[serde(rename = "basketball_ncaab")]
    NCAAB,
    #[serde(rename = "americanfootball_ncaaf")]
    NCAAF,
}

impl Sport {
    pub const ALL: [Sport; 6] = [
        Sport::NBA,
        Sport::NFL,
        Sport::NHL,
        Sport::MLB,
        Sport::NCAAB,
        Sport::NCAAF,
    ];

    pub fn api_key(&self) -> &'static str {
        match self {
            Sport::NBA => "basketball_nba",
            Sport::NFL => "americanfootball_nfl",
            Sport::NHL => "icehockey_nhl",
            Sport::MLB => "baseball_mlb",
            Sport::NCAAB => "basketball_ncaab",
            Sport::NCAAF => "americanfootball_ncaaf",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Sport::NBA => "nba",
            Sport::NFL => "nfl",
            Sport::NHL => "nhl",
            Sport::MLB => "mlb",
            Sport::NCAAB => "ncaab",
            Sport::NCAAF => "ncaaf",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Sport::NBA => "NBA",
            Sport::NFL => "NFL",
            Sport::NHL => "NHL",
            Sport::MLB => "MLB",
            Sport::NCAAB => "College Basketball",
            Sport::NCAAF => "College Football",
        }
    }
}

impl FromStr for Sport {
    type Err = OddsGateError;

    /// Accepts either the short name (`nba`) or the API key (`basketball_nba`)
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Sport::ALL
            .into_iter()
            .find(|sport| sport.short_name() == wanted || sport.api_key() == wanted)
            .ok_or_else(|| OddsGateError::Validation(format!("unknown sport: {s}")))
    }
}

impl std::fmt::Display for Sport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// A single priced outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub point: Option<f64>,
}

/// Market odds (h2h, spreads, totals)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOdds {
    pub key: String,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    pub outcomes: Vec<Outcome>,
}

/// One sportsbook's markets for a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmakerOdds {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    pub markets: Vec<MarketOdds>,
}

impl BookmakerOdds {
    fn market(&self, key: &str) -> Option<&MarketOdds> {
        self.markets.iter().find(|m| m.key == key)
    }
}

/// Game event with odds from multiple bookmakers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: String,
    pub sport_key: String,
    #[serde(default)]
    pub sport_title: String,
    pub commence_time: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub bookmakers: Vec<BookmakerOdds>,
}

impl GameEvent {
    pub fn label(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }

    /// Translate into per-book quotes for the arbitrage detector.
    ///
    /// Markets missing a side, spreads whose two points do not mirror each
    /// other and totals whose over/under lines disagree are left out for that
    /// book.
    pub fn to_game_books(&self) -> GameBooks {
        let books = self
            .bookmakers
            .iter()
            .map(|bookie| self.book_odds(bookie))
            .collect();

        GameBooks {
            game: self.label(),
            sport: self.sport_key.clone(),
            books,
        }
    }

    fn book_odds(&self, bookie: &BookmakerOdds) -> BookOdds {
        let mut book = BookOdds::new(&bookie.key);
        book.last_update = bookie.last_update;

        let named = |market: &MarketOdds, name: &str| -> Option<Outcome> {
            market.outcomes.iter().find(|o| o.name == name).cloned()
        };

        if let Some(market) = bookie.market("h2h") {
            if let (Some(home), Some(away)) = (
                named(market, self.home_team.as_str()),
                named(market, self.away_team.as_str()),
            ) {
                book = book.with_moneyline(home.price, away.price);
            }
        }

        if let Some(market) = bookie.market("spreads") {
            if let (Some(home), Some(away)) = (
                named(market, self.home_team.as_str()),
                named(market, self.away_team.as_str()),
            ) {
                match (home.point, away.point) {
                    (Some(h), Some(a)) if h == -a => {
                        book = book.with_spread(h, home.price, away.price);
                    }
                    _ => debug!(
                        bookmaker = %bookie.key,
                        game = %self.id,
                        "Skipping spread whose sides are not mirrored"
                    ),
                }
            }
        }

        if let Some(market) = bookie.market("totals") {
            if let (Some(over), Some(under)) = (named(market, "Over"), named(market, "Under")) {
                match (over.point, under.point) {
                    (Some(o), Some(u)) if o == u => {
                        book = book.with_total(o, over.price, under.price);
                    }
                    _ => debug!(
                        bookmaker = %bookie.key,
                        game = %self.id,
                        "Skipping total with mismatched lines"
                    ),
                }
            }
        }

        book
    }
}

/// The Odds API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OddsApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_regions")]
    pub regions: String,
    /// Restrict to these sportsbook keys; empty means every book in the region
    #[serde(default)]
    pub bookmakers: Vec<String>,
    /// How long a fetched slate is served from memory. 0 disables caching.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    THE_ODDS_API_BASE.to_string()
}

fn default_regions() -> String {
    "us".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for OddsApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            regions: default_regions(),
            bookmakers: Vec::new(),
            cache_ttl_secs: default_cache_ttl_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OddsApiConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.base_url.trim().is_empty() {
            errors.push("odds_api.base_url must not be empty".to_string());
        }
        if self.regions.trim().is_empty() {
            errors.push("odds_api.regions must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            errors.push("odds_api.timeout_secs must be positive".to_string());
        }
        errors
    }
}

struct CachedSlate {
    fetched_at: DateTime<Utc>,
    events: Vec<GameEvent>,
}

/// The Odds API client. All traffic goes through the shared quota governor.
pub struct OddsApiClient<T: HttpTransport = Client> {
    fetcher: GuardedFetcher<T>,
    config: OddsApiConfig,
    api_key: String,
    cache: DashMap<Sport, CachedSlate>,
}

impl OddsApiClient<Client> {
    /// Build a reqwest-backed client, reading the key from `THE_ODDS_API_KEY`
    pub fn from_env(config: OddsApiConfig, governor: Arc<QuotaGovernor>) -> Result<Self> {
        let api_key = std::env::var("THE_ODDS_API_KEY")
            .map_err(|_| OddsGateError::Internal("THE_ODDS_API_KEY not set".into()))?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Self::new(GuardedFetcher::with_client(governor, client), config, api_key)
    }
}

impl<T: HttpTransport> OddsApiClient<T> {
    pub fn new(
        fetcher: GuardedFetcher<T>,
        config: OddsApiConfig,
        api_key: String,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(OddsGateError::Internal(
                "THE_ODDS_API_KEY not configured".into(),
            ));
        }

        Ok(Self {
            fetcher,
            config,
            api_key,
            cache: DashMap::new(),
        })
    }

    fn request_for(&self, sport: Sport) -> FetchRequest {
        let url = format!(
            "{}/sports/{}/odds",
            self.config.base_url.trim_end_matches('/'),
            sport.api_key()
        );
        let mut request = FetchRequest::get(url)
            .query("apiKey", self.api_key.as_str())
            .query("regions", self.config.regions.as_str())
            .query("markets", MARKETS)
            .query("oddsFormat", "american");
        if !self.config.bookmakers.is_empty() {
            request = request.query("bookmakers", self.config.bookmakers.join(","));
        }
        request
    }

    fn cached(&self, sport: Sport, now: DateTime<Utc>) -> Option<Vec<GameEvent>> {
        if self.config.cache_ttl_secs == 0 {
            return None;
        }
        let entry = self.cache.get(&sport)?;
        let age = now.signed_duration_since(entry.fetched_at).num_seconds();
        if age >= 0 && (age as u64) < self.config.cache_ttl_secs {
            Some(entry.events.clone())
        } else {
            None
        }
    }

    /// Fetch the current slate for a sport, serving from cache while fresh
    pub async fn get_odds(&self, sport: Sport) -> Result<Vec<GameEvent>> {
        let now = self.fetcher.governor().clock().now();
        if let Some(events) = self.cached(sport, now) {
            debug!(sport = %sport, games = events.len(), "Serving odds from cache");
            return Ok(events);
        }

        let request = self.request_for(sport);
        debug!("Fetching odds from: {}", request.url);

        let response = self.fetcher.fetch(PROVIDER_KEY, &request).await?;
        if !response.is_success() {
            warn!(
                sport = %sport,
                status = response.status.as_u16(),
                "Odds API request failed"
            );
            return Err(OddsGateError::UpstreamStatus {
                provider: PROVIDER_KEY.to_string(),
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        let events: Vec<GameEvent> = response.json()?;
        info!(
            "Fetched {} {} games with odds",
            events.len(),
            sport.display_name()
        );

        self.cache.insert(
            sport,
            CachedSlate {
                fetched_at: now,
                events: events.clone(),
            },
        );
        Ok(events)
    }

    /// Current slate translated for the arbitrage detector
    pub async fn get_game_books(&self, sport: Sport) -> Result<Vec<GameBooks>> {
        let events = self.get_odds(sport).await?;
        Ok(events.iter().map(GameEvent::to_game_books).collect())
    }
}
