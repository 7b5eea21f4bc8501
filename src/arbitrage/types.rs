use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Betting market types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Moneyline,
    Spread,
    Total,
}

impl MarketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::Moneyline => "moneyline",
            MarketType::Spread => "spread",
            MarketType::Total => "total",
        }
    }
}

impl std::fmt::Display for MarketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Head-to-head prices in American odds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoneylineQuote {
    pub home: f64,
    pub away: f64,
}

/// Point spread quote. `line` is the home side's handicap; the away side
/// is priced at `-line`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadQuote {
    pub line: f64,
    pub home_odds: f64,
    pub away_odds: f64,
}

/// Over/under quote on a combined score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TotalQuote {
    pub line: f64,
    pub over_odds: f64,
    pub under_odds: f64,
}

/// One bookmaker's prices for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookOdds {
    pub bookmaker_id: String,
    #[serde(default)]
    pub moneyline: Option<MoneylineQuote>,
    #[serde(default)]
    pub spread: Option<SpreadQuote>,
    #[serde(default)]
    pub total: Option<TotalQuote>,
    /// When the book last refreshed these prices, if known
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

impl BookOdds {
    pub fn new(bookmaker_id: &str) -> Self {
        Self {
            bookmaker_id: bookmaker_id.to_string(),
            moneyline: None,
            spread: None,
            total: None,
            last_update: None,
        }
    }

    pub fn with_moneyline(mut self, home: f64, away: f64) -> Self {
        self.moneyline = Some(MoneylineQuote { home, away });
        self
    }

    pub fn with_spread(mut self, line: f64, home_odds: f64, away_odds: f64) -> Self {
        self.spread = Some(SpreadQuote {
            line,
            home_odds,
            away_odds,
        });
        self
    }

    pub fn with_total(mut self, line: f64, over_odds: f64, under_odds: f64) -> Self {
        self.total = Some(TotalQuote {
            line,
            over_odds,
            under_odds,
        });
        self
    }

    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_update = Some(at);
        self
    }
}

/// All bookmaker quotes for a single game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameBooks {
    pub game: String,
    pub sport: String,
    pub books: Vec<BookOdds>,
}

/// One leg of a hedge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbBet {
    pub bookmaker_id: String,
    pub selection: String,
    pub american_odds: f64,
    pub decimal_odds: f64,
    pub stake: f64,
    pub expected_payout: f64,
}

/// A fully hedged set of bets with a guaranteed return
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageOpportunity {
    pub game: String,
    pub sport: String,
    pub market: MarketType,
    /// Shared spread/total line; `None` for moneyline
    pub line: Option<f64>,
    /// Guaranteed return on `total_stake`, in percent
    pub profit_pct: f64,
    pub total_stake: f64,
    pub guaranteed_profit: f64,
    pub bets: Vec<ArbBet>,
    pub detected_at: DateTime<Utc>,
}

impl ArbitrageOpportunity {
    /// Largest difference between any two legs' payouts. Zero for a perfect hedge.
    pub fn payout_spread(&self) -> f64 {
        let payouts = self.bets.iter().map(|b| b.expected_payout);
        let max = payouts.clone().fold(f64::NEG_INFINITY, f64::max);
        let min = payouts.fold(f64::INFINITY, f64::min);
        if self.bets.is_empty() {
            0.0
        } else {
            max - min
        }
    }
}
