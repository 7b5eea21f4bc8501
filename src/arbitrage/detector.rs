//! Cross-bookmaker arbitrage detection
//!
//! For each two-way market the detector takes the best price on each side
//! across all books. If the implied probabilities of those prices sum below
//! one, staking each side in proportion to its implied probability returns
//! the same payout whichever side wins.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ordered_float::OrderedFloat;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::types::{ArbBet, ArbitrageOpportunity, BookOdds, GameBooks, MarketType};
use crate::odds::{american_to_decimal, is_valid_american, DEFAULT_MAX_ABS_AMERICAN};

/// Detection tunables
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArbitrageConfig {
    /// Opportunities at or below this return are dropped by `find_all`
    #[serde(default = "default_min_profit_pct")]
    pub min_profit_pct: f64,
    /// Nominal amount split across the legs
    #[serde(default = "default_total_stake")]
    pub total_stake: f64,
    /// Prices beyond this absolute American value are ignored
    #[serde(default = "default_max_abs_american_odds")]
    pub max_abs_american_odds: f64,
    /// Books whose `last_update` is older than this are ignored
    #[serde(default)]
    pub stale_after_secs: Option<u64>,
}

fn default_min_profit_pct() -> f64 {
    0.5
}

fn default_total_stake() -> f64 {
    100.0
}

fn default_max_abs_american_odds() -> f64 {
    DEFAULT_MAX_ABS_AMERICAN
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            min_profit_pct: default_min_profit_pct(),
            total_stake: default_total_stake(),
            max_abs_american_odds: default_max_abs_american_odds(),
            stale_after_secs: None,
        }
    }
}

impl ArbitrageConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.min_profit_pct.is_finite() || self.min_profit_pct < 0.0 {
            errors.push("arbitrage.min_profit_pct must be a non-negative number".to_string());
        }
        if !self.total_stake.is_finite() || self.total_stake <= 0.0 {
            errors.push("arbitrage.total_stake must be positive".to_string());
        }
        if !self.max_abs_american_odds.is_finite() || self.max_abs_american_odds < 100.0 {
            errors.push("arbitrage.max_abs_american_odds must be at least 100".to_string());
        }
        errors
    }
}

/// A priced selection offered by one book
#[derive(Debug, Clone)]
struct Candidate<'a> {
    bookmaker_id: &'a str,
    selection: String,
    american: f64,
    decimal: f64,
}

/// Best price seen so far for one side of a market
#[derive(Debug, Default)]
struct BestSide<'a> {
    best: Option<Candidate<'a>>,
}

impl<'a> BestSide<'a> {
    /// Keep the higher decimal price; on a tie the first book seen stays
    fn offer(&mut self, candidate: Candidate<'a>) {
        let better = match &self.best {
            Some(current) => candidate.decimal > current.decimal,
            None => true,
        };
        if better {
            self.best = Some(candidate);
        }
    }
}

/// Both sides of one market (one line for spreads/totals)
#[derive(Debug, Default)]
struct MarketBook<'a> {
    first: BestSide<'a>,
    second: BestSide<'a>,
}

impl<'a> MarketBook<'a> {
    fn implied_sum(&self) -> Option<f64> {
        let first = self.first.best.as_ref()?;
        let second = self.second.best.as_ref()?;
        Some(1.0 / first.decimal + 1.0 / second.decimal)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArbitrageDetector {
    config: ArbitrageConfig,
}

impl ArbitrageDetector {
    pub fn new(config: ArbitrageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArbitrageConfig {
        &self.config
    }

    fn is_fresh(&self, book: &BookOdds, now: DateTime<Utc>) -> bool {
        match (self.config.stale_after_secs, book.last_update) {
            (Some(max_age), Some(updated)) => {
                now - updated <= ChronoDuration::seconds(max_age as i64)
            }
            _ => true,
        }
    }

    fn candidate<'a>(
        &self,
        book: &'a BookOdds,
        selection: String,
        american: f64,
    ) -> Option<Candidate<'a>> {
        if !is_valid_american(american, self.config.max_abs_american_odds) {
            return None;
        }
        Some(Candidate {
            bookmaker_id: &book.bookmaker_id,
            selection,
            american,
            decimal: american_to_decimal(american),
        })
    }

    /// Moneyline arbitrage between the best home and best away price
    pub fn detect_moneyline(
        &self,
        books: &[BookOdds],
        game: &str,
        sport: &str,
        now: DateTime<Utc>,
    ) -> Option<ArbitrageOpportunity> {
        let mut market = MarketBook::default();

        for book in books.iter().filter(|b| self.is_fresh(b, now)) {
            let Some(quote) = book.moneyline else {
                continue;
            };
            if let Some(c) = self.candidate(book, "home".to_string(), quote.home) {
                market.first.offer(c);
            }
            if let Some(c) = self.candidate(book, "away".to_string(), quote.away) {
                market.second.offer(c);
            }
        }

        self.hedge(market, MarketType::Moneyline, None, game, sport, now)
    }

    /// Spread arbitrage: home at `line` against away at `-line`
    pub fn detect_spread(
        &self,
        books: &[BookOdds],
        game: &str,
        sport: &str,
        now: DateTime<Utc>,
    ) -> Option<ArbitrageOpportunity> {
        let mut lines: BTreeMap<OrderedFloat<f64>, MarketBook> = BTreeMap::new();

        for book in books.iter().filter(|b| self.is_fresh(b, now)) {
            let Some(quote) = book.spread else {
                continue;
            };
            if !quote.line.is_finite() {
                continue;
            }
            let market = lines.entry(OrderedFloat(quote.line)).or_default();
            let home = format!("home {:+}", quote.line);
            let away = format!("away {:+}", -quote.line);
            if let Some(c) = self.candidate(book, home, quote.home_odds) {
                market.first.offer(c);
            }
            if let Some(c) = self.candidate(book, away, quote.away_odds) {
                market.second.offer(c);
            }
        }

        self.best_line(lines, MarketType::Spread, game, sport, now)
    }

    /// Totals arbitrage between over and under on the same line
    pub fn detect_total(
        &self,
        books: &[BookOdds],
        game: &str,
        sport: &str,
        now: DateTime<Utc>,
    ) -> Option<ArbitrageOpportunity> {
        let mut lines: BTreeMap<OrderedFloat<f64>, MarketBook> = BTreeMap::new();

        for book in books.iter().filter(|b| self.is_fresh(b, now)) {
            let Some(quote) = book.total else {
                continue;
            };
            if !quote.line.is_finite() {
                continue;
            }
            let market = lines.entry(OrderedFloat(quote.line)).or_default();
            let over = format!("over {}", quote.line);
            let under = format!("under {}", quote.line);
            if let Some(c) = self.candidate(book, over, quote.over_odds) {
                market.first.offer(c);
            }
            if let Some(c) = self.candidate(book, under, quote.under_odds) {
                market.second.offer(c);
            }
        }

        self.best_line(lines, MarketType::Total, game, sport, now)
    }

    /// Run every detector over every game, keep opportunities above the
    /// profit threshold and sort them best first.
    pub fn find_all(&self, games: &[GameBooks]) -> Vec<ArbitrageOpportunity> {
        self.find_all_at(games, Utc::now())
    }

    pub fn find_all_at(
        &self,
        games: &[GameBooks],
        now: DateTime<Utc>,
    ) -> Vec<ArbitrageOpportunity> {
        let mut opportunities = Vec::new();

        for game in games {
            let found = [
                self.detect_moneyline(&game.books, &game.game, &game.sport, now),
                self.detect_spread(&game.books, &game.game, &game.sport, now),
                self.detect_total(&game.books, &game.game, &game.sport, now),
            ];

            for opp in found.into_iter().flatten() {
                if opp.profit_pct > self.config.min_profit_pct {
                    info!(
                        "Arbitrage found: {} [{}] {:.2}% profit",
                        opp.game, opp.market, opp.profit_pct
                    );
                    opportunities.push(opp);
                } else {
                    debug!(
                        "Arbitrage below threshold: {} [{}] {:.3}%",
                        opp.game, opp.market, opp.profit_pct
                    );
                }
            }
        }

        opportunities.sort_by(|a, b| b.profit_pct.total_cmp(&a.profit_pct));
        opportunities
    }

    /// Among all lines, hedge the one with the lowest implied sum
    fn best_line(
        &self,
        lines: BTreeMap<OrderedFloat<f64>, MarketBook>,
        market_type: MarketType,
        game: &str,
        sport: &str,
        now: DateTime<Utc>,
    ) -> Option<ArbitrageOpportunity> {
        lines
            .into_iter()
            .filter_map(|(line, market)| {
                let sum = market.implied_sum()?;
                Some((sum, line, market))
            })
            .filter(|(_, _, market)| distinct_books(market))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .and_then(|(_, line, market)| {
                self.hedge(market, market_type, Some(line.into_inner()), game, sport, now)
            })
    }

    /// Turn the best two prices of a market into stakes, if they hedge
    fn hedge(
        &self,
        market: MarketBook,
        market_type: MarketType,
        line: Option<f64>,
        game: &str,
        sport: &str,
        now: DateTime<Utc>,
    ) -> Option<ArbitrageOpportunity> {
        if !distinct_books(&market) {
            return None;
        }
        let implied_sum = market.implied_sum()?;
        // also rejects NaN
        if !(implied_sum < 1.0) {
            return None;
        }

        let total_stake = self.config.total_stake;
        let payout = total_stake / implied_sum;
        let profit_pct = (1.0 / implied_sum - 1.0) * 100.0;

        let bets: Vec<ArbBet> = [market.first.best, market.second.best]
            .into_iter()
            .flatten()
            .map(|leg| {
                let stake = total_stake * (1.0 / leg.decimal) / implied_sum;
                ArbBet {
                    bookmaker_id: leg.bookmaker_id.to_string(),
                    selection: leg.selection,
                    american_odds: leg.american,
                    decimal_odds: leg.decimal,
                    stake,
                    expected_payout: stake * leg.decimal,
                }
            })
            .collect();

        Some(ArbitrageOpportunity {
            game: game.to_string(),
            sport: sport.to_string(),
            market: market_type,
            line,
            profit_pct,
            total_stake,
            guaranteed_profit: payout - total_stake,
            bets,
            detected_at: now,
        })
    }
}

/// Both sides priced, by two different books
fn distinct_books(market: &MarketBook) -> bool {
    match (&market.first.best, &market.second.best) {
        (Some(a), Some(b)) => a.bookmaker_id != b.bookmaker_id,
        _ => false,
    }
}

/// Moneyline arbitrage with default settings
pub fn detect_moneyline_arb(
    books: &[BookOdds],
    game: &str,
    sport: &str,
) -> Option<ArbitrageOpportunity> {
    ArbitrageDetector::default().detect_moneyline(books, game, sport, Utc::now())
}

/// Spread arbitrage with default settings
pub fn detect_spread_arb(
    books: &[BookOdds],
    game: &str,
    sport: &str,
) -> Option<ArbitrageOpportunity> {
    ArbitrageDetector::default().detect_spread(books, game, sport, Utc::now())
}

/// Totals arbitrage with default settings
pub fn detect_total_arb(
    books: &[BookOdds],
    game: &str,
    sport: &str,
) -> Option<ArbitrageOpportunity> {
    ArbitrageDetector::default().detect_total(books, game, sport, Utc::now())
}

/// All opportunities above 0.5%, best first
pub fn find_all_opportunities(games: &[GameBooks]) -> Vec<ArbitrageOpportunity> {
    ArbitrageDetector::default().find_all(games)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_b() -> Vec<BookOdds> {
        vec![
            BookOdds::new("book_a").with_moneyline(150.0, -170.0),
            BookOdds::new("book_b").with_moneyline(-140.0, 140.0),
        ]
    }

    #[test]
    fn test_moneyline_arb_found() {
        let opp = detect_moneyline_arb(&scenario_b(), "LAL @ BOS", "basketball_nba").unwrap();

        assert_eq!(opp.market, MarketType::Moneyline);
        assert_eq!(opp.bets.len(), 2);
        assert_eq!(opp.bets[0].bookmaker_id, "book_a");
        assert_eq!(opp.bets[0].selection, "home");
        assert_eq!(opp.bets[1].bookmaker_id, "book_b");
        assert_eq!(opp.bets[1].selection, "away");

        // 1/2.5 + 1/2.4 = 0.81667 -> 22.45%
        assert!((opp.profit_pct - 22.448979).abs() < 1e-4);
        assert!(opp.payout_spread() < 0.01);

        let staked: f64 = opp.bets.iter().map(|b| b.stake).sum();
        assert!((staked - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_efficient_market_returns_none() {
        let books = vec![
            BookOdds::new("a").with_moneyline(-110.0, -110.0),
            BookOdds::new("b").with_moneyline(-115.0, -105.0),
        ];
        assert!(detect_moneyline_arb(&books, "g", "s").is_none());
    }

    #[test]
    fn test_single_book_returns_none() {
        let books = vec![BookOdds::new("solo").with_moneyline(120.0, 120.0)];
        assert!(detect_moneyline_arb(&books, "g", "s").is_none());
    }

    #[test]
    fn test_one_book_holding_both_best_prices_is_not_a_hedge() {
        let books = vec![
            BookOdds::new("wide").with_moneyline(150.0, 150.0),
            BookOdds::new("tight").with_moneyline(-200.0, -200.0),
        ];
        assert!(detect_moneyline_arb(&books, "g", "s").is_none());
    }

    #[test]
    fn test_tie_keeps_first_book() {
        let books = vec![
            BookOdds::new("first").with_moneyline(150.0, -200.0),
            BookOdds::new("second").with_moneyline(150.0, -200.0),
            BookOdds::new("third").with_moneyline(-300.0, 140.0),
        ];
        let opp = detect_moneyline_arb(&books, "g", "s").unwrap();
        assert_eq!(opp.bets[0].bookmaker_id, "first");
        assert_eq!(opp.bets[1].bookmaker_id, "third");
    }

    #[test]
    fn test_invalid_prices_are_skipped() {
        let books = vec![
            BookOdds::new("junk").with_moneyline(50_000.0, 50.0),
            BookOdds::new("a").with_moneyline(150.0, -170.0),
            BookOdds::new("b").with_moneyline(-140.0, 140.0),
        ];
        let opp = detect_moneyline_arb(&books, "g", "s").unwrap();
        assert!(opp.bets.iter().all(|b| b.bookmaker_id != "junk"));
    }

    #[test]
    fn test_stale_books_are_skipped() {
        let now = Utc::now();
        let detector = ArbitrageDetector::new(ArbitrageConfig {
            stale_after_secs: Some(60),
            ..Default::default()
        });
        let books = vec![
            BookOdds::new("a")
                .with_moneyline(150.0, -170.0)
                .updated_at(now - ChronoDuration::seconds(300)),
            BookOdds::new("b")
                .with_moneyline(-140.0, 140.0)
                .updated_at(now),
        ];

        assert!(detector.detect_moneyline(&books, "g", "s", now).is_none());
    }

    #[test]
    fn test_total_requires_shared_line() {
        let books = vec![
            BookOdds::new("a").with_total(47.5, 120.0, -140.0),
            BookOdds::new("b").with_total(48.5, -140.0, 120.0),
        ];
        assert!(detect_total_arb(&books, "g", "s").is_none());
    }

    #[test]
    fn test_total_arb_on_shared_line() {
        let books = vec![
            BookOdds::new("a").with_total(47.5, 115.0, -135.0),
            BookOdds::new("b").with_total(47.5, -135.0, 110.0),
            BookOdds::new("c").with_moneyline(-110.0, -110.0),
        ];
        let opp = detect_total_arb(&books, "g", "s").unwrap();

        assert_eq!(opp.market, MarketType::Total);
        assert_eq!(opp.line, Some(47.5));
        assert_eq!(opp.bets[0].selection, "over 47.5");
        assert_eq!(opp.bets[1].selection, "under 47.5");
        assert!(opp.payout_spread() < 0.01);
    }

    #[test]
    fn test_total_picks_line_with_lowest_sum() {
        let books = vec![
            BookOdds::new("a").with_total(47.5, 105.0, -125.0),
            BookOdds::new("b").with_total(47.5, -125.0, 105.0),
            BookOdds::new("c").with_total(48.5, 130.0, -150.0),
            BookOdds::new("d").with_total(48.5, -150.0, 130.0),
        ];
        let opp = detect_total_arb(&books, "g", "s").unwrap();
        assert_eq!(opp.line, Some(48.5));
    }

    #[test]
    fn test_spread_arb() {
        let books = vec![
            BookOdds::new("a").with_spread(-3.5, 110.0, -130.0),
            BookOdds::new("b").with_spread(-3.5, -130.0, 115.0),
        ];
        let opp = detect_spread_arb(&books, "g", "s").unwrap();

        assert_eq!(opp.market, MarketType::Spread);
        assert_eq!(opp.bets[0].selection, "home -3.5");
        assert_eq!(opp.bets[1].selection, "away +3.5");
    }

    #[test]
    fn test_find_all_filters_and_sorts() {
        let games = vec![
            GameBooks {
                game: "small".to_string(),
                sport: "s".to_string(),
                // 2 / 2.02 = 0.990 -> 1%
                books: vec![
                    BookOdds::new("a").with_moneyline(102.0, -120.0),
                    BookOdds::new("b").with_moneyline(-120.0, 102.0),
                ],
            },
            GameBooks {
                game: "thin".to_string(),
                sport: "s".to_string(),
                // 2 / 2.005 = 0.9975 -> 0.25%, below threshold
                books: vec![
                    BookOdds::new("a").with_moneyline(100.5, -120.0),
                    BookOdds::new("b").with_moneyline(-120.0, 100.5),
                ],
            },
            GameBooks {
                game: "big".to_string(),
                sport: "s".to_string(),
                books: scenario_b(),
            },
        ];

        let opps = find_all_opportunities(&games);
        let names: Vec<&str> = opps.iter().map(|o| o.game.as_str()).collect();
        assert_eq!(names, vec!["big", "small"]);
    }
}
