pub mod detector;
pub mod types;

pub use detector::{
    detect_moneyline_arb, detect_spread_arb, detect_total_arb, find_all_opportunities,
    ArbitrageConfig, ArbitrageDetector,
};
pub use types::{
    ArbBet, ArbitrageOpportunity, BookOdds, GameBooks, MarketType, MoneylineQuote, SpreadQuote,
    TotalQuote,
};
