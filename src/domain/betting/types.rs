use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Conventional 1X2 outcome labels. Finer markets use free-form labels.
pub const HOME_WIN: &str = "home_win";
pub const DRAW: &str = "draw";
pub const AWAY_WIN: &str = "away_win";

/// Predicted probability per outcome label for one record.
pub type OutcomeProbabilities = BTreeMap<String, f64>;

/// How the offered price is derived from several bookmaker quotes.
///
/// Chosen once per dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OddsType {
    /// Best price available across all bookmakers.
    MarketMaximum,
    /// Mean price across the bookmakers quoting the outcome.
    MarketAverage,
    /// The price of a single named bookmaker.
    Bookmaker(String),
}

impl OddsType {
    /// Aggregates the quotes of one outcome into a single price.
    pub fn aggregate(&self, quotes: &[BookmakerQuote], outcome: &str) -> Option<f64> {
        let prices: Vec<f64> = quotes
            .iter()
            .filter(|q| match self {
                OddsType::Bookmaker(name) => q.bookmaker == *name,
                _ => true,
            })
            .filter_map(|q| q.price(outcome))
            .filter(|p| p.is_finite() && *p > 1.0)
            .collect();

        if prices.is_empty() {
            return None;
        }

        match self {
            OddsType::MarketMaximum | OddsType::Bookmaker(_) => {
                prices.iter().cloned().reduce(f64::max)
            }
            OddsType::MarketAverage => Some(prices.iter().sum::<f64>() / prices.len() as f64),
        }
    }
}

impl fmt::Display for OddsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OddsType::MarketMaximum => write!(f, "market_maximum"),
            OddsType::MarketAverage => write!(f, "market_average"),
            OddsType::Bookmaker(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for OddsType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "market_maximum" | "maximum" | "max" => Ok(OddsType::MarketMaximum),
            "market_average" | "average" | "avg" => Ok(OddsType::MarketAverage),
            "" => anyhow::bail!("Invalid ODDS_TYPE: empty value"),
            _ => Ok(OddsType::Bookmaker(trimmed.to_string())),
        }
    }
}

impl TryFrom<String> for OddsType {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OddsType> for String {
    fn from(value: OddsType) -> Self {
        value.to_string()
    }
}

/// Prices quoted by one bookmaker for one match. A missing entry means the
/// bookmaker did not quote that outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmakerQuote {
    pub bookmaker: String,
    pub prices: BTreeMap<String, Option<f64>>,
}

impl BookmakerQuote {
    pub fn new(bookmaker: impl Into<String>) -> Self {
        Self {
            bookmaker: bookmaker.into(),
            prices: BTreeMap::new(),
        }
    }

    pub fn with_price(mut self, outcome: impl Into<String>, price: f64) -> Self {
        self.prices.insert(outcome.into(), Some(price));
        self
    }

    pub fn with_missing(mut self, outcome: impl Into<String>) -> Self {
        self.prices.insert(outcome.into(), None);
        self
    }

    pub fn price(&self, outcome: &str) -> Option<f64> {
        self.prices.get(outcome).copied().flatten()
    }
}

/// One historical (or upcoming) match with its quoted prices.
///
/// `offered_odds` holds the price resolved with the dataset's odds type;
/// `quotes` keeps the raw bookmaker prices for rule-based bettors.
/// `result` is `None` until the match is settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsOutcomeRecord {
    pub match_id: String,
    pub competition: String,
    pub home_team: String,
    pub away_team: String,
    kickoff: DateTime<Utc>,
    pub odds_type: OddsType,
    pub offered_odds: BTreeMap<String, f64>,
    pub quotes: Vec<BookmakerQuote>,
    pub result: Option<String>,
}

impl OddsOutcomeRecord {
    pub fn new(
        match_id: impl Into<String>,
        competition: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        kickoff: DateTime<Utc>,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            competition: competition.into(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            kickoff,
            odds_type: OddsType::MarketMaximum,
            offered_odds: BTreeMap::new(),
            quotes: Vec::new(),
            result: None,
        }
    }

    /// Attaches bookmaker quotes and resolves the offered price of every
    /// quoted outcome with `odds_type`.
    pub fn with_quotes(mut self, quotes: Vec<BookmakerQuote>, odds_type: OddsType) -> Self {
        let outcomes: BTreeSet<String> = quotes
            .iter()
            .flat_map(|q| q.prices.keys().cloned())
            .collect();

        self.offered_odds = outcomes
            .into_iter()
            .filter_map(|outcome| {
                odds_type
                    .aggregate(&quotes, &outcome)
                    .map(|price| (outcome, price))
            })
            .collect();
        self.quotes = quotes;
        self.odds_type = odds_type;
        self
    }

    pub fn with_offered_odds(mut self, outcome: impl Into<String>, price: f64) -> Self {
        self.offered_odds.insert(outcome.into(), price);
        self
    }

    pub fn with_result(mut self, outcome: impl Into<String>) -> Self {
        self.result = Some(outcome.into());
        self
    }

    pub fn kickoff(&self) -> DateTime<Utc> {
        self.kickoff
    }

    pub fn is_settled(&self) -> bool {
        self.result.is_some()
    }

    /// Every outcome label the record mentions: quoted, offered or realised.
    pub fn outcome_labels(&self) -> BTreeSet<String> {
        let mut labels: BTreeSet<String> = self.offered_odds.keys().cloned().collect();
        for quote in &self.quotes {
            labels.extend(quote.prices.keys().cloned());
        }
        if let Some(result) = &self.result {
            labels.insert(result.clone());
        }
        labels
    }

    /// Fraction of price cells that are missing across all bookmaker quotes.
    /// Records without raw quotes only count their offered prices.
    pub fn missing_fraction(&self) -> f64 {
        if self.quotes.is_empty() {
            let total = self.offered_odds.len();
            if total == 0 {
                return 1.0;
            }
            let invalid = self
                .offered_odds
                .values()
                .filter(|p| !p.is_finite() || **p <= 1.0)
                .count();
            return invalid as f64 / total as f64;
        }

        let outcomes: BTreeSet<&String> =
            self.quotes.iter().flat_map(|q| q.prices.keys()).collect();
        let total = outcomes.len() * self.quotes.len();
        if total == 0 {
            return 1.0;
        }
        let present = self
            .quotes
            .iter()
            .map(|q| outcomes.iter().filter(|o| q.price(o).is_some()).count())
            .sum::<usize>();
        (total - present) as f64 / total as f64
    }
}
