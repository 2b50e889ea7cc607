//! CSV-backed odds data loader.
//!
//! One bookmaker quote per row:
//! `match_id,kickoff,competition,home_team,away_team,result,bookmaker,outcome,price`.
//! Empty `price` cells are missing quotes; an empty `result` is an
//! unsettled match.

use crate::domain::betting::types::{BookmakerQuote, OddsOutcomeRecord, OddsType};
use crate::domain::ports::OddsDataLoader;
use crate::domain::validation::data_quality::StrictBetValidator;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct QuoteRow {
    match_id: String,
    kickoff: String,
    competition: String,
    home_team: String,
    away_team: String,
    result: Option<String>,
    bookmaker: String,
    outcome: String,
    price: Option<f64>,
}

/// Rows of one match, in file order.
struct MatchRows {
    kickoff: DateTime<Utc>,
    competition: String,
    home_team: String,
    away_team: String,
    result: Option<String>,
    quotes: Vec<BookmakerQuote>,
}

pub struct CsvOddsLoader {
    path: PathBuf,
    name: String,
}

impl CsvOddsLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: format!("csv:{}", path.display()),
            path,
        }
    }

    /// Parses records from any reader. Used by `load` and by tests.
    pub fn parse<R: Read>(
        reader: R,
        odds_type: &OddsType,
        drop_na_threshold: f64,
    ) -> Result<Vec<OddsOutcomeRecord>> {
        let mut rdr = csv::Reader::from_reader(reader);

        let mut order: Vec<String> = Vec::new();
        let mut matches: HashMap<String, MatchRows> = HashMap::new();

        for (line, row) in rdr.deserialize().enumerate() {
            let row: QuoteRow = row.context(format!("Failed to parse CSV row {}", line + 2))?;
            let kickoff = parse_kickoff(&row.kickoff)
                .context(format!("Invalid kickoff for match {}", row.match_id))?;

            let entry = matches.entry(row.match_id.clone()).or_insert_with(|| {
                order.push(row.match_id.clone());
                MatchRows {
                    kickoff,
                    competition: row.competition.clone(),
                    home_team: row.home_team.clone(),
                    away_team: row.away_team.clone(),
                    result: None,
                    quotes: Vec::new(),
                }
            });

            if entry.kickoff != kickoff {
                anyhow::bail!(
                    "Match {} has conflicting kickoffs {} and {}",
                    row.match_id,
                    entry.kickoff,
                    kickoff
                );
            }
            if let Some(result) = row.result.filter(|r| !r.trim().is_empty()) {
                entry.result = Some(result.trim().to_string());
            }

            let idx = match entry
                .quotes
                .iter()
                .position(|q| q.bookmaker == row.bookmaker)
            {
                Some(idx) => idx,
                None => {
                    entry.quotes.push(BookmakerQuote::new(row.bookmaker.clone()));
                    entry.quotes.len() - 1
                }
            };
            entry.quotes[idx].prices.insert(row.outcome, row.price);
        }

        let total = order.len();
        let mut records = Vec::with_capacity(total);
        let mut dropped = 0;

        for match_id in order {
            let Some(rows) = matches.remove(&match_id) else {
                continue;
            };
            let mut record = OddsOutcomeRecord::new(
                match_id,
                rows.competition,
                rows.home_team,
                rows.away_team,
                rows.kickoff,
            )
            .with_quotes(rows.quotes, odds_type.clone());
            if let Some(result) = rows.result {
                record = record.with_result(result);
            }

            let missing = record.missing_fraction();
            if missing > drop_na_threshold {
                warn!(
                    "CsvOddsLoader: dropping {} ({:.0}% prices missing)",
                    record.match_id,
                    missing * 100.0
                );
                dropped += 1;
                continue;
            }
            if !StrictBetValidator::validate_record(&record) {
                dropped += 1;
                continue;
            }
            records.push(record);
        }

        records.sort_by_key(|r| r.kickoff());
        info!(
            "CsvOddsLoader: {} matches read, {} kept, {} dropped (odds type {})",
            total,
            records.len(),
            dropped,
            odds_type
        );
        Ok(records)
    }
}

impl OddsDataLoader for CsvOddsLoader {
    fn load(&self, odds_type: &OddsType, drop_na_threshold: f64) -> Result<Vec<OddsOutcomeRecord>> {
        let file = File::open(&self.path)
            .context(format!("Failed to open odds file {:?}", self.path))?;
        Self::parse(BufReader::new(file), odds_type, drop_na_threshold)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn parse_kickoff(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .context(format!("Unrecognised timestamp '{}'", raw))?;
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .context(format!("Unrecognised timestamp '{}'", raw))
}
