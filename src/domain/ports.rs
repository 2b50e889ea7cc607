use crate::domain::betting::types::{OddsOutcomeRecord, OddsType};
use anyhow::Result;

/// Source of historical odds/outcome records.
pub trait OddsDataLoader: Send + Sync {
    /// Loads records sorted by kickoff, with offered prices resolved using
    /// `odds_type`. Records whose fraction of missing prices exceeds
    /// `drop_na_threshold` are left out.
    fn load(&self, odds_type: &OddsType, drop_na_threshold: f64) -> Result<Vec<OddsOutcomeRecord>>;

    /// Short description used in logs.
    fn name(&self) -> &str;
}
