//! File-backed storage of bettor snapshots.
//!
//! Each bettor is stored as `<name>.json` in a directory; writes go through
//! a temporary file and a rename so a crash never leaves a torn snapshot.

use crate::application::bettors::BettorKind;
use crate::application::bettors::persistence::{load_bettor, save_bettor};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct FileBettorStore {
    dir: PathBuf,
}

impl FileBettorStore {
    /// Opens (and creates if needed) the snapshot directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir).context("Failed to create bettor store directory")?;
        }
        Ok(Self { dir })
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    pub fn save(&self, name: &str, bettor: &BettorKind) -> Result<PathBuf> {
        let blob = save_bettor(bettor).context("Failed to serialize bettor")?;
        let path = self.path_for(name);

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, blob).context("Failed to write temp file")?;
        fs::rename(&temp_path, &path).context("Failed to rename temp file")?;

        info!("Saved bettor '{}' to {:?}", name, path);
        Ok(path)
    }

    /// Returns `None` when no snapshot with that name exists.
    pub fn load(&self, name: &str) -> Result<Option<BettorKind>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        Self::load_file(&path).map(Some)
    }

    /// Loads a snapshot from an explicit path.
    pub fn load_file(path: &Path) -> Result<BettorKind> {
        let blob = fs::read(path).context(format!("Failed to read bettor snapshot {:?}", path))?;
        let bettor =
            load_bettor(&blob).context(format!("Failed to load bettor snapshot {:?}", path))?;
        info!("Loaded bettor from {:?}", path);
        Ok(bettor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::bettors::{Bettor, BettorSpec};
    use crate::domain::betting::StakingPolicy;
    use crate::domain::betting::types::{AWAY_WIN, DRAW, HOME_WIN, OddsOutcomeRecord};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn create_test_store() -> (FileBettorStore, PathBuf) {
        let unique_id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let temp_dir = std::env::temp_dir().join(format!(
            "sportsbet_test_{}_{}_store",
            std::process::id(),
            unique_id
        ));
        (FileBettorStore::new(&temp_dir).unwrap(), temp_dir)
    }

    fn records() -> Vec<OddsOutcomeRecord> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap();
        (0..12)
            .map(|i| {
                OddsOutcomeRecord::new(format!("m{}", i), "L", "A", "B", t0 + Duration::days(i))
                    .with_offered_odds(HOME_WIN, 2.0 + 0.1 * i as f64)
                    .with_offered_odds(DRAW, 3.3)
                    .with_offered_odds(AWAY_WIN, 3.8 - 0.1 * i as f64)
                    .with_result([HOME_WIN, DRAW, AWAY_WIN][i as usize % 3])
            })
            .collect()
    }

    #[test]
    fn test_load_nonexistent_returns_none() {
        let (store, dir) = create_test_store();
        assert!(store.load("missing").unwrap().is_none());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_save_and_load_fitted_bettor() {
        let (store, dir) = create_test_store();
        let data = records();
        let mut bettor = BettorSpec::classifier(Default::default(), StakingPolicy::default()).build();
        bettor.fit(&data).unwrap();

        let path = store.save("classifier", &bettor).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());

        let restored = store.load("classifier").unwrap().unwrap();
        assert_eq!(restored.predict(&data).unwrap(), bettor.predict(&data).unwrap());

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let (store, dir) = create_test_store();
        fs::write(store.path_for("broken"), b"{not json").unwrap();
        assert!(store.load("broken").is_err());
        fs::remove_dir_all(dir).ok();
    }
}
