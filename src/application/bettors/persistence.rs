//! Versioned snapshots of fitted bettors.
//!
//! A snapshot is self-describing JSON: format version, snapshot id, save
//! time and the tagged bettor state (configuration plus fitted parameters).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{Bettor, BettorKind};
use crate::domain::errors::BettingError;

/// Highest snapshot format this build reads and the one it writes.
pub const BETTOR_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct BettorSnapshot {
    pub format_version: u32,
    pub id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub bettor: BettorKind,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    format_version: u32,
    id: Uuid,
    saved_at: DateTime<Utc>,
    bettor: &'a BettorKind,
}

/// Read first so that unknown future layouts fail with a clear error
/// instead of a schema mismatch.
#[derive(Deserialize)]
struct SnapshotHeader {
    format_version: u32,
}

/// Serializes a bettor (fitted or not) into an opaque blob.
pub fn save_bettor(bettor: &BettorKind) -> Result<Vec<u8>, BettingError> {
    let snapshot = SnapshotRef {
        format_version: BETTOR_FORMAT_VERSION,
        id: Uuid::new_v4(),
        saved_at: Utc::now(),
        bettor,
    };
    let blob = serde_json::to_vec_pretty(&snapshot)?;
    info!(
        "Saved {} snapshot {} ({} bytes)",
        bettor.name(),
        snapshot.id,
        blob.len()
    );
    Ok(blob)
}

pub fn load_snapshot(blob: &[u8]) -> Result<BettorSnapshot, BettingError> {
    let header: SnapshotHeader = serde_json::from_slice(blob)?;
    if header.format_version == 0 || header.format_version > BETTOR_FORMAT_VERSION {
        return Err(BettingError::UnsupportedFormat {
            found: header.format_version,
            supported: BETTOR_FORMAT_VERSION,
        });
    }
    Ok(serde_json::from_slice(blob)?)
}

/// Restores a bettor whose predictions are identical to the saved one.
pub fn load_bettor(blob: &[u8]) -> Result<BettorKind, BettingError> {
    let snapshot = load_snapshot(blob)?;
    info!(
        "Loaded {} snapshot {} saved at {}",
        snapshot.bettor.name(),
        snapshot.id,
        snapshot.saved_at
    );
    Ok(snapshot.bettor)
}
