//! Bulk record loading from a TOML seed file.
//!
//! ```toml
//! [students.011]
//! name = "Murtaza Hassan"
//! major = "Robotics"
//! starting_year = 2017
//! total_attendance = 7
//! standing = "G"
//! year = 4
//! last_attendance_time = "2022-12-11 00:54:34"
//! ```

use crate::sqlite::SqliteRecordStore;
use rollcall_core::{Identity, Profile, StoreError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("cannot read seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid seed file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("seed write failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    students: BTreeMap<Identity, Profile>,
}

/// Parse seed TOML into records ordered by identity.
pub fn parse_seed(src: &str) -> Result<Vec<(Identity, Profile)>, SeedError> {
    let file: SeedFile = toml::from_str(src)?;
    Ok(file.students.into_iter().collect())
}

pub fn load_seed(path: &Path) -> Result<Vec<(Identity, Profile)>, SeedError> {
    let src = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_seed(&src)
}

/// Write every seed record, replacing existing rows. Returns the count written.
pub fn apply_seed(
    store: &SqliteRecordStore,
    records: &[(Identity, Profile)],
) -> Result<usize, SeedError> {
    for (id, profile) in records {
        store.put(id, profile)?;
        tracing::debug!(id = %id, "seeded record");
    }
    tracing::info!(count = records.len(), "seed applied");
    Ok(records.len())
}
