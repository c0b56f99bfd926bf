use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Timestamp layout used for `last_attendance_time` in the record store.
pub const ATTENDANCE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stable key of a tracked person, independent of any single detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Per-identity document held by the record store.
///
/// Every field is optional: a missing record is represented by
/// `Profile::default()` and callers must tolerate absent fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: Option<String>,
    pub major: Option<String>,
    pub starting_year: Option<i64>,
    pub standing: Option<String>,
    pub year: Option<i64>,
    pub total_attendance: Option<u64>,
    /// Formatted as `YYYY-MM-DD HH:MM:SS` (local time).
    pub last_attendance_time: Option<String>,
}

impl Profile {
    /// Calendar date of the last recorded attendance, if present and parsable.
    pub fn last_attendance_date(&self) -> Option<NaiveDate> {
        let raw = self.last_attendance_time.as_deref()?;
        let date_part = raw.split(' ').next()?;
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }

    pub fn total(&self) -> u64 {
        self.total_attendance.unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        *self == Profile::default()
    }
}

/// Face descriptor produced by the external embedding engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Compute Euclidean distance between two embeddings.
    ///
    /// Descriptors of different lengths are not comparable and are
    /// infinitely far apart.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return f32::INFINITY;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// An enrolled descriptor and the identity it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownFace {
    pub id: Identity,
    #[serde(rename = "descriptor")]
    pub embedding: Embedding,
}

/// Result of matching a probe embedding against the gallery.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    /// Distance to the nearest gallery entry (`f32::INFINITY` for an empty gallery).
    pub distance: f32,
    /// Identity of the accepted match.
    pub identity: Option<Identity>,
    /// Gallery position of the nearest entry, accepted or not.
    pub index: Option<usize>,
}

/// One captured frame, already run through the detector and embedder.
#[derive(Debug, Clone)]
pub struct DetectionFrame {
    /// Offset from the start of the stream.
    pub at: Duration,
    pub faces: Vec<Embedding>,
}
