//! Persisted snapshot of one run's records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Record;

/// One run's full record set plus its digest and capture time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    /// ISO 8601 capture timestamp
    pub timestamp: DateTime<Utc>,

    /// Hex digest over the canonicalized records
    pub hash: String,

    /// Records in extraction order
    #[serde(default)]
    pub records: Vec<Record>,
}

impl Snapshot {
    /// Capture a snapshot stamped with the current time.
    pub fn new(records: Vec<Record>, hash: impl Into<String>) -> Self {
        Self::at(Utc::now(), records, hash)
    }

    /// Capture a snapshot at an explicit time.
    pub fn at(timestamp: DateTime<Utc>, records: Vec<Record>, hash: impl Into<String>) -> Self {
        Self {
            timestamp,
            hash: hash.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
