//! Record set fingerprinting.
//!
//! Each record is serialized through `serde_json::Value`, whose object keys
//! are kept sorted, and the per-record forms are sorted before hashing. Two
//! record sets with the same content therefore share a digest whatever the
//! field or item order. The digest is a cheap inequality pre-check, not a
//! security boundary.

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::Record;

/// Canonical byte form of a record set.
fn canonical_form(records: &[Record]) -> Result<Vec<u8>> {
    let mut items = records
        .iter()
        .map(|r| serde_json::to_value(r).and_then(|v| serde_json::to_string(&v)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    items.sort_unstable();

    Ok(serde_json::to_vec(&items)?)
}

/// Compute the hex digest of a record set.
pub fn fingerprint(records: &[Record]) -> Result<String> {
    let canonical = canonical_form(records)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}
