//! Change-detection pipeline.
//!
//! - `fingerprint`: digest over a canonicalized record set
//! - `calculate_diff`: identity-keyed added/removed records
//! - `Monitor`: one full fetch → compare → notify → persist pass

pub mod diff;
pub mod fingerprint;
pub mod run;

pub use diff::{ChangeSet, calculate_diff};
pub use fingerprint::fingerprint;
pub use run::{Monitor, Preview, RunReport, RunStatus};
