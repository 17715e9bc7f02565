// src/models/mod.rs

//! Domain models for the monitor.
//!
//! This module contains the data structures shared by the extractor, the
//! diff engine, the state store and the notifier.

mod config;
mod record;
mod snapshot;

// Re-export all public types
pub use config::{
    Config, EmailConfig, ExtractConfig, HttpConfig, Messages, MonitorConfig, TelegramConfig,
};
pub use record::{IDENTITY_BODY_CHARS, Record, RecordKind};
pub use snapshot::Snapshot;
