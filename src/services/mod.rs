//! Service layer.
//!
//! - `RecordExtractor`: turns listing markup into records
//! - `Notifier`: formats change summaries and delivers them
//! - `TelegramChannel` / `EmailChannel`: delivery backends

pub mod email;
pub mod extractor;
pub mod notifier;
pub mod telegram;

pub use email::EmailChannel;
pub use extractor::RecordExtractor;
pub use notifier::{DeliveryReport, Notification, Notifier, NotifyChannel};
pub use telegram::TelegramChannel;
