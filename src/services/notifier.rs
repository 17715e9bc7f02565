// src/services/notifier.rs

//! Change notification service.
//!
//! Formats a change set into a short HTML message (bold headings, one link)
//! and hands it to every enabled delivery channel. Channels are independent:
//! a failing channel is logged and recorded, never propagated.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use regex::Regex;

use crate::error::Result;
use crate::models::{Config, Messages, Record};
use crate::pipeline::ChangeSet;
use crate::services::{EmailChannel, TelegramChannel};
use crate::utils::truncate_chars;

/// Maximum characters of a title shown per bullet.
const BULLET_MAX_CHARS: usize = 100;

static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<a href='([^']*)'>[^<]*</a>").expect("anchor pattern"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[a-z][^>]*>").expect("tag pattern"));

/// A formatted message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    /// Text with inline `<b>` and `<a>` markup
    pub html: String,
    /// Same text with markup stripped
    pub plain: String,
}

impl Notification {
    /// Build the change summary for `changes` observed on `url` at `at`.
    pub fn compose(
        changes: &ChangeSet,
        url: &str,
        at: DateTime<Local>,
        messages: &Messages,
    ) -> Self {
        let mut lines = vec![
            format!("<b>{}</b>", escape_html(&messages.headline)),
            format!("📅 {}", at.format("%Y-%m-%d %H:%M")),
        ];

        let sections = [
            (&messages.added_heading, &changes.added),
            (&messages.removed_heading, &changes.removed),
        ];
        for (heading, records) in sections {
            if records.is_empty() {
                continue;
            }
            let heading = heading.replace("{count}", &records.len().to_string());
            lines.push(String::new());
            lines.push(format!("<b>{}</b>", escape_html(&heading)));
            lines.extend(records.iter().map(|r| bullet(r, &messages.untitled)));
        }

        lines.push(String::new());
        lines.push(format!(
            "🔗 <a href='{}'>{}</a>",
            escape_html(url),
            escape_html(&messages.link_label)
        ));

        let html = lines.join("\n");
        Self {
            subject: messages.email_subject.clone(),
            plain: to_plain_text(&html),
            html,
        }
    }
}

fn bullet(record: &Record, untitled: &str) -> String {
    let title = record.title().unwrap_or(untitled);
    format!("• {}", escape_html(&truncate_chars(title, BULLET_MAX_CHARS)))
}

/// Escape text for the chat API's HTML mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Strip inline markup: anchors become their bare URL, other tags vanish.
pub fn to_plain_text(html: &str) -> String {
    let text = ANCHOR.replace_all(html, "$1");
    let text = TAG.replace_all(&text, "");
    unescape_html(&text)
}

/// A delivery channel for notifications.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Short channel name for logs and reports.
    fn name(&self) -> &str;

    /// Deliver a notification.
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Outcome of dispatching one notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Channels that accepted the message
    pub delivered: Vec<String>,
    /// Channels that failed, with the reason
    pub failed: Vec<(String, String)>,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

/// Fans a notification out to every enabled channel.
#[derive(Default)]
pub struct Notifier {
    channels: Vec<Box<dyn NotifyChannel>>,
}

impl Notifier {
    /// Create a notifier with no channels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the channels whose credentials are fully configured.
    ///
    /// A channel that cannot be constructed is logged and left out.
    pub fn from_config(config: &Config) -> Self {
        let mut notifier = Self::new();

        if config.telegram.is_enabled() {
            match TelegramChannel::new(&config.telegram) {
                Ok(channel) => notifier.push(Box::new(channel)),
                Err(e) => log::error!("Telegram channel disabled: {}", e),
            }
        }
        if config.email.is_enabled() {
            match EmailChannel::new(&config.email) {
                Ok(channel) => notifier.push(Box::new(channel)),
                Err(e) => log::error!("Email channel disabled: {}", e),
            }
        }

        notifier
    }

    /// Add a channel.
    pub fn with_channel(mut self, channel: Box<dyn NotifyChannel>) -> Self {
        self.push(channel);
        self
    }

    fn push(&mut self, channel: Box<dyn NotifyChannel>) {
        self.channels.push(channel);
    }

    /// Names of the enabled channels, in dispatch order.
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Try every channel in order; failures are logged and recorded.
    pub async fn dispatch(&self, notification: &Notification) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for channel in &self.channels {
            match channel.send(notification).await {
                Ok(()) => {
                    log::info!("Notification sent via {}", channel.name());
                    report.delivered.push(channel.name().to_string());
                }
                Err(e) => {
                    log::error!("Notification via {} failed: {}", channel.name(), e);
                    report
                        .failed
                        .push((channel.name().to_string(), e.to_string()));
                }
            }
        }

        report
    }
}
