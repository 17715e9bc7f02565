//! Telegram bot delivery channel.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::TelegramConfig;
use crate::services::{Notification, NotifyChannel};

const NAME: &str = "telegram";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Posts notifications to a chat through the Bot API `sendMessage` method.
pub struct TelegramChannel {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
        })
    }
}

#[async_trait]
impl NotifyChannel for TelegramChannel {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: &notification.html,
            parse_mode: "HTML",
        };

        // reqwest errors embed the URL, which carries the bot token.
        self.client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::notify(NAME, e.without_url()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_includes_token() {
        let config = TelegramConfig {
            bot_token: "123:abc".to_string(),
            chat_id: "42".to_string(),
            api_base: "https://api.telegram.org/".to_string(),
            ..TelegramConfig::default()
        };
        let channel = TelegramChannel::new(&config).unwrap();

        assert_eq!(
            channel.endpoint,
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
        assert_eq!(channel.name(), "telegram");
    }

    #[test]
    fn test_payload_shape() {
        let payload = SendMessage {
            chat_id: "42",
            text: "<b>hi</b>",
            parse_mode: "HTML",
        };
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["chat_id"], "42");
        assert_eq!(json["text"], "<b>hi</b>");
        assert_eq!(json["parse_mode"], "HTML");
    }
}
