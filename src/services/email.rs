//! SMTP delivery channel.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::error::{AppError, Result};
use crate::models::EmailConfig;
use crate::services::{Notification, NotifyChannel};

const NAME: &str = "email";

/// Submits plain-text notifications over SMTP with STARTTLS.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailChannel {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from: Mailbox = config
            .sender
            .parse()
            .map_err(|e| AppError::config(format!("email.sender is invalid: {e}")))?;
        let to: Mailbox = config
            .recipient
            .parse()
            .map_err(|e| AppError::config(format!("email.recipient is invalid: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| AppError::config(format!("email.smtp_host is invalid: {e}")))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.sender.clone(),
                config.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Ok(Self {
            transport,
            from,
            to,
        })
    }

    fn build_message(&self, notification: &Notification) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notification.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.plain.clone())
            .map_err(|e| AppError::notify(NAME, e))
    }
}

#[async_trait]
impl NotifyChannel for EmailChannel {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        let message = self.build_message(notification)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::notify(NAME, e))?;
        Ok(())
    }
}
