// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Source of the raw listing markup.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Retrieve the page body. Any failure is a fetch error.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Fetches pages over HTTP with browser-like headers.
pub struct HttpPageSource {
    client: reqwest::Client,
    accept: String,
    accept_language: String,
}

impl HttpPageSource {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            accept: config.accept.clone(),
            accept_language: config.accept_language.clone(),
        })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, &self.accept)
            .header(ACCEPT_LANGUAGE, &self.accept_language)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::fetch(url, e))?;

        let text = response.text().await.map_err(|e| AppError::fetch(url, e))?;
        log::info!("Fetched page ({} chars)", text.chars().count());
        Ok(text)
    }
}
