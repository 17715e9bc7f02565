//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
///
/// Built once at startup (file, then environment) and passed explicitly to
/// everything that needs it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Target page and state file
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// HTTP fetch behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Record extraction rules
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Chat-bot delivery
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// SMTP delivery
    #[serde(default)]
    pub email: EmailConfig,

    /// Notification wording
    #[serde(default)]
    pub messages: Messages,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Overlay credentials and overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup. Empty values are ignored.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("MONITOR_URL") {
            self.monitor.url = v;
        }
        if let Some(v) = get("MONITOR_STATE_FILE") {
            self.monitor.state_file = PathBuf::from(v);
        }
        if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Some(v) = get("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = v;
        }
        if let Some(v) = get("EMAIL_SENDER") {
            self.email.sender = v;
        }
        if let Some(v) = get("EMAIL_PASSWORD") {
            self.email.password = v;
        }
        if let Some(v) = get("EMAIL_RECIPIENT") {
            self.email.recipient = v;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.monitor.url)
            .map_err(|e| AppError::validation(format!("monitor.url is invalid: {e}")))?;
        if self.monitor.state_file.as_os_str().is_empty() {
            return Err(AppError::validation("monitor.state_file is empty"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.telegram.timeout_secs == 0 || self.email.timeout_secs == 0 {
            return Err(AppError::validation(
                "notification timeout_secs must be > 0",
            ));
        }
        self.extract.validate()
    }
}

/// Target page and persisted state location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Listing page to watch
    #[serde(default = "defaults::url")]
    pub url: String,

    /// JSON file holding the last snapshot
    #[serde(default = "defaults::state_file")]
    pub state_file: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            url: defaults::url(),
            state_file: defaults::state_file(),
        }
    }
}

/// HTTP client settings for fetching the listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Accept header
    #[serde(default = "defaults::accept")]
    pub accept: String,

    /// Accept-Language header
    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::fetch_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            accept: defaults::accept(),
            accept_language: defaults::accept_language(),
            timeout_secs: defaults::fetch_timeout(),
        }
    }
}

/// Selectors and limits for turning markup into records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Repeating-item selectors, most specific first
    #[serde(default = "defaults::item_selectors")]
    pub item_selectors: Vec<String>,

    /// Content regions tried, in order, when no item selector matches
    #[serde(default = "defaults::fallback_selectors")]
    pub fallback_selectors: Vec<String>,

    #[serde(default = "defaults::title_max_chars")]
    pub title_max_chars: usize,

    #[serde(default = "defaults::body_max_chars")]
    pub body_max_chars: usize,

    #[serde(default = "defaults::fallback_max_chars")]
    pub fallback_max_chars: usize,
}

impl ExtractConfig {
    fn validate(&self) -> Result<()> {
        if self.item_selectors.is_empty() {
            return Err(AppError::validation("extract.item_selectors is empty"));
        }
        if self.fallback_selectors.is_empty() {
            return Err(AppError::validation("extract.fallback_selectors is empty"));
        }
        if self.title_max_chars == 0 || self.body_max_chars == 0 || self.fallback_max_chars == 0
        {
            return Err(AppError::validation("extract limits must be > 0"));
        }
        for s in self.item_selectors.iter().chain(&self.fallback_selectors) {
            Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))?;
        }
        Ok(())
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            item_selectors: defaults::item_selectors(),
            fallback_selectors: defaults::fallback_selectors(),
            title_max_chars: defaults::title_max_chars(),
            body_max_chars: defaults::body_max_chars(),
            fallback_max_chars: defaults::fallback_max_chars(),
        }
    }
}

/// Telegram bot credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,

    #[serde(default)]
    pub chat_id: String,

    /// Bot API base URL
    #[serde(default = "defaults::telegram_api_base")]
    pub api_base: String,

    #[serde(default = "defaults::notify_timeout")]
    pub timeout_secs: u64,
}

impl TelegramConfig {
    /// The channel is enabled iff every required value is non-empty.
    pub fn is_enabled(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: defaults::telegram_api_base(),
            timeout_secs: defaults::notify_timeout(),
        }
    }
}

/// SMTP submission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub sender: String,

    /// Sender credential used for SMTP login
    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub recipient: String,

    #[serde(default = "defaults::smtp_host")]
    pub smtp_host: String,

    #[serde(default = "defaults::smtp_port")]
    pub smtp_port: u16,

    #[serde(default = "defaults::notify_timeout")]
    pub timeout_secs: u64,
}

impl EmailConfig {
    /// The channel is enabled iff every required value is non-empty.
    pub fn is_enabled(&self) -> bool {
        !self.sender.trim().is_empty()
            && !self.password.is_empty()
            && !self.recipient.trim().is_empty()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            sender: String::new(),
            password: String::new(),
            recipient: String::new(),
            smtp_host: defaults::smtp_host(),
            smtp_port: defaults::smtp_port(),
            timeout_secs: defaults::notify_timeout(),
        }
    }
}

/// Notification strings.
///
/// Headings support the `{count}` placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Messages {
    #[serde(default = "defaults::headline")]
    pub headline: String,
    #[serde(default = "defaults::added_heading")]
    pub added_heading: String,
    #[serde(default = "defaults::removed_heading")]
    pub removed_heading: String,
    #[serde(default = "defaults::untitled")]
    pub untitled: String,
    #[serde(default = "defaults::link_label")]
    pub link_label: String,
    #[serde(default = "defaults::email_subject")]
    pub email_subject: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            headline: defaults::headline(),
            added_heading: defaults::added_heading(),
            removed_heading: defaults::removed_heading(),
            untitled: defaults::untitled(),
            link_label: defaults::link_label(),
            email_subject: defaults::email_subject(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Monitor defaults
    pub fn url() -> String {
        "https://www.upme.gov.co/home/convocatorias/convocatorias-de-transmision/?e-filter-b21e3d0-estado_convocatoria=abierta-oficialmente&e-filter-b21e3d0-ano_upme=2025".into()
    }
    pub fn state_file() -> PathBuf {
        PathBuf::from("upme_state.json")
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into()
    }
    pub fn accept() -> String {
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".into()
    }
    pub fn accept_language() -> String {
        "es-CO,es;q=0.9,en;q=0.8".into()
    }
    pub fn fetch_timeout() -> u64 {
        30
    }
    pub fn notify_timeout() -> u64 {
        10
    }

    // Extraction defaults
    pub fn item_selectors() -> Vec<String> {
        vec![
            ".e-loop-item".into(),
            "article".into(),
            ".elementor-post".into(),
            ".jet-listing-grid__item".into(),
        ]
    }
    pub fn fallback_selectors() -> Vec<String> {
        vec!["main".into(), "body".into()]
    }
    pub fn title_max_chars() -> usize {
        200
    }
    pub fn body_max_chars() -> usize {
        500
    }
    pub fn fallback_max_chars() -> usize {
        5000
    }

    // Delivery defaults
    pub fn telegram_api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn smtp_host() -> String {
        "smtp.gmail.com".into()
    }
    pub fn smtp_port() -> u16 {
        587
    }

    // Message defaults
    pub fn headline() -> String {
        "🔔 UPME CALLS CHANGED".into()
    }
    pub fn added_heading() -> String {
        "🆕 New ({count}):".into()
    }
    pub fn removed_heading() -> String {
        "🗑️ Removed ({count}):".into()
    }
    pub fn untitled() -> String {
        "Untitled".into()
    }
    pub fn link_label() -> String {
        "View on UPME".into()
    }
    pub fn email_subject() -> String {
        "🔔 UPME changes".into()
    }
}
