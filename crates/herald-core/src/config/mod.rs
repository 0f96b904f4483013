//! Configuration loading and validation.
//!
//! Supports JSON5 so config files can carry comments and trailing commas.
//! Default location: `~/.herald/herald.json`.
//!
//! Presence of an option group decides which channel adapters get
//! registered; absent groups simply leave their channels unregistered.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON5 parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] json5::Error),

    /// Config validation error.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level Herald configuration: one optional group per provider family.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeraldConfig {
    /// SMTP email configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailConfig>,

    /// Twilio configuration (SMS, WhatsApp, voice).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twilio: Option<TwilioConfig>,

    /// Slack configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackConfig>,

    /// Discord configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordConfig>,

    /// Microsoft Teams configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<TeamsConfig>,

    /// Telegram configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,

    /// Facebook Messenger configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messenger: Option<MessengerConfig>,
}

impl HeraldConfig {
    /// Load configuration from the default location.
    ///
    /// Returns the default (empty) configuration when no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a path.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::state_dir().join("herald.json")
    }

    /// Get the Herald state directory.
    ///
    /// Uses `HERALD_STATE_DIR` env var if set, otherwise `~/.herald`.
    #[must_use]
    pub fn state_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("HERALD_STATE_DIR") {
            PathBuf::from(dir)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".herald")
        } else {
            PathBuf::from(".herald")
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(email) = &self.email {
            if email.port == Some(0) {
                return Err(ConfigError::Validation(
                    "Email port cannot be 0".to_string(),
                ));
            }
        }

        if let Some(teams) = &self.teams {
            if !teams.webhook_url.starts_with("http://") && !teams.webhook_url.starts_with("https://")
            {
                return Err(ConfigError::Validation(format!(
                    "Teams webhook URL must be http(s): {}",
                    teams.webhook_url
                )));
            }
        }

        Ok(())
    }
}

/// SMTP email configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfig {
    /// SMTP host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// SMTP port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Use an implicit-TLS connection.
    #[serde(default)]
    pub secure: bool,

    /// SMTP credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<EmailAuth>,

    /// From address; falls back to the auth user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl EmailConfig {
    /// Effective SMTP host (default `smtp.gmail.com`).
    #[must_use]
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or("smtp.gmail.com")
    }

    /// Effective SMTP port (default 587).
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(587)
    }

    /// Effective from address, falling back to the auth user.
    #[must_use]
    pub fn from_address(&self) -> Option<&str> {
        self.from
            .as_deref()
            .or_else(|| self.auth.as_ref().map(|a| a.user.as_str()))
    }
}

/// SMTP credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAuth {
    /// SMTP user name.
    pub user: String,
    /// SMTP password.
    pub pass: String,
}

/// Twilio configuration shared by the SMS, WhatsApp, and voice channels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwilioConfig {
    /// Twilio account SID.
    pub account_sid: String,

    /// Twilio auth token.
    pub auth_token: String,

    /// E.164 sender number.
    pub from_number: String,

    /// WhatsApp sender (`whatsapp:+...`); falls back to `fromNumber`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp_from: Option<String>,
}

/// Slack configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackConfig {
    /// Bot token.
    pub bot_token: String,
}

/// Discord configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    /// Bot token.
    pub bot_token: String,

    /// Guild to resolve channel names in; first guild otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
}

/// Microsoft Teams configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamsConfig {
    /// Incoming webhook URL.
    pub webhook_url: String,
}

/// Telegram configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    /// Bot token.
    pub bot_token: String,
}

/// Facebook Messenger configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessengerConfig {
    /// Page access token.
    pub page_access_token: String,
}
