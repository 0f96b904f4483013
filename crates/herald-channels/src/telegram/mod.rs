//! Telegram channel adapter using the Bot API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use herald_core::config::TelegramConfig;
use herald_core::secrets::ApiKey;
use herald_core::types::{Notification, NotificationResponse};
use herald_core::validation::is_telegram_recipient;

use crate::format::value_to_text;
use crate::traits::{Channel, ChannelError};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram channel adapter.
pub struct TelegramChannel {
    client: Client,
    token: ApiKey,
    api_base: String,
}

impl TelegramChannel {
    /// Create a new Telegram channel.
    #[must_use]
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            token: ApiKey::new(config.bot_token),
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    /// Override the API base URL (tests point this at a local server).
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Call `sendMessage`. The Bot API wraps results in an `ok` envelope
    /// with a `description` on failure.
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<MessageResult, ChannelError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base,
            self.token.expose()
        );
        let params = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        let response = self
            .client
            .post(&url)
            .json(&params)
            .send()
            .await
            .map_err(|e| ChannelError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() && status.as_u16() == 429 {
            return Err(ChannelError::RateLimited);
        }

        let envelope: BotApiResponse<MessageResult> = response
            .json()
            .await
            .map_err(|e| ChannelError::Network(e.to_string()))?;

        if envelope.ok {
            envelope
                .result
                .ok_or_else(|| ChannelError::Network("Empty response".to_string()))
        } else {
            Err(ChannelError::Api {
                status: status.as_u16(),
                body: envelope
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            })
        }
    }

    fn format_message(message: &Notification) -> String {
        let mut text = format!(
            "*{}*\n\n{}",
            escape_markdown(&message.title),
            escape_markdown(&message.body)
        );

        if let Some(data) = &message.data {
            if !data.is_empty() {
                text.push_str("\n\n_Details:_");
                for (key, value) in data {
                    text.push_str(&format!(
                        "\n• *{}:* {}",
                        escape_markdown(key),
                        escape_markdown(&value_to_text(value))
                    ));
                }
            }
        }

        text
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }

    fn validate_recipient(&self, recipient: &str) -> bool {
        is_telegram_recipient(recipient)
    }

    async fn send(&self, recipient: &str, message: &Notification) -> NotificationResponse {
        if !self.is_configured() {
            return NotificationResponse::failure(
                "Telegram channel is not configured",
                None,
                Some("telegram"),
            );
        }

        if !self.validate_recipient(recipient) {
            return NotificationResponse::failure(
                "Invalid Telegram recipient (use @username or chat_id)",
                Some(json!({ "recipient": recipient })),
                Some("telegram"),
            );
        }

        let text = Self::format_message(message);

        match self.send_message(recipient, &text).await {
            Ok(result) => NotificationResponse::success(
                result.message_id.to_string(),
                Some(json!({ "chatId": result.chat.id })),
                Some("telegram"),
            ),
            Err(e) => e.into_response("telegram"),
        }
    }
}

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct BotApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Sent message, trimmed to what we read.
#[derive(Debug, Deserialize)]
struct MessageResult {
    message_id: i64,
    chat: ChatResult,
}

#[derive(Debug, Deserialize)]
struct ChatResult {
    id: i64,
}

/// Escape Telegram Markdown metacharacters in user-supplied text.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '=' | '|'
                | '{' | '}' | '.' | '!'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
