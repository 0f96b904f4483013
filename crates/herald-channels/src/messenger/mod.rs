//! Facebook Messenger channel adapter using the Graph API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use herald_core::config::MessengerConfig;
use herald_core::secrets::ApiKey;
use herald_core::types::{Notification, NotificationResponse};
use herald_core::validation::is_numeric_id;

use crate::format::value_to_text;
use crate::traits::{Channel, ChannelError};

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v18.0";

/// Messenger channel adapter sending via the page's Send API.
pub struct MessengerChannel {
    client: Client,
    token: ApiKey,
    api_base: String,
}

impl MessengerChannel {
    /// Create a new Messenger channel.
    #[must_use]
    pub fn new(config: MessengerConfig) -> Self {
        Self {
            client: Client::new(),
            token: ApiKey::new(config.page_access_token),
            api_base: GRAPH_API_BASE.to_string(),
        }
    }

    /// Override the API base URL (tests point this at a local server).
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    async fn send_text(&self, recipient: &str, text: &str) -> Result<SendResult, ChannelError> {
        let url = format!("{}/me/messages", self.api_base);
        let payload = json!({
            "recipient": { "id": recipient },
            "message": { "text": text },
        });

        let response = self
            .client
            .post(&url)
            .query(&[("access_token", self.token.expose())])
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChannelError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ChannelError::RateLimited);
            }
            let text = response.text().await.unwrap_or_default();
            // Graph errors carry a structured message; surface it when present.
            let body = serde_json::from_str::<GraphErrorEnvelope>(&text)
                .map_or(text, |envelope| envelope.error.message);
            return Err(ChannelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ChannelError::Network(e.to_string()))
    }

    fn format_message(message: &Notification) -> String {
        let mut text = format!("{}\n\n{}", message.title, message.body);

        if let Some(data) = &message.data {
            if !data.is_empty() {
                text.push_str("\n\n📋 Details:");
                for (key, value) in data {
                    text.push_str(&format!("\n• {key}: {}", value_to_text(value)));
                }
            }
        }

        text
    }
}

#[async_trait]
impl Channel for MessengerChannel {
    fn name(&self) -> &str {
        "messenger"
    }

    fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }

    fn validate_recipient(&self, recipient: &str) -> bool {
        is_numeric_id(recipient)
    }

    async fn send(&self, recipient: &str, message: &Notification) -> NotificationResponse {
        if !self.is_configured() {
            return NotificationResponse::failure(
                "Messenger channel is not configured",
                None,
                Some("messenger"),
            );
        }

        if !self.validate_recipient(recipient) {
            return NotificationResponse::failure(
                "Invalid Facebook user ID (numeric ID required)",
                Some(json!({ "recipient": recipient })),
                Some("messenger"),
            );
        }

        let text = Self::format_message(message);

        match self.send_text(recipient, &text).await {
            Ok(result) => NotificationResponse::success(
                result.message_id,
                Some(json!({ "recipientId": result.recipient_id })),
                Some("messenger"),
            ),
            Err(e) => e.into_response("messenger"),
        }
    }
}

/// Send API success payload.
#[derive(Debug, Deserialize)]
struct SendResult {
    message_id: String,
    recipient_id: Option<String>,
}

/// Graph API error envelope.
#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphError,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}
