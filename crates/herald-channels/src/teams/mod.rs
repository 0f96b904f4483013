//! Microsoft Teams channel adapter using an incoming webhook.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use herald_core::config::TeamsConfig;
use herald_core::types::{Notification, NotificationResponse};

use crate::format::value_to_text;
use crate::traits::{Channel, ChannelError};

/// Teams channel adapter posting Adaptive Cards to a webhook.
///
/// The webhook already addresses one room, so the recipient argument is
/// accepted as-is and ignored for routing.
pub struct TeamsChannel {
    client: Client,
    config: TeamsConfig,
}

impl TeamsChannel {
    /// Create a new Teams channel.
    #[must_use]
    pub fn new(config: TeamsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn post_card(&self, card: &Value) -> Result<u16, ChannelError> {
        let response = self
            .client
            .post(&self.config.webhook_url)
            .header("Content-Type", "application/json")
            .json(card)
            .send()
            .await
            .map_err(|e| ChannelError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ChannelError::RateLimited);
            }
            let text = response.text().await.unwrap_or_default();
            return Err(ChannelError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(status.as_u16())
    }

    fn build_card(&self, message: &Notification) -> Value {
        let mut body = vec![
            json!({
                "type": "TextBlock",
                "text": message.title,
                "size": "Large",
                "weight": "Bolder",
            }),
            json!({
                "type": "TextBlock",
                "text": message.body,
                "wrap": true,
            }),
        ];

        if let Some(data) = &message.data {
            if !data.is_empty() {
                let facts: Vec<Value> = data
                    .iter()
                    .map(|(key, value)| json!({ "title": key, "value": value_to_text(value) }))
                    .collect();
                body.push(json!({ "type": "FactSet", "facts": facts }));
            }
        }

        json!({
            "type": "message",
            "attachments": [{
                "contentType": "application/vnd.microsoft.card.adaptive",
                "content": {
                    "type": "AdaptiveCard",
                    "$schema": "http://adaptivecards.io/schemas/adaptive-card.json",
                    "version": "1.4",
                    "body": body,
                },
            }],
        })
    }
}

#[async_trait]
impl Channel for TeamsChannel {
    fn name(&self) -> &str {
        "teams"
    }

    fn is_configured(&self) -> bool {
        !self.config.webhook_url.is_empty()
    }

    fn validate_recipient(&self, _recipient: &str) -> bool {
        // The webhook decides the destination; nothing to check.
        true
    }

    async fn send(&self, _recipient: &str, message: &Notification) -> NotificationResponse {
        if !self.is_configured() {
            return NotificationResponse::failure(
                "Teams channel is not configured",
                None,
                Some("teams"),
            );
        }

        let card = self.build_card(message);

        match self.post_card(&card).await {
            Ok(status) => NotificationResponse::success(
                format!("teams_{}", chrono::Utc::now().timestamp_millis()),
                Some(json!({ "status": status })),
                Some("teams"),
            ),
            Err(e) => e.into_response("teams"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_channel_name() {
        let channel = TeamsChannel::new(TeamsConfig {
            webhook_url: "https://example.com/hook".to_string(),
        });
        assert_eq!(channel.name(), "teams");
    }

    #[test]
    fn test_is_configured() {
        assert!(!TeamsChannel::new(TeamsConfig::default()).is_configured());
    }

    #[test]
    fn test_any_recipient_is_valid() {
        let channel = TeamsChannel::new(TeamsConfig::default());
        assert!(channel.validate_recipient(""));
        assert!(channel.validate_recipient("anything"));
    }

    #[test]
    fn test_card_includes_facts() {
        let mut data = Map::new();
        data.insert("region".to_string(), json!("eu-west-1"));

        let channel = TeamsChannel::new(TeamsConfig::default());
        let card = channel.build_card(&Notification::new("Alert", "Down").with_data(data));

        let body = &card["attachments"][0]["content"]["body"];
        assert_eq!(body[0]["text"], "Alert");
        assert_eq!(body[2]["type"], "FactSet");
        assert_eq!(body[2]["facts"][0]["title"], "region");

        let plain = channel.build_card(&Notification::new("Alert", "Down"));
        assert_eq!(
            plain["attachments"][0]["content"]["body"]
                .as_array()
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_send_posts_to_webhook() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(200)
            .with_body("1")
            .create_async()
            .await;

        let channel = TeamsChannel::new(TeamsConfig {
            webhook_url: format!("{}/hook", server.url()),
        });
        let response = channel.send("room", &Notification::new("T", "B")).await;

        assert!(response.is_success());
        assert!(response.message_id.as_deref().unwrap().starts_with("teams_"));
        assert_eq!(response.data.unwrap()["status"], 200);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_surfaces_webhook_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(400)
            .with_body("Invalid payload")
            .create_async()
            .await;

        let channel = TeamsChannel::new(TeamsConfig {
            webhook_url: format!("{}/hook", server.url()),
        });
        let response = channel.send("room", &Notification::new("T", "B")).await;

        assert!(response.is_failure());
        assert_eq!(response.data.as_ref().unwrap()["status"], 400);
        assert_eq!(response.channel.as_deref(), Some("teams"));
    }
}
