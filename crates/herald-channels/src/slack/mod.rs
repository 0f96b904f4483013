//! Slack channel adapter using the Web API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use herald_core::config::SlackConfig;
use herald_core::secrets::ApiKey;
use herald_core::types::{Notification, NotificationResponse};
use herald_core::validation::is_slack_recipient;

use crate::format::value_to_text;
use crate::traits::{Channel, ChannelError};

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Slack channel adapter posting via `chat.postMessage`.
pub struct SlackChannel {
    client: Client,
    token: ApiKey,
    api_base: String,
}

impl SlackChannel {
    /// Create a new Slack channel.
    #[must_use]
    pub fn new(config: SlackConfig) -> Self {
        Self {
            client: Client::new(),
            token: ApiKey::new(config.bot_token),
            api_base: SLACK_API_BASE.to_string(),
        }
    }

    /// Override the API base URL (tests point this at a local server).
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Call `chat.postMessage`. Slack reports application errors inside a
    /// 200 envelope, so both transport and `ok: false` map to faults.
    async fn post_message(&self, params: &Value) -> Result<PostMessageResponse, ChannelError> {
        let url = format!("{}/chat.postMessage", self.api_base);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.token.expose()),
            )
            .header("Content-Type", "application/json; charset=utf-8")
            .json(params)
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

        let envelope: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| ChannelError::Network(e.to_string()))?;

        if envelope.ok {
            Ok(envelope)
        } else {
            Err(ChannelError::Api {
                status: status.as_u16(),
                body: envelope
                    .error
                    .unwrap_or_else(|| "Unknown error".to_string()),
            })
        }
    }

    /// Block Kit layout: header + body section, `data` as mrkdwn fields.
    fn build_blocks(&self, message: &Notification) -> Vec<Value> {
        let mut blocks = vec![
            json!({
                "type": "header",
                "text": { "type": "plain_text", "text": message.title },
            }),
            json!({
                "type": "section",
                "text": { "type": "mrkdwn", "text": message.body },
            }),
        ];

        if let Some(data) = &message.data {
            if !data.is_empty() {
                let fields: Vec<Value> = data
                    .iter()
                    .map(|(key, value)| {
                        json!({
                            "type": "mrkdwn",
                            "text": format!("*{key}:*\n{}", value_to_text(value)),
                        })
                    })
                    .collect();
                blocks.push(json!({ "type": "section", "fields": fields }));
            }
        }

        blocks
    }
}

#[async_trait]
impl Channel for SlackChannel {
    fn name(&self) -> &str {
        "slack"
    }

    fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }

    fn validate_recipient(&self, recipient: &str) -> bool {
        is_slack_recipient(recipient)
    }

    async fn send(&self, recipient: &str, message: &Notification) -> NotificationResponse {
        if !self.is_configured() {
            return NotificationResponse::failure(
                "Slack channel is not configured",
                None,
                Some("slack"),
            );
        }

        if !self.validate_recipient(recipient) {
            return NotificationResponse::failure(
                "Invalid Slack recipient (use #channel or @user)",
                Some(json!({ "recipient": recipient })),
                Some("slack"),
            );
        }

        let params = json!({
            "channel": recipient,
            "text": message.title,
            "blocks": self.build_blocks(message),
        });

        match self.post_message(&params).await {
            Ok(result) => NotificationResponse::success(
                result.ts.unwrap_or_default(),
                Some(json!({ "channel": result.channel })),
                Some("slack"),
            ),
            Err(e) => e.into_response("slack"),
        }
    }
}

/// `chat.postMessage` response envelope.
#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
    channel: Option<String>,
    ts: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn channel() -> SlackChannel {
        SlackChannel::new(SlackConfig {
            bot_token: "xoxb-test".to_string(),
        })
    }

    #[test]
    fn test_channel_name() {
        assert_eq!(channel().name(), "slack");
    }

    #[test]
    fn test_is_configured() {
        assert!(channel().is_configured());
        assert!(!SlackChannel::new(SlackConfig::default()).is_configured());
    }

    #[test]
    fn test_validate_recipient() {
        let channel = channel();
        assert!(channel.validate_recipient("#alerts"));
        assert!(channel.validate_recipient("@jane"));
        assert!(channel.validate_recipient("C024BE91L"));
        assert!(!channel.validate_recipient("two words"));
    }

    #[test]
    fn test_blocks_include_data_fields() {
        let mut data = Map::new();
        data.insert("host".to_string(), json!("db-3"));

        let blocks = channel().build_blocks(&Notification::new("Alert", "Down").with_data(data));
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0]["type"], "header");
        assert_eq!(blocks[2]["fields"][0]["text"], "*host:*\ndb-3");

        let plain = channel().build_blocks(&Notification::new("Alert", "Down"));
        assert_eq!(plain.len(), 2);
    }

    #[tokio::test]
    async fn test_send_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .match_header("authorization", "Bearer xoxb-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true, "channel": "C024BE91L", "ts": "1728300000.000100"}"#)
            .create_async()
            .await;

        let response = channel()
            .with_api_base(server.url())
            .send("#alerts", &Notification::new("T", "B"))
            .await;

        assert!(response.is_success());
        assert_eq!(response.message_id.as_deref(), Some("1728300000.000100"));
        assert_eq!(response.data.unwrap()["channel"], "C024BE91L");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_surfaces_slack_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat.postMessage")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": false, "error": "channel_not_found"}"#)
            .create_async()
            .await;

        let response = channel()
            .with_api_base(server.url())
            .send("#missing", &Notification::new("T", "B"))
            .await;

        assert!(response.is_failure());
        assert!(
            response
                .error
                .as_deref()
                .unwrap()
                .contains("channel_not_found")
        );
        assert_eq!(response.channel.as_deref(), Some("slack"));
    }
}
