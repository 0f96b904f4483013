//! Discord channel adapter using the REST bot API.
//!
//! Numeric recipients are treated as user ids and messaged through a DM
//! channel; anything else is resolved as a guild text channel name
//! (leading `#` optional).

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{Value, json};

use herald_core::config::DiscordConfig;
use herald_core::secrets::ApiKey;
use herald_core::types::{Notification, NotificationResponse};
use herald_core::validation::is_numeric_id;

use crate::format::value_to_text;
use crate::traits::{Channel, ChannelError};

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Discord blurple, used as the embed accent color.
const EMBED_COLOR: u32 = 0x0058_65F2;

/// Guild text channel type discriminator.
const CHANNEL_TYPE_TEXT: u8 = 0;

/// Discord channel adapter.
pub struct DiscordChannel {
    client: Client,
    token: ApiKey,
    guild_id: Option<String>,
    api_base: String,
}

impl DiscordChannel {
    /// Create a new Discord channel.
    #[must_use]
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            client: Client::new(),
            token: ApiKey::new(config.bot_token),
            guild_id: config.guild_id,
            api_base: DISCORD_API_BASE.to_string(),
        }
    }

    /// Override the API base URL (tests point this at a local server).
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Call a Discord REST endpoint with bot authorization.
    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, ChannelError> {
        let url = format!("{}{}", self.api_base, path);

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", format!("Bot {}", self.token.expose()));

        if let Some(b) = body {
            request = request.json(b);
        }

        let response = request
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

        response
            .json()
            .await
            .map_err(|e| ChannelError::Network(e.to_string()))
    }

    async fn deliver(
        &self,
        recipient: &str,
        message: &Notification,
    ) -> Result<NotificationResponse, ChannelError> {
        let embed = Self::build_embed(message);

        if is_numeric_id(recipient) {
            // User id: open (or reuse) a DM channel.
            let dm: ChannelObject = self
                .call(
                    Method::POST,
                    "/users/@me/channels",
                    Some(&json!({ "recipient_id": recipient })),
                )
                .await?;

            let sent: MessageObject = self
                .call(
                    Method::POST,
                    &format!("/channels/{}/messages", dm.id),
                    Some(&json!({ "embeds": [embed] })),
                )
                .await?;

            return Ok(NotificationResponse::success(
                sent.id,
                Some(json!({ "channelId": dm.id })),
                Some("discord"),
            ));
        }

        // Channel name: resolve within the configured guild, or the first
        // guild the bot belongs to.
        let guild_id = match &self.guild_id {
            Some(id) => id.clone(),
            None => {
                let guilds: Vec<GuildObject> =
                    self.call(Method::GET, "/users/@me/guilds", None).await?;
                match guilds.into_iter().next() {
                    Some(guild) => guild.id,
                    None => {
                        return Ok(NotificationResponse::failure(
                            "No guild found",
                            None,
                            Some("discord"),
                        ));
                    }
                }
            }
        };

        let channels: Vec<ChannelObject> = self
            .call(Method::GET, &format!("/guilds/{guild_id}/channels"), None)
            .await?;

        let wanted = recipient.trim_start_matches('#');
        let Some(target) = channels.into_iter().find(|channel| {
            channel.kind == Some(CHANNEL_TYPE_TEXT) && channel.name.as_deref() == Some(wanted)
        }) else {
            return Ok(NotificationResponse::failure(
                format!("Channel {recipient} not found"),
                None,
                Some("discord"),
            ));
        };

        let sent: MessageObject = self
            .call(
                Method::POST,
                &format!("/channels/{}/messages", target.id),
                Some(&json!({ "embeds": [embed] })),
            )
            .await?;

        Ok(NotificationResponse::success(
            sent.id,
            Some(json!({ "channelId": target.id, "guildId": guild_id })),
            Some("discord"),
        ))
    }

    fn build_embed(message: &Notification) -> Value {
        let mut embed = json!({
            "title": message.title,
            "description": message.body,
            "color": EMBED_COLOR,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let Some(data) = &message.data {
            if !data.is_empty() {
                let fields: Vec<Value> = data
                    .iter()
                    .map(|(key, value)| {
                        json!({ "name": key, "value": value_to_text(value), "inline": true })
                    })
                    .collect();
                embed["fields"] = json!(fields);
            }
        }

        embed
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }

    fn validate_recipient(&self, recipient: &str) -> bool {
        !recipient.is_empty()
    }

    async fn send(&self, recipient: &str, message: &Notification) -> NotificationResponse {
        if !self.is_configured() {
            return NotificationResponse::failure(
                "Discord channel is not configured",
                None,
                Some("discord"),
            );
        }

        if !self.validate_recipient(recipient) {
            return NotificationResponse::failure(
                "Invalid Discord recipient",
                Some(json!({ "recipient": recipient })),
                Some("discord"),
            );
        }

        match self.deliver(recipient, message).await {
            Ok(response) => response,
            Err(e) => e.into_response("discord"),
        }
    }
}

/// Channel object (DM or guild channel); only the fields we read.
#[derive(Debug, Deserialize)]
struct ChannelObject {
    id: String,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<u8>,
}

/// Created message object.
#[derive(Debug, Deserialize)]
struct MessageObject {
    id: String,
}

/// Partial guild object.
#[derive(Debug, Deserialize)]
struct GuildObject {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn config() -> DiscordConfig {
        DiscordConfig {
            bot_token: "bot-token".to_string(),
            guild_id: Some("900100".to_string()),
        }
    }

    #[test]
    fn test_channel_name() {
        assert_eq!(DiscordChannel::new(config()).name(), "discord");
    }

    #[test]
    fn test_validate_recipient() {
        let channel = DiscordChannel::new(config());
        assert!(channel.validate_recipient("123456"));
        assert!(channel.validate_recipient("#alerts"));
        assert!(!channel.validate_recipient(""));
    }

    #[test]
    fn test_embed_includes_data_fields() {
        let mut data = Map::new();
        data.insert("env".to_string(), json!("prod"));

        let embed =
            DiscordChannel::build_embed(&Notification::new("Alert", "Down").with_data(data));
        assert_eq!(embed["title"], "Alert");
        assert_eq!(embed["fields"][0]["name"], "env");
        assert_eq!(embed["fields"][0]["inline"], true);

        let plain = DiscordChannel::build_embed(&Notification::new("Alert", "Down"));
        assert!(plain.get("fields").is_none());
    }

    #[tokio::test]
    async fn test_send_dm_to_user_id() {
        let mut server = mockito::Server::new_async().await;
        let dm_mock = server
            .mock("POST", "/users/@me/channels")
            .match_header("authorization", "Bot bot-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "555000", "type": 1}"#)
            .create_async()
            .await;
        let message_mock = server
            .mock("POST", "/channels/555000/messages")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "777888"}"#)
            .create_async()
            .await;

        let channel = DiscordChannel::new(config()).with_api_base(server.url());
        let response = channel.send("424242", &Notification::new("T", "B")).await;

        assert!(response.is_success());
        assert_eq!(response.message_id.as_deref(), Some("777888"));
        assert_eq!(response.data.unwrap()["channelId"], "555000");
        dm_mock.assert_async().await;
        message_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_to_unknown_channel_name() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/guilds/900100/channels")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id": "1", "name": "general", "type": 0}]"#)
            .create_async()
            .await;

        let channel = DiscordChannel::new(config()).with_api_base(server.url());
        let response = channel.send("#alerts", &Notification::new("T", "B")).await;

        assert!(response.is_failure());
        assert!(response.error.as_deref().unwrap().contains("not found"));
        assert_eq!(response.channel.as_deref(), Some("discord"));
    }
}
