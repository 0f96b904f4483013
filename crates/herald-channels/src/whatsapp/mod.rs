//! WhatsApp channel adapter using the Twilio Messages API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use herald_core::config::TwilioConfig;
use herald_core::secrets::ApiKey;
use herald_core::types::{Notification, NotificationResponse};
use herald_core::validation::is_whatsapp_address;

use crate::format::value_to_text;
use crate::traits::{Channel, ChannelError};

const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// WhatsApp channel adapter.
///
/// Rides the same Twilio Messages endpoint as SMS; the `whatsapp:` prefix
/// on both sender and recipient selects the WhatsApp transport.
pub struct WhatsAppChannel {
    client: Client,
    account_sid: String,
    auth_token: ApiKey,
    from_number: String,
    whatsapp_from: Option<String>,
    api_base: String,
}

impl WhatsAppChannel {
    /// Create a new WhatsApp channel.
    #[must_use]
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            client: Client::new(),
            account_sid: config.account_sid,
            auth_token: ApiKey::new(config.auth_token),
            from_number: config.from_number,
            whatsapp_from: config.whatsapp_from,
            api_base: TWILIO_API_BASE.to_string(),
        }
    }

    /// Override the API base URL (tests point this at a local server).
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Sender address: explicit `whatsappFrom`, else the SMS number with
    /// the `whatsapp:` prefix.
    fn from_address(&self) -> String {
        self.whatsapp_from
            .clone()
            .unwrap_or_else(|| format!("whatsapp:{}", self.from_number))
    }

    async fn create_message(&self, to: &str, body: &str) -> Result<TwilioMessage, ChannelError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        );
        let from = self.from_address();
        let params = [("To", to), ("From", from.as_str()), ("Body", body)];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose()))
            .form(&params)
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

    fn format_body(&self, message: &Notification) -> String {
        let mut body = format!("*{}*\n\n{}", message.title, message.body);

        if let Some(data) = &message.data {
            if !data.is_empty() {
                body.push_str("\n\n_Details:_");
                for (key, value) in data {
                    body.push_str(&format!("\n• *{key}:* {}", value_to_text(value)));
                }
            }
        }

        body
    }
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn is_configured(&self) -> bool {
        !self.account_sid.is_empty()
            && !self.auth_token.is_empty()
            && (self.whatsapp_from.is_some() || !self.from_number.is_empty())
    }

    fn validate_recipient(&self, recipient: &str) -> bool {
        is_whatsapp_address(recipient)
    }

    async fn send(&self, recipient: &str, message: &Notification) -> NotificationResponse {
        if !self.is_configured() {
            return NotificationResponse::failure(
                "WhatsApp channel is not configured",
                None,
                Some("whatsapp"),
            );
        }

        if !self.validate_recipient(recipient) {
            return NotificationResponse::failure(
                "Invalid WhatsApp number (whatsapp:+phone format required)",
                Some(json!({ "recipient": recipient })),
                Some("whatsapp"),
            );
        }

        let body = self.format_body(message);

        match self.create_message(recipient, &body).await {
            Ok(result) => NotificationResponse::success(
                result.sid,
                Some(json!({ "status": result.status, "dateCreated": result.date_created })),
                Some("whatsapp"),
            ),
            Err(e) => e.into_response("whatsapp"),
        }
    }
}

/// Subset of the Messages resource Twilio returns.
#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
    status: Option<String>,
    date_created: Option<String>,
}
