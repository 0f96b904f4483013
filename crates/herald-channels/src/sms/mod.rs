//! SMS channel adapter using the Twilio Messages API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use herald_core::config::TwilioConfig;
use herald_core::secrets::ApiKey;
use herald_core::types::{Notification, NotificationResponse};
use herald_core::validation::is_e164;

use crate::format::value_to_text;
use crate::traits::{Channel, ChannelError};

const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Twilio caps message bodies at 1600 characters.
const MAX_SMS_CHARS: usize = 1600;

/// SMS channel adapter.
pub struct SmsChannel {
    client: Client,
    account_sid: String,
    auth_token: ApiKey,
    from_number: String,
    api_base: String,
}

impl SmsChannel {
    /// Create a new SMS channel.
    #[must_use]
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            client: Client::new(),
            account_sid: config.account_sid,
            auth_token: ApiKey::new(config.auth_token),
            from_number: config.from_number,
            api_base: TWILIO_API_BASE.to_string(),
        }
    }

    /// Override the API base URL (tests point this at a local server).
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// POST to the Messages endpoint.
    async fn create_message(&self, to: &str, body: &str) -> Result<TwilioMessage, ChannelError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        );
        let params = [
            ("To", to),
            ("From", self.from_number.as_str()),
            ("Body", body),
        ];

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
        let mut body = format!("{}\n\n{}", message.title, message.body);

        if let Some(data) = &message.data {
            if !data.is_empty() {
                body.push_str("\n\n");
                for (key, value) in data {
                    body.push_str(&format!("{key}: {}\n", value_to_text(value)));
                }
            }
        }

        body
    }
}

#[async_trait]
impl Channel for SmsChannel {
    fn name(&self) -> &str {
        "sms"
    }

    fn is_configured(&self) -> bool {
        !self.account_sid.is_empty()
            && !self.auth_token.is_empty()
            && !self.from_number.is_empty()
    }

    fn validate_recipient(&self, recipient: &str) -> bool {
        is_e164(recipient)
    }

    async fn send(&self, recipient: &str, message: &Notification) -> NotificationResponse {
        if !self.is_configured() {
            return NotificationResponse::failure(
                "SMS channel is not configured",
                None,
                Some("sms"),
            );
        }

        if !self.validate_recipient(recipient) {
            return NotificationResponse::failure(
                "Invalid phone number (E.164 format required)",
                Some(json!({ "recipient": recipient })),
                Some("sms"),
            );
        }

        let body = self.format_body(message);
        let length = body.chars().count();
        if length > MAX_SMS_CHARS {
            return NotificationResponse::failure(
                format!("SMS body exceeds maximum length of {MAX_SMS_CHARS} characters"),
                Some(json!({ "length": length })),
                Some("sms"),
            );
        }

        match self.create_message(recipient, &body).await {
            Ok(result) => NotificationResponse::success(
                result.sid,
                Some(json!({ "status": result.status, "dateCreated": result.date_created })),
                Some("sms"),
            ),
            Err(e) => e.into_response("sms"),
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn config() -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from_number: "+15550001111".to_string(),
            whatsapp_from: None,
        }
    }

    #[test]
    fn test_channel_name() {
        assert_eq!(SmsChannel::new(config()).name(), "sms");
    }

    #[test]
    fn test_is_configured() {
        assert!(SmsChannel::new(config()).is_configured());
        assert!(!SmsChannel::new(TwilioConfig::default()).is_configured());
    }

    #[test]
    fn test_validate_recipient() {
        let channel = SmsChannel::new(config());
        assert!(channel.validate_recipient("+15551234567"));
        assert!(!channel.validate_recipient("12345"));
        assert!(!channel.validate_recipient("+0123"));
    }

    #[test]
    fn test_format_body_flattens_data() {
        let mut data = Map::new();
        data.insert("order".to_string(), json!("A-17"));

        let channel = SmsChannel::new(config());
        let body = channel.format_body(&Notification::new("Alert", "Disk full").with_data(data));
        assert_eq!(body, "Alert\n\nDisk full\n\norder: A-17\n");

        let plain = channel.format_body(&Notification::new("Alert", "Disk full"));
        assert_eq!(plain, "Alert\n\nDisk full");
    }

    #[tokio::test]
    async fn test_send_invalid_recipient_skips_transport() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let channel = SmsChannel::new(config()).with_api_base(server.url());
        let response = channel.send("12345", &Notification::new("T", "B")).await;

        assert!(response.is_failure());
        assert!(
            response
                .error
                .as_deref()
                .unwrap()
                .contains("Invalid phone number")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_oversized_body_skips_transport() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let channel = SmsChannel::new(config()).with_api_base(server.url());
        // Title (1) + separator (2) + body fills the rest: 1601 total.
        let body = "x".repeat(1598);
        let response = channel
            .send("+15551234567", &Notification::new("T", body))
            .await;

        assert!(response.is_failure());
        assert!(response.error.as_deref().unwrap().contains("1600"));
        assert_eq!(response.data.unwrap()["length"], 1601);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/2010-04-01/Accounts/AC123/Messages.json")
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sid": "SM900", "status": "queued", "date_created": "Mon, 04 Aug 2025 09:00:00 +0000"}"#)
            .create_async()
            .await;

        let channel = SmsChannel::new(config()).with_api_base(server.url());
        let response = channel
            .send("+15551234567", &Notification::new("T", "B"))
            .await;

        assert!(response.is_success());
        assert_eq!(response.message_id.as_deref(), Some("SM900"));
        assert_eq!(response.channel.as_deref(), Some("sms"));
        assert_eq!(response.data.unwrap()["status"], "queued");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_api_rejection_becomes_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2010-04-01/Accounts/AC123/Messages.json")
            .with_status(401)
            .with_body(r#"{"code": 20003, "message": "Authenticate"}"#)
            .create_async()
            .await;

        let channel = SmsChannel::new(config()).with_api_base(server.url());
        let response = channel
            .send("+15551234567", &Notification::new("T", "B"))
            .await;

        assert!(response.is_failure());
        assert_eq!(response.data.as_ref().unwrap()["status"], 401);
        assert_eq!(response.channel.as_deref(), Some("sms"));
    }
}
