//! Voice call channel adapter using the Twilio Calls API.

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

/// Spoken text longer than this makes for unusable calls; reject early.
const MAX_VOICE_CHARS: usize = 1000;

/// Voice call channel adapter: the notification is read out via TwiML.
pub struct VoiceChannel {
    client: Client,
    account_sid: String,
    auth_token: ApiKey,
    from_number: String,
    api_base: String,
}

impl VoiceChannel {
    /// Create a new voice channel.
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

    async fn create_call(&self, to: &str, twiml: &str) -> Result<TwilioCall, ChannelError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.api_base, self.account_sid
        );
        let params = [
            ("To", to),
            ("From", self.from_number.as_str()),
            ("Twiml", twiml),
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

    fn spoken_text(message: &Notification) -> String {
        format!("{}. {}", message.title, message.body)
    }

    /// Build the TwiML `<Say>` document. Voice and language come from the
    /// message options, defaulting to Twilio's `alice` / `en-US`.
    fn build_twiml(message: &Notification, text: &str) -> String {
        let options = message.options.as_ref();
        let voice = options
            .and_then(|o| o.get("voice"))
            .map_or_else(|| "alice".to_string(), value_to_text);
        let language = options
            .and_then(|o| o.get("language"))
            .map_or_else(|| "en-US".to_string(), value_to_text);

        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n  <Say voice=\"{voice}\" language=\"{language}\">{}</Say>\n</Response>",
            escape_xml(text)
        )
    }
}

#[async_trait]
impl Channel for VoiceChannel {
    fn name(&self) -> &str {
        "voice"
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
                "Voice channel is not configured",
                None,
                Some("voice"),
            );
        }

        if !self.validate_recipient(recipient) {
            return NotificationResponse::failure(
                "Invalid phone number (E.164 format required)",
                Some(json!({ "recipient": recipient })),
                Some("voice"),
            );
        }

        let text = Self::spoken_text(message);
        let length = text.chars().count();
        if length > MAX_VOICE_CHARS {
            return NotificationResponse::failure(
                format!("Voice message exceeds maximum length of {MAX_VOICE_CHARS} characters"),
                Some(json!({ "length": length })),
                Some("voice"),
            );
        }

        let twiml = Self::build_twiml(message, &text);

        match self.create_call(recipient, &twiml).await {
            Ok(result) => NotificationResponse::success(
                result.sid,
                Some(json!({ "status": result.status, "direction": result.direction })),
                Some("voice"),
            ),
            Err(e) => e.into_response("voice"),
        }
    }
}

/// Subset of the Calls resource Twilio returns.
#[derive(Debug, Deserialize)]
struct TwilioCall {
    sid: String,
    status: Option<String>,
    direction: Option<String>,
}

fn escape_xml(unsafe_text: &str) -> String {
    let mut escaped = String::with_capacity(unsafe_text.len());
    for c in unsafe_text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
