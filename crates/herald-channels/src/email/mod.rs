//! Email channel adapter over SMTP.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::json;
use uuid::Uuid;

use herald_core::config::EmailConfig;
use herald_core::types::{Notification, NotificationResponse};
use herald_core::validation::is_email;

use crate::format::value_to_text;
use crate::traits::{Channel, ChannelError};

/// Email channel adapter using an SMTP relay.
pub struct EmailChannel {
    config: EmailConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl EmailChannel {
    /// Create a new email channel.
    ///
    /// The SMTP transport is built eagerly when credentials are present;
    /// no connection is opened until the first send.
    #[must_use]
    pub fn new(config: EmailConfig) -> Self {
        let transport = if config_has_auth(&config) {
            match build_transport(&config) {
                Ok(transport) => Some(transport),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to build SMTP transport");
                    None
                }
            }
        } else {
            None
        };

        Self { config, transport }
    }

    async fn deliver(
        &self,
        recipient: &str,
        message: &Notification,
    ) -> Result<NotificationResponse, ChannelError> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| ChannelError::Config("SMTP transport unavailable".to_string()))?;

        let from: Mailbox = self
            .config
            .from_address()
            .ok_or_else(|| ChannelError::Config("no from address configured".to_string()))?
            .parse()
            .map_err(|e| ChannelError::Config(format!("invalid from address: {e}")))?;
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| ChannelError::Config(format!("invalid recipient address: {e}")))?;

        let message_id = format!("<{}@{}>", Uuid::new_v4(), self.config.host());

        let alternative = MultiPart::alternative_plain_html(
            message.body.clone(),
            self.html_body(message),
        );

        let body = match &message.attachments {
            Some(paths) if !paths.is_empty() => {
                let mut mixed = MultiPart::mixed().multipart(alternative);
                for path in paths {
                    let bytes = tokio::fs::read(path).await?;
                    let filename = std::path::Path::new(path)
                        .file_name()
                        .and_then(|name| name.to_str())
                        .unwrap_or("attachment")
                        .to_string();
                    let content_type = ContentType::parse("application/octet-stream")
                        .map_err(|e| ChannelError::Config(e.to_string()))?;
                    mixed = mixed.singlepart(Attachment::new(filename).body(bytes, content_type));
                }
                mixed
            }
            _ => alternative,
        };

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(message.title.clone())
            .message_id(Some(message_id.clone()))
            .multipart(body)
            .map_err(|e| ChannelError::Config(e.to_string()))?;

        let result = transport
            .send(email)
            .await
            .map_err(|e| ChannelError::Network(e.to_string()))?;

        Ok(NotificationResponse::success(
            message_id,
            Some(json!({ "code": result.code().to_string() })),
            Some("email"),
        ))
    }

    fn html_body(&self, message: &Notification) -> String {
        let mut html = format!("<h2>{}</h2><p>{}</p>", message.title, message.body);

        if let Some(data) = &message.data {
            if !data.is_empty() {
                html.push_str("<hr><h3>Additional Information:</h3><ul>");
                for (key, value) in data {
                    html.push_str(&format!(
                        "<li><strong>{key}:</strong> {}</li>",
                        value_to_text(value)
                    ));
                }
                html.push_str("</ul>");
            }
        }

        html
    }
}

#[async_trait]
impl Channel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    fn is_configured(&self) -> bool {
        config_has_auth(&self.config)
    }

    fn validate_recipient(&self, recipient: &str) -> bool {
        is_email(recipient)
    }

    async fn send(&self, recipient: &str, message: &Notification) -> NotificationResponse {
        if !self.is_configured() {
            return NotificationResponse::failure(
                "Email channel is not configured",
                None,
                Some("email"),
            );
        }

        if !self.validate_recipient(recipient) {
            return NotificationResponse::failure(
                "Invalid email address",
                Some(json!({ "recipient": recipient })),
                Some("email"),
            );
        }

        match self.deliver(recipient, message).await {
            Ok(response) => response,
            Err(e) => e.into_response("email"),
        }
    }
}

fn config_has_auth(config: &EmailConfig) -> bool {
    config
        .auth
        .as_ref()
        .is_some_and(|auth| !auth.user.is_empty() && !auth.pass.is_empty())
}

fn build_transport(
    config: &EmailConfig,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, lettre::transport::smtp::Error> {
    let builder = if config.secure {
        AsyncSmtpTransport::<Tokio1Executor>::relay(config.host())?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(config.host())?
    };

    let auth = config.auth.as_ref().map_or_else(
        || Credentials::new(String::new(), String::new()),
        |auth| Credentials::new(auth.user.clone(), auth.pass.clone()),
    );

    Ok(builder.port(config.port()).credentials(auth).build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::config::EmailAuth;
    use serde_json::Map;

    fn configured() -> EmailChannel {
        EmailChannel::new(EmailConfig {
            host: Some("smtp.example.com".to_string()),
            auth: Some(EmailAuth {
                user: "sender@example.com".to_string(),
                pass: "hunter2".to_string(),
            }),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_channel_name() {
        assert_eq!(configured().name(), "email");
    }

    #[tokio::test]
    async fn test_is_configured_requires_auth() {
        assert!(configured().is_configured());
        assert!(!EmailChannel::new(EmailConfig::default()).is_configured());

        let empty_pass = EmailChannel::new(EmailConfig {
            auth: Some(EmailAuth {
                user: "user".to_string(),
                pass: String::new(),
            }),
            ..Default::default()
        });
        assert!(!empty_pass.is_configured());
    }

    #[tokio::test]
    async fn test_validate_recipient() {
        let channel = configured();
        assert!(channel.validate_recipient("a@b.com"));
        assert!(!channel.validate_recipient("not-an-email"));
    }

    #[tokio::test]
    async fn test_send_unconfigured() {
        let channel = EmailChannel::new(EmailConfig::default());
        let response = channel
            .send("a@b.com", &Notification::new("T", "B"))
            .await;
        assert!(response.is_failure());
        assert!(response.error.as_deref().unwrap().contains("not configured"));
        assert_eq!(response.channel.as_deref(), Some("email"));
    }

    #[tokio::test]
    async fn test_send_invalid_recipient() {
        let response = configured()
            .send("nope", &Notification::new("T", "B"))
            .await;
        assert!(response.is_failure());
        assert!(
            response
                .error
                .as_deref()
                .unwrap()
                .contains("Invalid email address")
        );
        assert_eq!(response.data.unwrap()["recipient"], "nope");
    }

    #[tokio::test]
    async fn test_html_body_flattens_data() {
        let mut data = Map::new();
        data.insert("order".to_string(), json!("A-17"));
        data.insert("total".to_string(), json!(99));

        let message = Notification::new("Title", "Body").with_data(data);
        let html = configured().html_body(&message);

        assert!(html.contains("<h2>Title</h2>"));
        assert!(html.contains("<li><strong>order:</strong> A-17</li>"));
        assert!(html.contains("<li><strong>total:</strong> 99</li>"));
    }

    #[tokio::test]
    async fn test_html_body_omits_empty_data() {
        let message = Notification::new("Title", "Body");
        let html = configured().html_body(&message);
        assert!(!html.contains("Additional Information"));
    }
}
