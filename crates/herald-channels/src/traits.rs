//! The channel adapter contract.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use herald_core::secrets::{COMMON_SECRET_PATTERNS, scrub_secrets};
use herald_core::types::{Notification, NotificationResponse};

/// Faults an adapter can hit between its pre-checks and the provider's
/// answer. These never cross the dispatch boundary: `Channel::send`
/// converts them into failure responses.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with a non-success status.
    #[error("Provider rejected request ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider error body, truncated.
        body: String,
    },

    /// Rate limited by the provider.
    #[error("Rate limited by provider")]
    RateLimited,

    /// Adapter misconfiguration discovered at send time.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local IO failure (e.g. reading an attachment).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// Convert the fault into a failure response attributed to `channel`,
    /// with the error text scrubbed of credential-shaped values and any
    /// structured context preserved in `data`.
    #[must_use]
    pub fn into_response(self, channel: &str) -> NotificationResponse {
        let context = match &self {
            Self::Api { status, body } => Some(json!({
                "status": status,
                "body": scrub_secrets(body, COMMON_SECRET_PATTERNS),
            })),
            Self::RateLimited => Some(json!({ "retryable": true })),
            _ => None,
        };
        NotificationResponse::failure(
            scrub_secrets(&self.to_string(), COMMON_SECRET_PATTERNS),
            context,
            Some(channel),
        )
    }
}

/// One delivery provider behind a uniform capability set.
///
/// `send` performs exactly one provider call and always returns a
/// [`NotificationResponse`] — adapter faults are caught locally and
/// converted, never propagated.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable lowercase identifier used as the registry key
    /// (e.g. "email", "sms"). Constant for the adapter's lifetime.
    fn name(&self) -> &str;

    /// Whether all credentials/endpoints this provider needs are present
    /// and non-empty. Pure: no I/O, no errors.
    fn is_configured(&self) -> bool;

    /// Whether `recipient` matches this provider's addressing syntax.
    /// Pure: checks shape, not deliverability.
    fn validate_recipient(&self, recipient: &str) -> bool;

    /// Deliver `message` to `recipient` through this provider.
    async fn send(&self, recipient: &str, message: &Notification) -> NotificationResponse;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_response_carries_status() {
        let err = ChannelError::Api {
            status: 403,
            body: "forbidden".to_string(),
        };
        let response = err.into_response("slack");
        assert!(response.is_failure());
        assert_eq!(response.channel.as_deref(), Some("slack"));
        assert_eq!(response.data.as_ref().unwrap()["status"], 403);
    }

    #[test]
    fn test_error_response_scrubs_secrets() {
        let err = ChannelError::Network(
            "POST https://example.com/send?access_token=EAAB-secret failed".to_string(),
        );
        let response = err.into_response("messenger");
        let error = response.error.unwrap();
        assert!(error.contains("[REDACTED]"));
        assert!(!error.contains("EAAB-secret"));
    }

    #[test]
    fn test_rate_limit_is_marked_retryable() {
        let response = ChannelError::RateLimited.into_response("telegram");
        assert_eq!(response.data.unwrap()["retryable"], true);
    }
}
