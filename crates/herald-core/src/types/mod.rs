//! Core value types: the channel-agnostic notification and the normalized
//! outcome of one send attempt.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A channel-agnostic notification message.
///
/// Immutable: the `with_*` builders return a modified copy and leave the
/// original untouched, so one base message can be reused across channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Message title/subject.
    pub title: String,
    /// Message body.
    pub body: String,
    /// Provider-specific enrichment, flattened by each adapter into its
    /// vendor-native supplement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// File references to attach where the channel supports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<String>>,
    /// Provider-specific hints (e.g. voice/language for voice calls).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
}

impl Notification {
    /// Create a new notification with a title and body.
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: None,
            attachments: None,
            options: None,
        }
    }

    /// Copy of this notification with `data` replaced.
    #[must_use]
    pub fn with_data(&self, data: Map<String, Value>) -> Self {
        Self {
            data: Some(data),
            ..self.clone()
        }
    }

    /// Copy of this notification with `attachments` replaced.
    #[must_use]
    pub fn with_attachments(&self, attachments: Vec<String>) -> Self {
        Self {
            attachments: Some(attachments),
            ..self.clone()
        }
    }

    /// Copy of this notification with `options` replaced.
    #[must_use]
    pub fn with_options(&self, options: Map<String, Value>) -> Self {
        Self {
            options: Some(options),
            ..self.clone()
        }
    }

    /// Whether `data` carries at least one entry.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }
}

/// Normalized outcome of one send attempt.
///
/// Invariant: `success` implies `error` is `None`; failure implies
/// `message_id` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    /// Whether the send succeeded.
    pub success: bool,
    /// Provider-assigned message id (present iff success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Human-readable error (present iff failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Provider-returned metadata or failure context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Name of the channel that produced this response. Unset only when
    /// resolution failed before a channel could be attributed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl NotificationResponse {
    /// Create a successful response.
    #[must_use]
    pub fn success(
        message_id: impl Into<String>,
        data: Option<Value>,
        channel: Option<&str>,
    ) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
            data,
            channel: channel.map(Into::into),
        }
    }

    /// Create a failure response.
    #[must_use]
    pub fn failure(error: impl Into<String>, data: Option<Value>, channel: Option<&str>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
            data,
            channel: channel.map(Into::into),
        }
    }

    /// Whether the notification was sent successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Whether the notification failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !self.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn map(entries: &[(&str, Value)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_builder_round_trip() {
        let data = map(&[("order", json!("A-17"))]);
        let options = map(&[("voice", json!("alice"))]);
        let attachments = vec!["/tmp/report.pdf".to_string()];

        let message = Notification::new("Title", "Body")
            .with_data(data.clone())
            .with_attachments(attachments.clone())
            .with_options(options.clone());

        assert_eq!(message.title, "Title");
        assert_eq!(message.body, "Body");
        assert_eq!(message.data, Some(data));
        assert_eq!(message.attachments, Some(attachments));
        assert_eq!(message.options, Some(options));
    }

    #[test]
    fn test_builders_do_not_mutate_original() {
        let base = Notification::new("Title", "Body");
        let enriched = base.with_data(map(&[("k", json!("v"))]));

        assert!(base.data.is_none());
        assert!(enriched.data.is_some());

        let with_files = enriched.with_attachments(vec!["a.txt".to_string()]);
        assert!(enriched.attachments.is_none());
        assert!(with_files.attachments.is_some());
        // Earlier fields carry forward.
        assert!(with_files.data.is_some());
    }

    #[test]
    fn test_has_data_ignores_empty_map() {
        let base = Notification::new("T", "B");
        assert!(!base.has_data());
        assert!(!base.with_data(Map::new()).has_data());
        assert!(base.with_data(map(&[("k", json!(1))])).has_data());
    }

    #[test]
    fn test_success_response() {
        let response =
            NotificationResponse::success("id-1", Some(json!({"status": "queued"})), Some("sms"));
        assert!(response.is_success());
        assert!(!response.is_failure());
        assert_eq!(response.message_id.as_deref(), Some("id-1"));
        assert!(response.error.is_none());
        assert_eq!(response.channel.as_deref(), Some("sms"));
    }

    #[test]
    fn test_failure_response() {
        let response = NotificationResponse::failure("boom", None, Some("email"));
        assert!(response.is_failure());
        assert!(!response.is_success());
        assert!(response.message_id.is_none());
        assert_eq!(response.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_response_serialization_shape() {
        let response = NotificationResponse::success("id-9", None, Some("slack"));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["messageId"], json!("id-9"));
        assert_eq!(value.get("error"), None);
    }
}
