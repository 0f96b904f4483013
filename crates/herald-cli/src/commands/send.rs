//! `herald send` - dispatch a notification and report the outcome.

use std::time::Duration;

use anyhow::{Context, bail};
use serde_json::{Map, Value};

use herald_channels::Dispatcher;
use herald_core::config::HeraldConfig;
use herald_core::types::{Notification, NotificationResponse};

use crate::ui::output;

/// Run the send command. Exactly one of "many recipients" / "many
/// channels" may be in play for a single invocation.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    config: &HeraldConfig,
    channels: &[String],
    recipients: &[String],
    title: &str,
    body: &str,
    data: &[String],
    attachments: &[String],
    timeout_secs: Option<u64>,
) -> anyhow::Result<()> {
    if channels.len() > 1 && recipients.len() > 1 {
        bail!("use multiple recipients or multiple channels, not both");
    }

    let mut message = Notification::new(title, body);
    if !data.is_empty() {
        message = message.with_data(parse_data(data)?);
    }
    if !attachments.is_empty() {
        message = message.with_attachments(attachments.to_vec());
    }

    let mut dispatcher = Dispatcher::from_config(config);
    if let Some(secs) = timeout_secs {
        dispatcher = dispatcher.with_default_timeout(Duration::from_secs(secs));
    }

    let mut failures = 0usize;
    let mut total = 0usize;

    if channels.len() > 1 {
        let results = dispatcher
            .send_to_multiple_channels(&recipients[0], &message, channels)
            .await;
        for (channel, response) in &results {
            total += 1;
            failures += usize::from(report(channel, &recipients[0], response));
        }
    } else {
        let channel = &channels[0];
        let responses = dispatcher.send_to_many(recipients, &message, channel).await;
        for (recipient, response) in recipients.iter().zip(&responses) {
            total += 1;
            failures += usize::from(report(channel, recipient, response));
        }
    }

    if failures > 0 {
        bail!("{failures} of {total} sends failed");
    }
    Ok(())
}

/// Print one send outcome; returns true when it failed.
fn report(channel: &str, recipient: &str, response: &NotificationResponse) -> bool {
    if response.is_success() {
        output::success(&format!("{channel} → {recipient}"));
        if let Some(id) = &response.message_id {
            output::detail("message id", id);
        }
        false
    } else {
        output::error(&format!("{channel} → {recipient}"));
        if let Some(error) = &response.error {
            output::detail("error", error);
        }
        true
    }
}

/// Parse repeated `key=value` arguments into a data map.
fn parse_data(entries: &[String]) -> anyhow::Result<Map<String, Value>> {
    let mut map = Map::new();
    for entry in entries {
        let (key, value) = entry
            .split_once('=')
            .with_context(|| format!("data entry '{entry}' is not key=value"))?;
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(map)
}
