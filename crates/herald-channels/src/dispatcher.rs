//! The dispatch service: a name-keyed adapter registry plus the routing
//! algorithm that normalizes every outcome into a response.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use futures::future::join_all;
use serde_json::json;

use herald_core::config::HeraldConfig;
use herald_core::types::{Notification, NotificationResponse};

use crate::discord::DiscordChannel;
use crate::email::EmailChannel;
use crate::messenger::MessengerChannel;
use crate::slack::SlackChannel;
use crate::sms::SmsChannel;
use crate::teams::TeamsChannel;
use crate::telegram::TelegramChannel;
use crate::traits::Channel;
use crate::voice::VoiceChannel;
use crate::whatsapp::WhatsAppChannel;

/// Routes notifications to registered channel adapters.
///
/// The registry is read-mostly: lookups take a shared lock and the guard is
/// released before any adapter I/O, so registration stays safe while sends
/// are in flight. Iteration order over registered names is stable (sorted).
pub struct Dispatcher {
    channels: RwLock<BTreeMap<String, Arc<dyn Channel>>>,
    default_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Create an empty dispatcher with no per-call timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(BTreeMap::new()),
            default_timeout: None,
        }
    }

    /// Set a default budget applied to every adapter call made through
    /// [`send`](Self::send) and the batch operations. Expiry surfaces as a
    /// failure response, not a hang.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Build a dispatcher from configuration, registering exactly the
    /// adapters whose option group is present. The returned dispatcher is
    /// ready to use; nothing resolves lazily.
    #[must_use]
    pub fn from_config(config: &HeraldConfig) -> Self {
        let dispatcher = Self::new();

        if let Some(email) = &config.email {
            dispatcher.register_channel(Arc::new(EmailChannel::new(email.clone())));
        }
        if let Some(twilio) = &config.twilio {
            dispatcher.register_channel(Arc::new(SmsChannel::new(twilio.clone())));
            dispatcher.register_channel(Arc::new(WhatsAppChannel::new(twilio.clone())));
            dispatcher.register_channel(Arc::new(VoiceChannel::new(twilio.clone())));
        }
        if let Some(slack) = &config.slack {
            dispatcher.register_channel(Arc::new(SlackChannel::new(slack.clone())));
        }
        if let Some(discord) = &config.discord {
            dispatcher.register_channel(Arc::new(DiscordChannel::new(discord.clone())));
        }
        if let Some(teams) = &config.teams {
            dispatcher.register_channel(Arc::new(TeamsChannel::new(teams.clone())));
        }
        if let Some(telegram) = &config.telegram {
            dispatcher.register_channel(Arc::new(TelegramChannel::new(telegram.clone())));
        }
        if let Some(messenger) = &config.messenger {
            dispatcher.register_channel(Arc::new(MessengerChannel::new(messenger.clone())));
        }

        tracing::info!(
            channels = ?dispatcher.available_channels(),
            "dispatcher built from config"
        );
        dispatcher
    }

    /// Register an adapter under its self-reported name.
    ///
    /// Overwriting an existing name is allowed — last write wins. This is
    /// how a caller substitutes a custom implementation for a built-in one.
    pub fn register_channel(&self, channel: Arc<dyn Channel>) {
        let name = channel.name().to_string();
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, channel);
    }

    /// Send a notification through the named channel.
    ///
    /// All outcomes — unregistered channel, unconfigured adapter, adapter
    /// result — come back as a [`NotificationResponse`]; this method never
    /// returns an error.
    pub async fn send(
        &self,
        recipient: &str,
        message: &Notification,
        channel_name: &str,
    ) -> NotificationResponse {
        self.send_with_timeout(recipient, message, channel_name, self.default_timeout)
            .await
    }

    /// [`send`](Self::send) with an explicit per-call budget overriding the
    /// dispatcher default. `None` means wait indefinitely.
    pub async fn send_with_timeout(
        &self,
        recipient: &str,
        message: &Notification,
        channel_name: &str,
        timeout: Option<Duration>,
    ) -> NotificationResponse {
        let adapter = {
            let channels = self
                .channels
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match channels.get(channel_name) {
                Some(adapter) => Arc::clone(adapter),
                None => {
                    let available: Vec<String> = channels.keys().cloned().collect();
                    drop(channels);
                    tracing::warn!(channel = channel_name, "channel is not registered");
                    return NotificationResponse::failure(
                        format!("Channel '{channel_name}' is not registered"),
                        Some(json!({ "availableChannels": available })),
                        None,
                    );
                }
            }
        };

        if !adapter.is_configured() {
            tracing::warn!(channel = channel_name, "channel is not configured");
            return NotificationResponse::failure(
                format!("Channel '{channel_name}' is not properly configured"),
                None,
                Some(channel_name),
            );
        }

        tracing::debug!(channel = channel_name, "dispatching notification");
        match timeout {
            None => adapter.send(recipient, message).await,
            Some(budget) => {
                match tokio::time::timeout(budget, adapter.send(recipient, message)).await {
                    Ok(response) => response,
                    Err(_) => {
                        tracing::warn!(
                            channel = channel_name,
                            timeout_ms = budget.as_millis() as u64,
                            "adapter call timed out"
                        );
                        NotificationResponse::failure(
                            format!(
                                "Channel '{channel_name}' timed out after {}ms",
                                budget.as_millis()
                            ),
                            Some(json!({ "timeoutMs": budget.as_millis() as u64 })),
                            Some(channel_name),
                        )
                    }
                }
            }
        }
    }

    /// Send the same notification to many recipients on one channel.
    ///
    /// Sends run concurrently; the returned responses preserve input order,
    /// one per recipient, and individual failures never abort the batch.
    pub async fn send_to_many<S: AsRef<str> + Sync>(
        &self,
        recipients: &[S],
        message: &Notification,
        channel_name: &str,
    ) -> Vec<NotificationResponse> {
        join_all(
            recipients
                .iter()
                .map(|recipient| self.send(recipient.as_ref(), message, channel_name)),
        )
        .await
    }

    /// Send one notification to the same recipient over several channels.
    ///
    /// Returns one response per channel name. Duplicate names collapse to a
    /// single entry (last write wins, matching the registry's overwrite
    /// rule).
    pub async fn send_to_multiple_channels<S: AsRef<str> + Sync>(
        &self,
        recipient: &str,
        message: &Notification,
        channel_names: &[S],
    ) -> BTreeMap<String, NotificationResponse> {
        let responses = join_all(
            channel_names
                .iter()
                .map(|name| self.send(recipient, message, name.as_ref())),
        )
        .await;

        channel_names
            .iter()
            .map(|name| name.as_ref().to_string())
            .zip(responses)
            .collect()
    }

    /// Snapshot of all registered channel names.
    #[must_use]
    pub fn available_channels(&self) -> Vec<String> {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Registered names whose adapter currently reports itself configured.
    /// Recomputed on every call.
    #[must_use]
    pub fn configured_channels(&self) -> Vec<String> {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, channel)| channel.is_configured())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Whether a channel with this name is registered.
    #[must_use]
    pub fn has_channel(&self, name: &str) -> bool {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
