//! # Herald Core
//!
//! Core types, configuration, and secret handling for Herald.
//!
//! This crate provides:
//! - The channel-agnostic `Notification` value and its copy-builders
//! - The normalized `NotificationResponse` send outcome
//! - Configuration loading and validation (JSON5 format)
//! - Secret wrappers that redact credentials from logs
//! - Recipient-syntax validation helpers

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod secrets;
pub mod types;
pub mod validation;

pub use config::{ConfigError, HeraldConfig};
pub use secrets::{ApiKey, scrub_secrets};
pub use types::{Notification, NotificationResponse};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::config::HeraldConfig;
    pub use crate::secrets::ApiKey;
    pub use crate::types::{Notification, NotificationResponse};
}
