//! Recipient-syntax validation.
//!
//! Pure predicates over recipient strings, one per addressing grammar.
//! No I/O: these check shape, not deliverability.

use regex::Regex;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex")
});

static E164: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("E.164 regex"));

static WHATSAPP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^whatsapp:\+[1-9]\d{1,14}$").expect("whatsapp regex"));

static SLACK_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("slack token regex"));

static TELEGRAM_USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@[a-zA-Z0-9_]{5,}$").expect("telegram username regex"));

static CHAT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("chat id regex"));

static NUMERIC_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("numeric id regex"));

/// RFC-shaped email address (`local@domain.tld`).
#[must_use]
pub fn is_email(recipient: &str) -> bool {
    EMAIL.is_match(recipient)
}

/// E.164 phone number (`+` then 2-15 digits, no leading zero).
#[must_use]
pub fn is_e164(recipient: &str) -> bool {
    E164.is_match(recipient)
}

/// WhatsApp address: `whatsapp:` followed by an E.164 number.
#[must_use]
pub fn is_whatsapp_address(recipient: &str) -> bool {
    WHATSAPP.is_match(recipient)
}

/// Slack recipient: `#channel`, `@user`, or a bare channel/user token.
#[must_use]
pub fn is_slack_recipient(recipient: &str) -> bool {
    recipient.starts_with('#') || recipient.starts_with('@') || SLACK_TOKEN.is_match(recipient)
}

/// Telegram recipient: `@username` (five or more word chars) or a numeric
/// chat id, which may be negative for groups.
#[must_use]
pub fn is_telegram_recipient(recipient: &str) -> bool {
    TELEGRAM_USERNAME.is_match(recipient) || CHAT_ID.is_match(recipient)
}

/// Plain numeric identifier (Discord user id, Messenger PSID).
#[must_use]
pub fn is_numeric_id(recipient: &str) -> bool {
    NUMERIC_ID.is_match(recipient)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(is_email("a@b.com"));
        assert!(is_email("first.last+tag@sub.example.org"));
        assert!(!is_email("not-an-email"));
        assert!(!is_email("a@b"));
        assert!(!is_email("a b@c.com"));
    }

    #[test]
    fn test_e164() {
        assert!(is_e164("+15551234567"));
        assert!(is_e164("+442071838750"));
        assert!(!is_e164("12345"));
        assert!(!is_e164("+0123"));
        assert!(!is_e164("+1555123456789012345"));
    }

    #[test]
    fn test_whatsapp() {
        assert!(is_whatsapp_address("whatsapp:+15551234567"));
        assert!(!is_whatsapp_address("+15551234567"));
        assert!(!is_whatsapp_address("whatsapp:15551234567"));
    }

    #[test]
    fn test_slack() {
        assert!(is_slack_recipient("#general"));
        assert!(is_slack_recipient("@jane"));
        assert!(is_slack_recipient("C024BE91L"));
        assert!(!is_slack_recipient("two words"));
    }

    #[test]
    fn test_telegram() {
        assert!(is_telegram_recipient("@ops_team"));
        assert!(is_telegram_recipient("123456789"));
        assert!(is_telegram_recipient("-100987654321"));
        assert!(!is_telegram_recipient("@abc"));
        assert!(!is_telegram_recipient("ops_team"));
    }

    #[test]
    fn test_numeric_id() {
        assert!(is_numeric_id("1234567890"));
        assert!(!is_numeric_id("-123"));
        assert!(!is_numeric_id("12a"));
    }
}
