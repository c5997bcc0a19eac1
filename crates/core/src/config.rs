//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Request handling never reads process-wide environment variables;
//! the binaries read them once and hand the values to the `*_from_env_value` helpers below.

use crate::constants::DEFAULT_NOTIFY_TIMEOUT_SECS;
use crate::order::ChatId;
use crate::validation::{normalise_base_url, validate_bot_username_safe_for_url};
use crate::{OrderError, OrderResult};
use std::str::FromStr;
use std::time::Duration;

/// How strictly status transitions are checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Transitions are applied unconditionally, in any order and any number of times.
    ///
    /// `mark_blood_taken` after `upload_results` moves the status back to `blood_taken` and
    /// leaves the results in place.
    #[default]
    Permissive,
    /// Transitions that would move an order backwards, or re-upload results, are rejected with
    /// [`OrderError::InvalidTransition`].
    Guarded,
}

impl FromStr for TransitionPolicy {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "guarded" => Ok(Self::Guarded),
            other => Err(OrderError::InvalidConfig(format!(
                "unknown transition policy '{other}' (expected 'permissive' or 'guarded')"
            ))),
        }
    }
}

/// Messaging endpoint settings.
#[derive(Clone)]
pub struct TelegramConfig {
    bot_token: Option<String>,
    default_chat_id: Option<ChatId>,
    api_base: String,
    timeout: Duration,
}

impl TelegramConfig {
    /// Create a new `TelegramConfig`.
    ///
    /// A missing or blank `bot_token` disables delivery. `api_base` must be an absolute http(s)
    /// URL; a trailing slash is dropped.
    pub fn new(
        bot_token: Option<String>,
        default_chat_id: Option<ChatId>,
        api_base: &str,
        timeout: Duration,
    ) -> OrderResult<Self> {
        if timeout.is_zero() {
            return Err(OrderError::InvalidConfig(
                "notification timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            bot_token: bot_token
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            default_chat_id: default_chat_id.filter(|id| *id != 0),
            api_base: normalise_base_url("TELEGRAM_API_BASE", api_base)?,
            timeout,
        })
    }

    pub fn bot_token(&self) -> Option<&str> {
        self.bot_token.as_deref()
    }

    pub fn default_chat_id(&self) -> Option<ChatId> {
        self.default_chat_id
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("default_chat_id", &self.default_chat_id)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    public_base_url: String,
    bot_username: String,
    telegram: TelegramConfig,
    transition_policy: TransitionPolicy,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(
        public_base_url: &str,
        bot_username: &str,
        telegram: TelegramConfig,
        transition_policy: TransitionPolicy,
    ) -> OrderResult<Self> {
        validate_bot_username_safe_for_url(bot_username)?;

        Ok(Self {
            public_base_url: normalise_base_url("PUBLIC_BASE_URL", public_base_url)?,
            bot_username: bot_username.to_string(),
            telegram,
            transition_policy,
        })
    }

    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    pub fn bot_username(&self) -> &str {
        &self.bot_username
    }

    pub fn telegram(&self) -> &TelegramConfig {
        &self.telegram
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        self.transition_policy
    }
}

/// Parse the fallback chat id from an optional string value.
///
/// `None`, blank and `0` all mean "no fallback".
pub fn default_chat_id_from_env_value(value: Option<String>) -> OrderResult<Option<ChatId>> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let parsed = value
        .map(|v| {
            v.parse::<ChatId>().map_err(|e| {
                OrderError::InvalidConfig(format!("TELEGRAM_DEFAULT_CHAT_ID '{v}': {e}"))
            })
        })
        .transpose()?;

    Ok(parsed.filter(|id| *id != 0))
}

/// Parse the notification timeout (whole seconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default of 10 seconds.
pub fn notify_timeout_from_env_value(value: Option<String>) -> OrderResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let secs = match value {
        Some(v) => v.parse::<u64>().map_err(|e| {
            OrderError::InvalidConfig(format!("NOTIFY_TIMEOUT_SECS '{v}': {e}"))
        })?,
        None => DEFAULT_NOTIFY_TIMEOUT_SECS,
    };

    if secs == 0 {
        return Err(OrderError::InvalidConfig(
            "NOTIFY_TIMEOUT_SECS must be greater than zero".into(),
        ));
    }

    Ok(Duration::from_secs(secs))
}

/// Parse the transition policy from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`TransitionPolicy::Permissive`].
pub fn transition_policy_from_env_value(value: Option<String>) -> OrderResult<TransitionPolicy> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<TransitionPolicy>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}
