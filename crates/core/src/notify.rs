//! Patient notifications.
//!
//! Notifications are a side channel: the order's status is the source of truth whether or not
//! the patient was reachable. The lifecycle service hands a [`NotificationIntent`] to a
//! [`Notifier`] after the store commit and moves on. Delivery is at most once, with no retry,
//! no queue and no confirmation.
//!
//! [`TelegramNotifier`] posts to the Telegram Bot API on a spawned tokio task. Any failure
//! (no token, no runtime, connect error, timeout, non-2xx status) is logged and dropped.

use crate::config::TelegramConfig;
use crate::order::{ChatId, Order};
use crate::{OrderError, OrderResult};
use serde::Serialize;
use tokio::task::JoinHandle;

/// A message waiting to be delivered to one messaging identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationIntent {
    pub chat_id: ChatId,
    pub text: String,
}

impl NotificationIntent {
    /// "New order" message pointing the patient at the referral page.
    pub fn new_order(chat_id: ChatId, order: &Order, referral_page_url: &str) -> Self {
        Self {
            chat_id,
            text: format!(
                "Здравствуйте, {}!\n\n\
                 Для вас оформлено направление на аллергопробы.\n\
                 Код заказа: <b>{}</b>\n\n\
                 Перейдите по ссылке и покажите этот экран в лаборатории:\n\
                 {}",
                order.patient.full_name,
                order.display_code(),
                referral_page_url
            ),
        }
    }

    /// "Results ready" message pointing the patient at the results page.
    pub fn results_ready(chat_id: ChatId, order: &Order, results_page_url: &str) -> Self {
        Self {
            chat_id,
            text: format!(
                "Здравствуйте, {}!\n\n\
                 Результаты ваших аллергопроб готовы.\n\
                 Код заказа: <b>{}</b>\n\n\
                 Посмотреть результаты можно по ссылке:\n\
                 {}",
                order.patient.full_name,
                order.display_code(),
                results_page_url
            ),
        }
    }
}

/// Fire-and-forget sink for notification intents.
///
/// Implementations must return promptly and must not report failures to the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, intent: NotificationIntent);
}

/// Drops every intent. Used by offline tooling such as fixture loading.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledNotifier;

impl Notifier for DisabledNotifier {
    fn notify(&self, intent: NotificationIntent) {
        tracing::debug!(chat_id = intent.chat_id, "notifications disabled; dropping message");
    }
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: ChatId,
    text: &'a str,
    parse_mode: &'static str,
}

/// How a single delivery attempt ended. Only logged in production.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The endpoint answered with this non-2xx status.
    Rejected(u16),
    /// No response within the configured timeout.
    TimedOut,
    /// Connection or protocol error.
    Failed,
}

/// Delivers intents through the Telegram Bot API `sendMessage` method.
#[derive(Clone, Debug)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl TelegramNotifier {
    /// Builds a notifier from the messaging settings.
    ///
    /// Without a bot token the notifier is a silent no-op.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::HttpClient`] if the HTTP client cannot be constructed.
    pub fn new(cfg: &TelegramConfig) -> OrderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| OrderError::HttpClient(e.to_string()))?;

        let endpoint = cfg
            .bot_token()
            .map(|token| format!("{}/bot{}/sendMessage", cfg.api_base(), token));

        Ok(Self { client, endpoint })
    }

    /// Starts one delivery attempt on the current tokio runtime.
    ///
    /// Returns `None` when nothing is sent: a zero chat id, no bot token, or no runtime. The
    /// handle resolves once the attempt finishes, which is bounded by the configured timeout.
    pub fn dispatch(&self, intent: NotificationIntent) -> Option<JoinHandle<DeliveryOutcome>> {
        // Intents reach this type from any caller, not only through Order::messaging_target,
        // and zero is never a real chat.
        if intent.chat_id == 0 {
            return None;
        }
        let Some(endpoint) = self.endpoint.clone() else {
            tracing::debug!("no bot token configured; skipping notification");
            return None;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => Some(handle.spawn(Self::deliver(self.client.clone(), endpoint, intent))),
            Err(_) => {
                tracing::warn!(
                    chat_id = intent.chat_id,
                    "no async runtime available; notification dropped"
                );
                None
            }
        }
    }

    /// Performs one delivery attempt and logs the outcome.
    async fn deliver(
        client: reqwest::Client,
        endpoint: String,
        intent: NotificationIntent,
    ) -> DeliveryOutcome {
        let body = SendMessageBody {
            chat_id: intent.chat_id,
            text: &intent.text,
            parse_mode: "HTML",
        };

        match client.post(endpoint.as_str()).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(chat_id = intent.chat_id, "notification delivered");
                DeliveryOutcome::Delivered
            }
            Ok(resp) => {
                tracing::warn!(
                    chat_id = intent.chat_id,
                    status = %resp.status(),
                    "messaging endpoint rejected notification"
                );
                DeliveryOutcome::Rejected(resp.status().as_u16())
            }
            Err(e) => {
                let timed_out = e.is_timeout();
                tracing::warn!(
                    chat_id = intent.chat_id,
                    timed_out,
                    error = %e.without_url(),
                    "failed to send notification"
                );
                if timed_out {
                    DeliveryOutcome::TimedOut
                } else {
                    DeliveryOutcome::Failed
                }
            }
        }
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, intent: NotificationIntent) {
        let _ = self.dispatch(intent);
    }
}
