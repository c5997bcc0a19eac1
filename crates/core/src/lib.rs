//! # AllergoProba Core
//!
//! Core business logic for tracking allergy-panel orders from clinic to lab to patient.
//!
//! This crate contains:
//! - the order model and its status lifecycle ([`order`], [`service`])
//! - order code generation ([`code`])
//! - referral artifacts: deep link + QR image ([`referral`])
//! - best-effort patient notifications ([`notify`])
//! - order storage, in memory or as JSON files ([`store`])
//!
//! **No API concerns**: HTTP routing, request/response shapes and OpenAPI documentation belong in
//! `api-rest`.

pub mod code;
pub mod config;
pub mod constants;
pub mod error;
pub mod notify;
pub mod order;
pub mod referral;
pub mod service;
pub mod store;
pub mod validation;

pub use code::{CodeGenerator, RandomCodeGenerator, SequenceCodeGenerator};
pub use config::{CoreConfig, TelegramConfig, TransitionPolicy};
pub use error::{OrderError, OrderResult};
pub use notify::{
    DeliveryOutcome, DisabledNotifier, NotificationIntent, Notifier, TelegramNotifier,
};
pub use order::{ChatId, NewOrder, NewPatient, Order, OrderStatus, Patient, ResultsMap};
pub use referral::{ImageEncoder, QrPngEncoder, ReferralArtifact, ReferralBuilder};
pub use service::OrderService;
pub use store::{InMemoryOrderStore, JsonFileOrderStore, OrderStore};

// Re-export the validated primitives so callers need only one dependency.
pub use allergo_types::{Iin, NonEmptyText, OrderCode, TextError};

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::constants::{DEFAULT_BOT_USERNAME, DEFAULT_PUBLIC_BASE_URL, DEFAULT_TELEGRAM_API_BASE};
    use chrono::NaiveDate;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    pub fn test_cfg(policy: TransitionPolicy, default_chat_id: Option<ChatId>) -> Arc<CoreConfig> {
        let telegram = TelegramConfig::new(
            None,
            default_chat_id,
            DEFAULT_TELEGRAM_API_BASE,
            Duration::from_secs(10),
        )
        .expect("TelegramConfig::new should succeed");

        Arc::new(
            CoreConfig::new(DEFAULT_PUBLIC_BASE_URL, DEFAULT_BOT_USERNAME, telegram, policy)
                .expect("CoreConfig::new should succeed"),
        )
    }

    pub fn new_order_payload(iin: &str, allergens: &[&str], chat_id: Option<ChatId>) -> NewOrder {
        NewOrder {
            clinic_name: "DentLux".into(),
            doctor_name: "Ivanov I.I.".into(),
            tariff: "Basic".into(),
            allergens: allergens.iter().map(|a| a.to_string()).collect(),
            patient: NewPatient {
                iin: iin.into(),
                full_name: "Ivanov Ivan Ivanovich".into(),
                phone_whatsapp: "+7 701 111 11 11".into(),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).expect("valid date"),
                telegram_chat_id: chat_id,
            },
        }
    }

    pub fn sample_order(id: u64, code: &str, iin: &str) -> Order {
        Order {
            id,
            code: OrderCode::parse(code).expect("valid code"),
            status: OrderStatus::SentToTelegram,
            clinic_name: NonEmptyText::new("DentLux").expect("non-empty"),
            doctor_name: NonEmptyText::new("Ivanov I.I.").expect("non-empty"),
            tariff: NonEmptyText::new("Basic").expect("non-empty"),
            allergens: vec!["Lidocaine".into()],
            patient: Patient {
                iin: Iin::parse(iin).expect("valid iin"),
                full_name: NonEmptyText::new("Ivanov Ivan Ivanovich").expect("non-empty"),
                phone_whatsapp: "+7 701 111 11 11".into(),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).expect("valid date"),
                telegram_chat_id: None,
            },
            referral: ReferralArtifact {
                telegram_url: format!("https://t.me/allergoproba_bot?text={code}"),
                qr_data_url: "data:image/png;base64,AAAA".into(),
            },
            results: None,
        }
    }

    /// Collects intents instead of sending them.
    #[derive(Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<NotificationIntent>>,
    }

    impl RecordingNotifier {
        pub fn take(&self) -> Vec<NotificationIntent> {
            std::mem::take(&mut *self.sent.lock().expect("recording mutex poisoned"))
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, intent: NotificationIntent) {
            self.sent
                .lock()
                .expect("recording mutex poisoned")
                .push(intent);
        }
    }
}
