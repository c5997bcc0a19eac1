//! Order domain model.
//!
//! An [`Order`] is one allergy-panel request moving from the clinic, through the lab, to the
//! patient. It embeds a snapshot of the [`Patient`] taken at creation and the referral artifact
//! derived from its code; both stay fixed for the life of the order.

use crate::constants::ORDER_CODE_DISPLAY_PREFIX;
use crate::referral::ReferralArtifact;
use allergo_types::{Iin, NonEmptyText, OrderCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Allergen name → outcome label (for example `"Lidocaine" → "Negative"`).
pub type ResultsMap = BTreeMap<String, String>;

/// Opaque numeric handle of a patient's messaging (Telegram chat) identity.
pub type ChatId = i64;

/// Lifecycle position of an order.
///
/// Ordered by progression, so `a < b` means `a` comes earlier in the lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Transient state during creation; never stored.
    Created,
    /// Order created and the patient has been (best-effort) notified.
    SentToTelegram,
    /// The lab has drawn the patient's blood sample.
    BloodTaken,
    /// Results uploaded and visible to the patient.
    ResultsReady,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::SentToTelegram => "sent_to_telegram",
            OrderStatus::BloodTaken => "blood_taken",
            OrderStatus::ResultsReady => "results_ready",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Patient snapshot embedded in an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub iin: Iin,
    pub full_name: NonEmptyText,
    pub phone_whatsapp: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub telegram_chat_id: Option<ChatId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Internal sequential id, assigned by the store.
    pub id: u64,
    pub code: OrderCode,
    pub status: OrderStatus,
    pub clinic_name: NonEmptyText,
    pub doctor_name: NonEmptyText,
    pub tariff: NonEmptyText,
    /// Allergens in the order the clinic listed them. Duplicates are kept.
    pub allergens: Vec<String>,
    pub patient: Patient,
    #[serde(flatten)]
    pub referral: ReferralArtifact,
    #[serde(default)]
    pub results: Option<ResultsMap>,
}

impl Order {
    /// The code as shown to patients, e.g. `ORD-98765`.
    pub fn display_code(&self) -> String {
        format!("{ORDER_CODE_DISPLAY_PREFIX}{}", self.code)
    }

    /// Resolves where notifications for this order go.
    ///
    /// The patient's own chat id wins; otherwise `fallback` is used. Zero is treated as absent in
    /// both places.
    pub fn messaging_target(&self, fallback: Option<ChatId>) -> Option<ChatId> {
        self.patient
            .telegram_chat_id
            .filter(|id| *id != 0)
            .or(fallback.filter(|id| *id != 0))
    }
}

/// Unvalidated patient data as received from a clinic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    pub iin: String,
    pub full_name: String,
    pub phone_whatsapp: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub telegram_chat_id: Option<ChatId>,
}

/// Unvalidated order-creation payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub clinic_name: String,
    pub doctor_name: String,
    pub tariff: String,
    pub allergens: Vec<String>,
    pub patient: NewPatient,
}
