//! Request and response bodies for the REST API.
//!
//! These are the wire shapes documented in OpenAPI. They convert to and from the core types at
//! the handler boundary; validation itself happens in the core.

use allergo_core::{NewOrder, NewPatient, Order, Patient};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientReq {
    /// National identifier, exactly 12 characters.
    #[schema(example = "900101300001")]
    pub iin: String,
    pub full_name: String,
    pub phone_whatsapp: String,
    #[schema(value_type = String, format = Date, example = "1990-01-01")]
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub telegram_chat_id: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderReq {
    pub clinic_name: String,
    pub doctor_name: String,
    pub tariff: String,
    #[schema(example = json!(["Lidocaine", "Articaine"]))]
    pub allergens: Vec<String>,
    pub patient: PatientReq,
}

impl From<CreateOrderReq> for NewOrder {
    fn from(req: CreateOrderReq) -> Self {
        NewOrder {
            clinic_name: req.clinic_name,
            doctor_name: req.doctor_name,
            tariff: req.tariff,
            allergens: req.allergens,
            patient: NewPatient {
                iin: req.patient.iin,
                full_name: req.patient.full_name,
                phone_whatsapp: req.patient.phone_whatsapp,
                date_of_birth: req.patient.date_of_birth,
                telegram_chat_id: req.patient.telegram_chat_id,
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResultsReq {
    /// Allergen name → outcome label.
    #[schema(example = json!({"Lidocaine": "Negative", "Articaine": "Positive"}))]
    pub results: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub iin: String,
    pub full_name: String,
    pub phone_whatsapp: String,
    #[schema(value_type = String, format = Date)]
    pub date_of_birth: NaiveDate,
    pub telegram_chat_id: Option<i64>,
}

impl From<Patient> for PatientRes {
    fn from(p: Patient) -> Self {
        PatientRes {
            iin: p.iin.to_string(),
            full_name: p.full_name.into_inner(),
            phone_whatsapp: p.phone_whatsapp,
            date_of_birth: p.date_of_birth,
            telegram_chat_id: p.telegram_chat_id,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderRes {
    pub id: u64,
    #[schema(example = "98765")]
    pub code: String,
    /// One of `sent_to_telegram`, `blood_taken`, `results_ready`.
    #[schema(example = "sent_to_telegram")]
    pub status: String,
    pub clinic_name: String,
    pub doctor_name: String,
    pub tariff: String,
    pub allergens: Vec<String>,
    pub patient: PatientRes,
    pub telegram_url: String,
    /// `data:image/png;base64,...`
    pub qr_data_url: String,
    pub results: Option<BTreeMap<String, String>>,
}

impl From<Order> for OrderRes {
    fn from(o: Order) -> Self {
        OrderRes {
            id: o.id,
            code: o.code.to_string(),
            status: o.status.as_str().to_string(),
            clinic_name: o.clinic_name.into_inner(),
            doctor_name: o.doctor_name.into_inner(),
            tariff: o.tariff.into_inner(),
            allergens: o.allergens,
            patient: o.patient.into(),
            telegram_url: o.referral.telegram_url,
            qr_data_url: o.referral.qr_data_url,
            results: o.results,
        }
    }
}
