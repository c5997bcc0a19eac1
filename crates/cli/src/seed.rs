//! Demo fixture: ten patients and eight orders with fixed codes.
//!
//! Orders go through the regular lifecycle operations, so they carry real referral artifacts and
//! the status each fixture names. Codes that already exist in the store are left untouched,
//! which makes seeding safe to repeat.

use allergo_core::{
    CoreConfig, DisabledNotifier, NewOrder, NewPatient, OrderCode, OrderError, OrderResult,
    OrderService, OrderStatus, OrderStore, QrPngEncoder, ReferralBuilder, ResultsMap,
    SequenceCodeGenerator,
};
use chrono::NaiveDate;
use std::sync::Arc;

struct PatientFixture {
    iin: &'static str,
    full_name: &'static str,
    phone: &'static str,
    born: (i32, u32, u32),
    chat_id: i64,
}

struct OrderFixture {
    code: &'static str,
    status: OrderStatus,
    clinic: &'static str,
    doctor: &'static str,
    tariff: &'static str,
    allergens: &'static [&'static str],
    results: &'static [(&'static str, &'static str)],
}

#[rustfmt::skip]
const PATIENTS: [PatientFixture; 10] = [
    PatientFixture { iin: "900101300001", full_name: "Ivanov Ivan Ivanovich", phone: "+7 701 111 11 11", born: (1990, 1, 1), chat_id: 100000001 },
    PatientFixture { iin: "910202300002", full_name: "Petrova Anna Sergeevna", phone: "+7 701 222 22 22", born: (1991, 2, 2), chat_id: 100000002 },
    PatientFixture { iin: "920303300003", full_name: "Sidorov Pavel Olegovich", phone: "+7 701 333 33 33", born: (1992, 3, 3), chat_id: 100000003 },
    PatientFixture { iin: "930404300004", full_name: "Kim Aigerim Erbolovna", phone: "+7 701 444 44 44", born: (1993, 4, 4), chat_id: 100000004 },
    PatientFixture { iin: "940505300005", full_name: "Zhumagulov Daniyar Nurlan", phone: "+7 701 555 55 55", born: (1994, 5, 5), chat_id: 100000005 },
    PatientFixture { iin: "950606300006", full_name: "Smirnova Olga Petrovna", phone: "+7 701 666 66 66", born: (1995, 6, 6), chat_id: 100000006 },
    PatientFixture { iin: "960707300007", full_name: "Tuleuov Marat Serikovich", phone: "+7 701 777 77 77", born: (1996, 7, 7), chat_id: 100000007 },
    PatientFixture { iin: "970808300008", full_name: "Abdullina Madina Rustemovna", phone: "+7 701 888 88 88", born: (1997, 8, 8), chat_id: 100000008 },
    PatientFixture { iin: "980909300009", full_name: "Kuznetsov Alexey Viktorovich", phone: "+7 701 999 99 99", born: (1998, 9, 9), chat_id: 100000009 },
    PatientFixture { iin: "990101300010", full_name: "Beketova Aida Kuanyshovna", phone: "+7 747 123 45 67", born: (1999, 1, 10), chat_id: 100000010 },
];

// The n-th order belongs to the n-th patient.
#[rustfmt::skip]
const ORDERS: [OrderFixture; 8] = [
    OrderFixture { code: "98711", status: OrderStatus::SentToTelegram, clinic: "DentLux", doctor: "Ivanov I.I.", tariff: "Basic", allergens: &["Lidocaine"], results: &[] },
    OrderFixture { code: "98712", status: OrderStatus::SentToTelegram, clinic: "DentLux", doctor: "Ivanov I.I.", tariff: "Extended", allergens: &["Lidocaine", "Articaine"], results: &[] },
    OrderFixture { code: "98713", status: OrderStatus::BloodTaken, clinic: "SmileClinic", doctor: "Petrova A.A.", tariff: "Basic", allergens: &["Articaine"], results: &[] },
    OrderFixture { code: "98714", status: OrderStatus::BloodTaken, clinic: "SmileClinic", doctor: "Petrova A.A.", tariff: "VIP", allergens: &["Lidocaine", "Mepivacaine"], results: &[] },
    OrderFixture { code: "98715", status: OrderStatus::ResultsReady, clinic: "CityDent", doctor: "Sidorov S.S.", tariff: "Basic", allergens: &["Mepivacaine"], results: &[("Mepivacaine", "Negative")] },
    OrderFixture {
        code: "98716",
        status: OrderStatus::ResultsReady,
        clinic: "CityDent",
        doctor: "Sidorov S.S.",
        tariff: "Extended",
        allergens: &["Lidocaine", "Articaine", "Mepivacaine"],
        results: &[("Lidocaine", "Negative"), ("Articaine", "Positive"), ("Mepivacaine", "Negative")],
    },
    OrderFixture { code: "98717", status: OrderStatus::SentToTelegram, clinic: "HappySmile", doctor: "Kim K.K.", tariff: "Basic", allergens: &["Articaine", "Mepivacaine"], results: &[] },
    OrderFixture { code: "98718", status: OrderStatus::BloodTaken, clinic: "HappySmile", doctor: "Kim K.K.", tariff: "Extended", allergens: &["Lidocaine"], results: &[] },
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

fn new_order(order: &OrderFixture, patient: &PatientFixture) -> OrderResult<NewOrder> {
    let (y, m, d) = patient.born;
    let date_of_birth = NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| {
        OrderError::Validation(format!("fixture birth date {y}-{m}-{d} is not a date"))
    })?;

    Ok(NewOrder {
        clinic_name: order.clinic.into(),
        doctor_name: order.doctor.into(),
        tariff: order.tariff.into(),
        allergens: order.allergens.iter().map(|a| a.to_string()).collect(),
        patient: NewPatient {
            iin: patient.iin.into(),
            full_name: patient.full_name.into(),
            phone_whatsapp: patient.phone.into(),
            date_of_birth,
            telegram_chat_id: Some(patient.chat_id),
        },
    })
}

/// Loads the demo fixture into `store`.
pub fn seed(cfg: Arc<CoreConfig>, store: Arc<dyn OrderStore>) -> OrderResult<SeedReport> {
    let mut report = SeedReport::default();
    let mut pending = Vec::new();

    for (fixture, patient) in ORDERS.iter().zip(PATIENTS.iter()) {
        let code = OrderCode::parse(fixture.code)?;
        match store.get(&code) {
            Ok(_) => {
                tracing::info!(code = fixture.code, "fixture order already present; skipping");
                report.skipped += 1;
            }
            Err(OrderError::NotFound(_)) => pending.push((code, fixture, patient)),
            Err(e) => return Err(e),
        }
    }

    if pending.is_empty() {
        return Ok(report);
    }

    let codes = pending.iter().map(|(code, _, _)| code.clone()).collect();
    let service = OrderService::new(
        cfg.clone(),
        store,
        Arc::new(SequenceCodeGenerator::new(codes)),
        ReferralBuilder::new(cfg.bot_username(), Arc::new(QrPngEncoder)),
        Arc::new(DisabledNotifier),
    );

    for (code, fixture, patient) in pending {
        let order = service.create(new_order(fixture, patient)?)?;
        if order.code != code {
            return Err(OrderError::CodeTaken(code.to_string()));
        }

        match fixture.status {
            OrderStatus::BloodTaken => {
                service.mark_blood_taken(code.as_str())?;
            }
            OrderStatus::ResultsReady => {
                let results: ResultsMap = fixture
                    .results
                    .iter()
                    .map(|(allergen, label)| (allergen.to_string(), label.to_string()))
                    .collect();
                service.upload_results(code.as_str(), results)?;
            }
            OrderStatus::Created | OrderStatus::SentToTelegram => {}
        }
        report.created += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use allergo_core::constants::{
        DEFAULT_BOT_USERNAME, DEFAULT_PUBLIC_BASE_URL, DEFAULT_TELEGRAM_API_BASE,
    };
    use allergo_core::{JsonFileOrderStore, TelegramConfig, TransitionPolicy};
    use std::time::Duration;
    use tempfile::TempDir;

    fn cfg() -> Arc<CoreConfig> {
        let telegram =
            TelegramConfig::new(None, None, DEFAULT_TELEGRAM_API_BASE, Duration::from_secs(5))
                .unwrap();
        Arc::new(
            CoreConfig::new(
                DEFAULT_PUBLIC_BASE_URL,
                DEFAULT_BOT_USERNAME,
                telegram,
                TransitionPolicy::Permissive,
            )
            .unwrap(),
        )
    }

    #[test]
    fn seeds_every_fixture_once() {
        let temp_dir = TempDir::new().unwrap();
        let store: Arc<dyn OrderStore> = Arc::new(JsonFileOrderStore::open(temp_dir.path()).unwrap());

        let first = seed(cfg(), store.clone()).unwrap();
        assert_eq!(first, SeedReport { created: 8, skipped: 0 });

        let second = seed(cfg(), store.clone()).unwrap();
        assert_eq!(second, SeedReport { created: 0, skipped: 8 });
        assert_eq!(store.list_all().unwrap().len(), 8);
    }

    #[test]
    fn fixture_statuses_and_results_are_applied() {
        let temp_dir = TempDir::new().unwrap();
        let store: Arc<dyn OrderStore> = Arc::new(JsonFileOrderStore::open(temp_dir.path()).unwrap());
        seed(cfg(), store.clone()).unwrap();

        let get = |c: &str| store.get(&OrderCode::parse(c).unwrap()).unwrap();

        assert_eq!(get("98711").status, OrderStatus::SentToTelegram);
        assert_eq!(get("98713").status, OrderStatus::BloodTaken);

        let done = get("98716");
        assert_eq!(done.status, OrderStatus::ResultsReady);
        let results = done.results.unwrap();
        assert_eq!(results.get("Articaine").map(String::as_str), Some("Positive"));
        assert_eq!(done.patient.iin.as_str(), "950606300006");
        assert!(done.referral.qr_data_url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn existing_codes_are_left_alone() {
        let temp_dir = TempDir::new().unwrap();
        let store: Arc<dyn OrderStore> = Arc::new(JsonFileOrderStore::open(temp_dir.path()).unwrap());

        let mut occupied = store.get(&OrderCode::parse("98711").unwrap());
        assert!(matches!(occupied, Err(OrderError::NotFound(_))));

        let service = OrderService::new(
            cfg(),
            store.clone(),
            Arc::new(SequenceCodeGenerator::new(vec![OrderCode::parse("98711").unwrap()])),
            ReferralBuilder::new(DEFAULT_BOT_USERNAME, Arc::new(QrPngEncoder)),
            Arc::new(DisabledNotifier),
        );
        service
            .create(new_order(&ORDERS[7], &PATIENTS[9]).unwrap())
            .unwrap();

        let report = seed(cfg(), store.clone()).unwrap();
        assert_eq!(report, SeedReport { created: 7, skipped: 1 });

        occupied = store.get(&OrderCode::parse("98711").unwrap());
        assert_eq!(occupied.unwrap().patient.iin.as_str(), "990101300010");
    }
}
