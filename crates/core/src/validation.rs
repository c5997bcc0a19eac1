//! Input validation utilities.
//!
//! This module checks clinic-supplied payloads and startup configuration before they reach the
//! order store or get embedded into URLs.

use crate::order::{NewOrder, Patient};
use crate::{OrderError, OrderResult};
use allergo_types::{Iin, NonEmptyText};

/// A creation payload that passed validation.
#[derive(Clone, Debug)]
pub struct ValidatedOrder {
    pub clinic_name: NonEmptyText,
    pub doctor_name: NonEmptyText,
    pub tariff: NonEmptyText,
    pub allergens: Vec<String>,
    pub patient: Patient,
}

/// Validates an order-creation payload.
///
/// Rules:
/// - patient IIN is exactly 12 characters (kept verbatim, leading zeros included)
/// - patient full name, clinic, doctor and tariff are not blank
/// - the allergen list is not empty and no allergen name is blank
///
/// Allergen order is preserved and duplicates are kept.
///
/// # Errors
///
/// Returns [`OrderError::Validation`] naming the first offending field.
pub fn validate_new_order(payload: NewOrder) -> OrderResult<ValidatedOrder> {
    let field = |name: &str, value: &str| {
        NonEmptyText::new(value)
            .map_err(|_| OrderError::Validation(format!("{name} cannot be empty")))
    };

    let iin = Iin::parse(&payload.patient.iin)
        .map_err(|e| OrderError::Validation(format!("patient.iin: {e}")))?;
    let full_name = field("patient.full_name", &payload.patient.full_name)?;
    let clinic_name = field("clinic_name", &payload.clinic_name)?;
    let doctor_name = field("doctor_name", &payload.doctor_name)?;
    let tariff = field("tariff", &payload.tariff)?;

    if payload.allergens.is_empty() {
        return Err(OrderError::Validation(
            "allergens must contain at least one entry".into(),
        ));
    }
    if payload.allergens.iter().any(|a| a.trim().is_empty()) {
        return Err(OrderError::Validation(
            "allergen names cannot be empty".into(),
        ));
    }

    Ok(ValidatedOrder {
        clinic_name,
        doctor_name,
        tariff,
        allergens: payload.allergens,
        patient: Patient {
            iin,
            full_name,
            phone_whatsapp: payload.patient.phone_whatsapp,
            date_of_birth: payload.patient.date_of_birth,
            telegram_chat_id: payload.patient.telegram_chat_id,
        },
    })
}

/// Validates that a bot username is safe for embedding in a deep-link URL path.
///
/// Telegram usernames are ASCII letters, digits and underscores; anything else would need
/// escaping in `https://t.me/<username>`.
///
/// # Errors
///
/// Returns [`OrderError::InvalidConfig`] if the username is empty, too long or contains other
/// characters.
pub fn validate_bot_username_safe_for_url(username: &str) -> OrderResult<()> {
    const MAX_USERNAME_LEN: usize = 64;

    if username.trim().is_empty() {
        return Err(OrderError::InvalidConfig(
            "bot username cannot be empty".into(),
        ));
    }

    if username.len() > MAX_USERNAME_LEN {
        return Err(OrderError::InvalidConfig(format!(
            "bot username exceeds maximum length of {} characters",
            MAX_USERNAME_LEN
        )));
    }

    let ok = username
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'_'));

    if !ok {
        return Err(OrderError::InvalidConfig(
            "bot username contains invalid characters (only alphanumeric and '_' allowed)".into(),
        ));
    }

    Ok(())
}

/// Validates an absolute `http://` or `https://` base URL and strips trailing slashes.
///
/// # Errors
///
/// Returns [`OrderError::InvalidConfig`] if the scheme is missing or the host part is empty.
pub fn normalise_base_url(name: &str, url: &str) -> OrderResult<String> {
    let url = url.trim().trim_end_matches('/');
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));

    match rest {
        Some(host) if !host.is_empty() && !host.contains(char::is_whitespace) => {
            Ok(url.to_string())
        }
        _ => Err(OrderError::InvalidConfig(format!(
            "{name} must be an absolute http(s) URL, got '{url}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::NewPatient;
    use chrono::NaiveDate;

    fn payload() -> NewOrder {
        NewOrder {
            clinic_name: "DentLux".into(),
            doctor_name: "Ivanov I.I.".into(),
            tariff: "Extended".into(),
            allergens: vec!["Lidocaine".into(), "Articaine".into(), "Lidocaine".into()],
            patient: NewPatient {
                iin: "000101300001".into(),
                full_name: "Ivanov Ivan Ivanovich".into(),
                phone_whatsapp: "+7 701 111 11 11".into(),
                date_of_birth: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
                telegram_chat_id: None,
            },
        }
    }

    #[test]
    fn accepts_valid_payload_and_keeps_allergen_order() {
        let validated = validate_new_order(payload()).expect("payload should validate");
        assert_eq!(validated.patient.iin.as_str(), "000101300001");
        assert_eq!(
            validated.allergens,
            vec!["Lidocaine", "Articaine", "Lidocaine"]
        );
    }

    #[test]
    fn rejects_short_iin() {
        let mut p = payload();
        p.patient.iin = "12345".into();
        let err = validate_new_order(p).expect_err("short IIN must fail");
        match err {
            OrderError::Validation(msg) => assert!(msg.contains("patient.iin")),
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_allergen_list() {
        let mut p = payload();
        p.allergens.clear();
        assert!(matches!(
            validate_new_order(p),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn rejects_blank_allergen_name() {
        let mut p = payload();
        p.allergens.push("  ".into());
        assert!(matches!(
            validate_new_order(p),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn rejects_blank_clinic() {
        let mut p = payload();
        p.clinic_name = " ".into();
        let err = validate_new_order(p).expect_err("blank clinic must fail");
        assert!(err.to_string().contains("clinic_name"));
    }

    #[test]
    fn bot_username_rules() {
        assert!(validate_bot_username_safe_for_url("allergoproba_bot").is_ok());
        assert!(validate_bot_username_safe_for_url("").is_err());
        assert!(validate_bot_username_safe_for_url("bad/name").is_err());
        assert!(validate_bot_username_safe_for_url("name?text=1").is_err());
        assert!(validate_bot_username_safe_for_url(&"a".repeat(65)).is_err());
    }

    #[test]
    fn base_url_is_normalised() {
        assert_eq!(
            normalise_base_url("PUBLIC_BASE_URL", "http://127.0.0.1:8001/").unwrap(),
            "http://127.0.0.1:8001"
        );
        assert!(normalise_base_url("PUBLIC_BASE_URL", "127.0.0.1:8001").is_err());
        assert!(normalise_base_url("PUBLIC_BASE_URL", "https://").is_err());
    }
}
