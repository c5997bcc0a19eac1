//! Order lifecycle service.
//!
//! This is the orchestrator for everything that happens to an order:
//!
//! ```text
//! create ──▶ sent_to_telegram ──▶ blood_taken ──▶ results_ready
//!   │                                                  │
//!   └── "new order" notification        "results ready" notification
//! ```
//!
//! Every operation commits to the [`OrderStore`] first and only then hands a notification intent
//! to the [`Notifier`]; no store lock is held while notifying, and notification outcome never
//! affects the result returned to the caller.
//!
//! ## Transition policy
//!
//! Under [`TransitionPolicy::Permissive`] (the default) transitions are applied unconditionally:
//! `mark_blood_taken` on an order that already has results moves it back to `blood_taken` and
//! keeps the results, and results can be uploaded again. [`TransitionPolicy::Guarded`] rejects
//! those moves with [`OrderError::InvalidTransition`].

use crate::code::CodeGenerator;
use crate::config::{CoreConfig, TransitionPolicy};
use crate::constants::MAX_CODE_ATTEMPTS;
use crate::notify::{NotificationIntent, Notifier};
use crate::order::{NewOrder, Order, OrderStatus, ResultsMap};
use crate::referral::ReferralBuilder;
use crate::store::OrderStore;
use crate::validation::validate_new_order;
use crate::{OrderError, OrderResult};
use allergo_types::{Iin, OrderCode};
use std::sync::Arc;

/// Order operations - no API concerns.
#[derive(Clone)]
pub struct OrderService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn OrderStore>,
    codes: Arc<dyn CodeGenerator>,
    referrals: ReferralBuilder,
    notifier: Arc<dyn Notifier>,
}

impl OrderService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        store: Arc<dyn OrderStore>,
        codes: Arc<dyn CodeGenerator>,
        referrals: ReferralBuilder,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            cfg,
            store,
            codes,
            referrals,
            notifier,
        }
    }

    /// Creates an order, stores it as `sent_to_telegram` and notifies the patient.
    ///
    /// The code is drawn from the code generator and claimed with the store's compare-and-swap
    /// insert; on a collision a new code (and a new referral artifact) is drawn, up to
    /// `MAX_CODE_ATTEMPTS` times.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [`OrderError::Validation`] if the payload is malformed,
    /// - [`OrderError::Encoding`] if the referral image cannot be built (nothing is stored),
    /// - [`OrderError::CodeSpaceExhausted`] if every drawn code was already taken,
    /// - store errors as they occur.
    pub fn create(&self, payload: NewOrder) -> OrderResult<Order> {
        let validated = validate_new_order(payload)?;
        let id = self.store.next_id()?;

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = self.codes.generate();
            let referral = self.referrals.build(&code)?;

            let order = Order {
                id,
                code,
                status: OrderStatus::SentToTelegram,
                clinic_name: validated.clinic_name.clone(),
                doctor_name: validated.doctor_name.clone(),
                tariff: validated.tariff.clone(),
                allergens: validated.allergens.clone(),
                patient: validated.patient.clone(),
                referral,
                results: None,
            };

            match self.store.insert_new(order.clone()) {
                Ok(()) => {
                    tracing::info!(
                        order_id = order.id,
                        code = %order.code,
                        clinic = %order.clinic_name,
                        allergens = order.allergens.len(),
                        "order created"
                    );
                    self.notify_new_order(&order);
                    return Ok(order);
                }
                Err(OrderError::CodeTaken(taken)) => {
                    tracing::debug!(code = %taken, attempt, "order code collision; drawing again");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::error!(attempts = MAX_CODE_ATTEMPTS, "order code space exhausted");
        Err(OrderError::CodeSpaceExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }

    /// Fetches an order by its public code.
    ///
    /// Strings that are not valid codes resolve to [`OrderError::NotFound`] like any other
    /// unknown code.
    pub fn get(&self, code: &str) -> OrderResult<Order> {
        let code = parse_lookup_code(code)?;
        self.store.get(&code)
    }

    /// Every order whose embedded patient IIN equals `iin`. Possibly empty.
    ///
    /// A malformed IIN matches nothing.
    pub fn find_by_iin(&self, iin: &str) -> OrderResult<Vec<Order>> {
        let Ok(iin) = Iin::parse(iin) else {
            return Ok(Vec::new());
        };

        let mut orders: Vec<Order> = self
            .store
            .list_all()?
            .into_iter()
            .filter(|o| o.patient.iin == iin)
            .collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    /// Order as seen from the patient's referral page.
    pub fn referral(&self, code: &str) -> OrderResult<Order> {
        self.get(code)
    }

    /// Order as seen from the patient's results page.
    pub fn results(&self, code: &str) -> OrderResult<Order> {
        self.get(code)
    }

    /// Records that the lab drew blood for the order.
    ///
    /// No notification is sent.
    ///
    /// # Errors
    ///
    /// [`OrderError::NotFound`] for unknown codes; [`OrderError::InvalidTransition`] under the
    /// guarded policy when the order is already `results_ready`.
    pub fn mark_blood_taken(&self, code: &str) -> OrderResult<Order> {
        let code = parse_lookup_code(code)?;
        let policy = self.cfg.transition_policy();

        let order = self.store.update(&code, &mut |order: &mut Order| {
            check_transition(policy, order.status, OrderStatus::BloodTaken)?;
            order.status = OrderStatus::BloodTaken;
            Ok(())
        })?;

        tracing::info!(code = %order.code, "blood taken");
        Ok(order)
    }

    /// Stores lab results, moves the order to `results_ready` and notifies the patient.
    ///
    /// # Errors
    ///
    /// [`OrderError::NotFound`] for unknown codes; [`OrderError::InvalidTransition`] under the
    /// guarded policy when results were already uploaded.
    pub fn upload_results(&self, code: &str, results: ResultsMap) -> OrderResult<Order> {
        let code = parse_lookup_code(code)?;
        let policy = self.cfg.transition_policy();

        let order = self.store.update(&code, &mut |order: &mut Order| {
            check_transition(policy, order.status, OrderStatus::ResultsReady)?;
            order.results = Some(results.clone());
            order.status = OrderStatus::ResultsReady;
            Ok(())
        })?;

        tracing::info!(code = %order.code, results = results.len(), "results uploaded");
        self.notify_results_ready(&order);
        Ok(order)
    }

    fn notify_new_order(&self, order: &Order) {
        let Some(chat_id) = order.messaging_target(self.cfg.telegram().default_chat_id()) else {
            tracing::debug!(code = %order.code, "no messaging identity; skipping new-order notification");
            return;
        };
        let referral_page = format!(
            "{}/patient_referral.html?code={}",
            self.cfg.public_base_url(),
            order.code
        );
        self.notifier
            .notify(NotificationIntent::new_order(chat_id, order, &referral_page));
    }

    fn notify_results_ready(&self, order: &Order) {
        let Some(chat_id) = order.messaging_target(self.cfg.telegram().default_chat_id()) else {
            tracing::debug!(code = %order.code, "no messaging identity; skipping results notification");
            return;
        };
        let results_page = format!(
            "{}/patient/{}/results",
            self.cfg.public_base_url(),
            order.code
        );
        self.notifier
            .notify(NotificationIntent::results_ready(chat_id, order, &results_page));
    }
}

fn parse_lookup_code(code: &str) -> OrderResult<OrderCode> {
    OrderCode::parse(code).map_err(|_| OrderError::NotFound(code.to_string()))
}

fn check_transition(
    policy: TransitionPolicy,
    from: OrderStatus,
    to: OrderStatus,
) -> OrderResult<()> {
    if policy == TransitionPolicy::Permissive {
        return Ok(());
    }

    let allowed = match to {
        OrderStatus::BloodTaken | OrderStatus::ResultsReady => {
            matches!(from, OrderStatus::SentToTelegram | OrderStatus::BloodTaken)
        }
        OrderStatus::Created | OrderStatus::SentToTelegram => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(OrderError::InvalidTransition { from, to })
    }
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("cfg", &self.cfg)
            .field("referrals", &self.referrals)
            .finish_non_exhaustive()
    }
}
