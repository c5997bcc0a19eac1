//! Order code generation.
//!
//! Generators only propose codes. Uniqueness is decided by the order store's compare-and-swap
//! insert; the lifecycle service draws again on collision.

use allergo_types::OrderCode;
use rand::Rng;
use std::sync::{Mutex, PoisonError};

/// Source of candidate order codes.
pub trait CodeGenerator: Send + Sync {
    /// Returns a candidate code. Never fails and makes no uniqueness promise.
    fn generate(&self) -> OrderCode;
}

/// Uniformly random codes in `10000..=99999`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> OrderCode {
        let value = rand::thread_rng().gen_range(OrderCode::MIN..=OrderCode::MAX);
        // SAFETY: gen_range stays inside the range from_number accepts
        OrderCode::from_number(value).expect("value drawn from code range")
    }
}

/// Yields a fixed list of codes in order, then keeps repeating the last one.
///
/// Used to load fixture orders with known codes and to drive collision handling in tests.
#[derive(Debug)]
pub struct SequenceCodeGenerator {
    codes: Vec<OrderCode>,
    next: Mutex<usize>,
}

impl SequenceCodeGenerator {
    /// # Panics
    ///
    /// Panics if `codes` is empty.
    pub fn new(codes: Vec<OrderCode>) -> Self {
        assert!(!codes.is_empty(), "SequenceCodeGenerator needs at least one code");
        Self {
            codes,
            next: Mutex::new(0),
        }
    }
}

impl CodeGenerator for SequenceCodeGenerator {
    fn generate(&self) -> OrderCode {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        let idx = (*next).min(self.codes.len() - 1);
        *next = next.saturating_add(1);
        self.codes[idx].clone()
    }
}
