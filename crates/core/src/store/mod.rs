//! Order storage.
//!
//! The [`OrderStore`] trait is the only mutable shared resource in the system. Implementations
//! must guarantee:
//! - [`insert_new`](OrderStore::insert_new) is a compare-and-swap: of two concurrent inserts with
//!   the same code exactly one succeeds, the other gets [`OrderError::CodeTaken`]
//! - [`update`](OrderStore::update) runs its closure as one atomic read-modify-write with respect
//!   to every other mutation of the same code
//! - [`next_id`](OrderStore::next_id) never hands out the same id twice
//!
//! Orders are never deleted.
//!
//! [`OrderError::CodeTaken`]: crate::OrderError::CodeTaken

mod file;
mod memory;

pub use file::JsonFileOrderStore;
pub use memory::InMemoryOrderStore;

use crate::order::Order;
use crate::OrderResult;
use allergo_types::OrderCode;

pub trait OrderStore: Send + Sync {
    /// Allocates the next sequential order id.
    fn next_id(&self) -> OrderResult<u64>;

    /// Inserts `order` only if its code is not already stored.
    fn insert_new(&self, order: Order) -> OrderResult<()>;

    /// Inserts or overwrites `order`.
    fn put(&self, order: Order) -> OrderResult<()>;

    /// Fetches the order stored under `code`, or [`crate::OrderError::NotFound`].
    fn get(&self, code: &OrderCode) -> OrderResult<Order>;

    /// Every stored order, in no particular order.
    fn list_all(&self) -> OrderResult<Vec<Order>>;

    /// Atomically applies `apply` to the order under `code` and returns the stored result.
    ///
    /// If `apply` fails nothing is written.
    fn update(
        &self,
        code: &OrderCode,
        apply: &mut dyn FnMut(&mut Order) -> OrderResult<()>,
    ) -> OrderResult<Order>;
}
