use super::OrderStore;
use crate::order::Order;
use crate::{OrderError, OrderResult};
use allergo_types::OrderCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Process-local store. Uniqueness and ids only hold for the lifetime of the process.
#[derive(Debug)]
pub struct InMemoryOrderStore {
    orders: Mutex<HashMap<OrderCode, Order>>,
    next_id: AtomicU64,
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn orders(&self) -> MutexGuard<'_, HashMap<OrderCode, Order>> {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OrderStore for InMemoryOrderStore {
    fn next_id(&self) -> OrderResult<u64> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn insert_new(&self, order: Order) -> OrderResult<()> {
        let mut orders = self.orders();
        if orders.contains_key(&order.code) {
            return Err(OrderError::CodeTaken(order.code.to_string()));
        }
        orders.insert(order.code.clone(), order);
        Ok(())
    }

    fn put(&self, order: Order) -> OrderResult<()> {
        self.orders().insert(order.code.clone(), order);
        Ok(())
    }

    fn get(&self, code: &OrderCode) -> OrderResult<Order> {
        self.orders()
            .get(code)
            .cloned()
            .ok_or_else(|| OrderError::NotFound(code.to_string()))
    }

    fn list_all(&self) -> OrderResult<Vec<Order>> {
        Ok(self.orders().values().cloned().collect())
    }

    fn update(
        &self,
        code: &OrderCode,
        apply: &mut dyn FnMut(&mut Order) -> OrderResult<()>,
    ) -> OrderResult<Order> {
        let mut orders = self.orders();
        let stored = orders
            .get_mut(code)
            .ok_or_else(|| OrderError::NotFound(code.to_string()))?;

        let mut updated = stored.clone();
        apply(&mut updated)?;
        *stored = updated.clone();
        Ok(updated)
    }
}
