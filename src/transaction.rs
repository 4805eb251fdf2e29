// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transaction correlation: a TID allocator plus an in-flight request table.
//!
//! Shared by any client that may issue requests from more than one
//! scheduling context, so every operation that mutates the table takes the
//! same lock the TID counter lives behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::pdu::Pdu;

struct Inner {
    next_tid: u16,
    table: HashMap<u16, Arc<dyn Pdu>>,
}

/// TID allocator and in-flight transaction table.
///
/// `next_tid` post-increments starting at 0, so the first call after
/// construction (or after [`TransactionManager::reset_tid`]) returns 1, and
/// wraps `0xFFFF -> 0 -> 1`. Up to 65535 transactions may be in flight
/// simultaneously before the wraparound can collide with an unexpired one;
/// callers are responsible for keeping the table below that ceiling.
pub struct TransactionManager {
    inner: Mutex<Inner>,
}

impl TransactionManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_tid: 0,
                table: HashMap::new(),
            }),
        }
    }

    /// Post-increment the TID counter and return the new value.
    #[must_use]
    pub fn next_tid(&self) -> u16 {
        let mut inner = self.inner.lock().expect("transaction manager mutex poisoned");
        inner.next_tid = inner.next_tid.wrapping_add(1);
        inner.next_tid
    }

    /// Reset the counter so the next `next_tid()` call returns 1.
    pub fn reset_tid(&self) {
        let mut inner = self.inner.lock().expect("transaction manager mutex poisoned");
        inner.next_tid = 0;
    }

    /// Insert `pdu` under its own `transaction_id`, overwriting any existing
    /// entry silently.
    pub fn add_transaction(&self, pdu: Arc<dyn Pdu>) {
        let mut inner = self.inner.lock().expect("transaction manager mutex poisoned");
        inner.table.insert(pdu.transaction_id(), pdu);
    }

    /// Allocate a fresh TID, stamp it onto `pdu`, and store it. Returns the
    /// allocated TID.
    pub fn add_request(&self, mut pdu: Box<dyn Pdu>) -> u16 {
        let mut inner = self.inner.lock().expect("transaction manager mutex poisoned");
        inner.next_tid = inner.next_tid.wrapping_add(1);
        let tid = inner.next_tid;
        pdu.set_transaction_id(tid);
        inner.table.insert(tid, Arc::from(pdu));
        tid
    }

    /// Look up `tid` without removing it. Returns `None` (the "not found"
    /// sentinel) if absent.
    #[must_use]
    pub fn get_transaction(&self, tid: u16) -> Option<Arc<dyn Pdu>> {
        let inner = self.inner.lock().expect("transaction manager mutex poisoned");
        inner.table.get(&tid).cloned()
    }

    /// Remove `tid`; a no-op if absent.
    pub fn del_transaction(&self, tid: u16) {
        let mut inner = self.inner.lock().expect("transaction manager mutex poisoned");
        inner.table.remove(&tid);
    }

    /// Drop every in-flight transaction.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("transaction manager mutex poisoned");
        inner.table.clear();
    }

    /// Number of in-flight transactions.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("transaction manager mutex poisoned");
        inner.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::GenericPdu;

    #[test]
    fn next_tid_starts_at_one_and_increments() {
        let mgr = TransactionManager::new();
        assert_eq!(mgr.next_tid(), 1);
        assert_eq!(mgr.next_tid(), 2);
        assert_eq!(mgr.next_tid(), 3);
    }

    #[test]
    fn reset_tid_makes_next_call_return_one() {
        let mgr = TransactionManager::new();
        mgr.next_tid();
        mgr.next_tid();
        mgr.reset_tid();
        assert_eq!(mgr.next_tid(), 1);
    }

    #[test]
    fn next_tid_wraps_at_0xffff() {
        let mgr = TransactionManager::new();
        {
            let mut inner = mgr.inner.lock().unwrap();
            inner.next_tid = 0xFFFF;
        }
        assert_eq!(mgr.next_tid(), 0);
        assert_eq!(mgr.next_tid(), 1);
    }

    #[test]
    fn add_get_del_round_trip() {
        let mgr = TransactionManager::new();
        let mut pdu = GenericPdu::new(0x03);
        pdu.set_transaction_id(7);
        mgr.add_transaction(Arc::new(pdu));
        assert!(mgr.get_transaction(7).is_some());
        mgr.del_transaction(7);
        assert!(mgr.get_transaction(7).is_none());
    }

    #[test]
    fn del_transaction_on_absent_id_is_a_no_op() {
        let mgr = TransactionManager::new();
        mgr.del_transaction(42);
    }

    #[test]
    fn add_transaction_overwrites_silently() {
        let mgr = TransactionManager::new();
        let mut first = GenericPdu::new(0x03);
        first.set_transaction_id(1);
        let mut second = GenericPdu::new(0x10);
        second.set_transaction_id(1);
        mgr.add_transaction(Arc::new(first));
        mgr.add_transaction(Arc::new(second));
        assert_eq!(mgr.len(), 1);
    }
}
