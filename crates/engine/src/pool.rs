// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Method Call Info Pool: rent/return pooled lifecycle records, with a
//! shared null-object record for when monitoring is disabled (spec §4.3).
//!
//! §4.3's refcount contract ("a non-null rental has refcount 1; `use()`
//! increments it and returns a scoped releaser; `return_to_pool()` runs
//! when refcount reaches zero") is rendered directly on top of `Arc`'s own
//! strong count rather than a second, parallel counter: [`Record`] *is*
//! `Arc<MethodCallInfo>`, so `rent()` hands out the one strong reference a
//! fresh rental owns, [`MethodCallInfoPool::use_handle`] is the `use()`
//! call (it clones the `Arc` and returns a [`RecordHandle`] that drops
//! that clone on scope exit), and `return_to_pool` only recycles a record
//! once `Arc::strong_count` has fallen back to 1 — i.e. the caller
//! returning it holds the only reference left.

use std::sync::Arc;

use parking_lot::Mutex;

use callwatch_core::{MethodCallIdGen, MethodCallInfo, MethodCallInfoParams, Record};

/// Rent/return pool for [`Record`]s. The free-list is a mutex-guarded
/// `Vec` (§5 (iii) permits either a lock-free or mutex-guarded free-list;
/// a plain `Mutex<Vec<_>>` matches this crate's existing
/// `parking_lot`-everywhere idiom and the free-list is never on a hot
/// cross-thread contention path — only rent/return are).
pub struct MethodCallInfoPool {
    id_gen: MethodCallIdGen,
    free_list: Mutex<Vec<Record>>,
    high_water_mark: std::sync::atomic::AtomicUsize,
    live_count: std::sync::atomic::AtomicUsize,
}

impl Default for MethodCallInfoPool {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodCallInfoPool {
    pub fn new() -> Self {
        Self {
            id_gen: MethodCallIdGen::new(),
            free_list: Mutex::new(Vec::new()),
            high_water_mark: std::sync::atomic::AtomicUsize::new(0),
            live_count: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// The shared null record; always returns the same instance and never
    /// touches the free-list.
    pub fn null_record(&self) -> Record {
        MethodCallInfo::null()
    }

    /// Rents a fresh record, reusing a freed one when available. Never
    /// fails: the pool grows unboundedly rather than blocking callers
    /// (§4.7: "pool exhaustion is impossible").
    pub fn rent(&self, params: MethodCallInfoParams) -> Record {
        use std::sync::atomic::Ordering;

        let id = self.id_gen.next();
        let record = match self.free_list.lock().pop() {
            Some(reused) => {
                reused.rehydrate(id, params, std::time::SystemTime::now());
                reused
            }
            None => Arc::new(MethodCallInfo::new(id, params, std::time::SystemTime::now())),
        };

        let live = self.live_count.fetch_add(1, Ordering::AcqRel) + 1;
        self.high_water_mark.fetch_max(live, Ordering::AcqRel);
        record
    }

    /// Returns a record to the free-list once its refcount has reached
    /// zero (§4.3). A record still held elsewhere — most commonly through
    /// an outstanding [`RecordHandle`] from [`Self::use_handle`] — is left
    /// alone entirely: it is neither reset nor counted as freed here, and
    /// the last holder's own drop (via `RecordHandle`'s `Drop` impl, which
    /// calls back into this same method) is what actually recycles it.
    /// Clears all mutable fields before enqueuing so the next rental
    /// starts blank.
    pub fn return_to_pool(&self, record: Record) {
        use std::sync::atomic::Ordering;

        if record.is_null() {
            return;
        }
        if Arc::strong_count(&record) > 1 {
            return;
        }
        self.live_count.fetch_sub(1, Ordering::AcqRel);
        record.reset_for_reuse();
        self.free_list.lock().push(record);
    }

    /// `use()` (§4.3): extends a record's lifetime past the scope that
    /// would otherwise return it, by cloning the `Arc` and handing back a
    /// [`RecordHandle`] that releases that clone on drop. Safe to call
    /// concurrently with the call-stack's own pop/return; whichever of the
    /// two drops last is the one that actually triggers recycling.
    pub fn use_handle(self: &Arc<Self>, record: &Record) -> RecordHandle {
        RecordHandle {
            pool: Arc::clone(self),
            record: Some(Arc::clone(record)),
        }
    }

    /// (P1) the number of rented-and-not-yet-returned records.
    pub fn live_count(&self) -> usize {
        self.live_count.load(std::sync::atomic::Ordering::Acquire)
    }

    /// (P1) the largest `live_count` ever observed.
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark.load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn free_list_len(&self) -> usize {
        self.free_list.lock().len()
    }
}

/// Scoped releaser returned by [`MethodCallInfoPool::use_handle`] — the
/// Rust rendering of §4.3's `use()` (increment) / releaser (decrement on
/// drop) pair. Holding one keeps the underlying record's `Arc::strong_count`
/// above 1, so `return_to_pool` defers recycling until every handle (and
/// the call context itself) has gone away.
pub struct RecordHandle {
    pool: Arc<MethodCallInfoPool>,
    record: Option<Record>,
}

impl RecordHandle {
    /// The record this handle is keeping alive.
    pub fn record(&self) -> &Record {
        self.record.as_ref().expect("RecordHandle's record is only taken in Drop")
    }
}

impl Drop for RecordHandle {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            self.pool.return_to_pool(record);
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
