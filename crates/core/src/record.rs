// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `MethodCallInfo`: the pooled lifecycle record described in spec §3.
//!
//! A record is always handled behind an `Arc` (see [`Record`]): the call
//! stack owns the strong reference for the duration of the call, and
//! parent links are [`Weak`] (non-owning, per §5's memory discipline).
//! This crate only holds the data; the pooled refcount-gated
//! rent/use/return contract from §4.3 lives one layer up, in
//! `callwatch_engine::pool::MethodCallInfoPool` — `use_handle()` there
//! clones this `Arc` and hands back a scoped releaser, and
//! `return_to_pool` defers `reset_for_reuse` until `Arc::strong_count`
//! drops back to 1. `Arc`'s own strong count *is* the refcount the spec
//! describes; there is no second, parallel counter anywhere.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, SystemTime};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::id::{MethodCallId, MethodCallIdGen};

/// Shared handle to a pooled lifecycle record.
pub type Record = Arc<MethodCallInfo>;

/// Sentinel used for `parent_thread_id` when a record has no parent thread
/// (the process-wide root).
pub const NO_PARENT_THREAD: i64 = -1;

/// Opaque, process-unique thread identifier.
///
/// `std::thread::ThreadId` is not convertible to an integer on stable Rust,
/// but the spec's `parent_thread_id = -1` sentinel and cross-thread
/// comparisons need a plain integer. Each OS thread is assigned a
/// sequential id the first time [`CallerThreadId::current`] runs on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallerThreadId(pub i64);

impl CallerThreadId {
    pub fn current() -> Self {
        thread_local! {
            static ID: CallerThreadId = {
                static NEXT: AtomicI64 = AtomicI64::new(0);
                CallerThreadId(NEXT.fetch_add(1, Ordering::Relaxed))
            };
        }
        ID.with(|id| *id)
    }
}

impl fmt::Display for CallerThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable fields of a [`MethodCallInfo`], guarded by a single lock.
///
/// Kept private: all access goes through `MethodCallInfo`'s methods so the
/// "cleared before reuse" invariant (§4.3) has exactly one implementation.
struct Inner {
    id: MethodCallId,
    class_type: String,
    method_descriptor: String,
    generic_args: Vec<String>,
    parameter_types: Vec<String>,
    start_time: SystemTime,
    elapsed: Option<Duration>,
    thread_id: CallerThreadId,
    parent_thread_id: i64,
    level: u32,
    parent: Option<Weak<MethodCallInfo>>,
    is_static: bool,
    is_extension: bool,
    extended_type: Option<String>,
    parameters: IndexMap<String, String>,
    attribute_parameters: HashSet<String>,
    associated_reporters: Vec<String>,
}

impl Inner {
    fn empty() -> Self {
        Self {
            id: MethodCallId::new("<unrented>"),
            class_type: String::new(),
            method_descriptor: String::new(),
            generic_args: Vec::new(),
            parameter_types: Vec::new(),
            start_time: SystemTime::UNIX_EPOCH,
            elapsed: None,
            thread_id: CallerThreadId(NO_PARENT_THREAD),
            parent_thread_id: NO_PARENT_THREAD,
            level: 0,
            parent: None,
            is_static: false,
            is_extension: false,
            extended_type: None,
            parameters: IndexMap::new(),
            attribute_parameters: HashSet::new(),
            associated_reporters: Vec::new(),
        }
    }
}

/// A single method invocation's identity and timing (spec §3).
///
/// Always held behind [`Record`] (`Arc<MethodCallInfo>`). Non-null records
/// are produced by the engine's pool; [`MethodCallInfo::null`] is the
/// shared sentinel used when monitoring is disabled.
pub struct MethodCallInfo {
    is_null: bool,
    inner: Mutex<Inner>,
}

impl fmt::Debug for MethodCallInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null {
            return f.debug_struct("MethodCallInfo").field("is_null", &true).finish();
        }
        let inner = self.inner.lock();
        f.debug_struct("MethodCallInfo")
            .field("id", &inner.id)
            .field("class_type", &inner.class_type)
            .field("method_descriptor", &inner.method_descriptor)
            .field("level", &inner.level)
            .field("thread_id", &inner.thread_id)
            .finish()
    }
}

/// Fields supplied at rental time (everything the pool can't synthesize).
#[derive(Debug, Clone, Default)]
pub struct MethodCallInfoParams {
    pub class_type: String,
    pub method_descriptor: String,
    pub generic_args: Vec<String>,
    pub parameter_types: Vec<String>,
    pub is_static: bool,
    pub is_extension: bool,
    pub extended_type: Option<String>,
    /// Merged parameters (config entries already override attribute ones;
    /// see spec §4.4 — merge order is the caller's responsibility).
    pub parameters: IndexMap<String, String>,
    pub attribute_parameters: HashSet<String>,
}

impl MethodCallInfo {
    /// Builds a fresh, non-null record with the given id and params, level
    /// 0 and no parent (the call stack engine fills those in on push).
    pub fn new(id: MethodCallId, params: MethodCallInfoParams, now: SystemTime) -> Self {
        let mut inner = Inner::empty();
        inner.id = id;
        inner.class_type = params.class_type;
        inner.method_descriptor = params.method_descriptor;
        inner.generic_args = params.generic_args;
        inner.parameter_types = params.parameter_types;
        inner.is_static = params.is_static;
        inner.is_extension = params.is_extension;
        inner.extended_type = params.extended_type;
        inner.parameters = params.parameters;
        inner.attribute_parameters = params.attribute_parameters;
        inner.start_time = now;
        inner.thread_id = CallerThreadId::current();

        Self {
            is_null: false,
            inner: Mutex::new(inner),
        }
    }

    /// Resets this record to a fresh, blank state in place, for reuse by
    /// the pool's free list (§4.3: "clears all mutable fields before
    /// enqueuing").
    pub fn reset_for_reuse(&self) {
        let mut inner = self.inner.lock();
        *inner = Inner::empty();
    }

    /// Re-stamps an already-allocated record with a fresh id and a new
    /// rental's fields, in place. Used by the pool when handing a
    /// free-listed record back out: every rental gets a fresh id (§4.4),
    /// including ones that reuse existing memory.
    pub fn rehydrate(&self, id: MethodCallId, params: MethodCallInfoParams, now: SystemTime) {
        let mut inner = self.inner.lock();
        inner.id = id;
        inner.class_type = params.class_type;
        inner.method_descriptor = params.method_descriptor;
        inner.generic_args = params.generic_args;
        inner.parameter_types = params.parameter_types;
        inner.is_static = params.is_static;
        inner.is_extension = params.is_extension;
        inner.extended_type = params.extended_type;
        inner.parameters = params.parameters;
        inner.attribute_parameters = params.attribute_parameters;
        inner.start_time = now;
        inner.thread_id = CallerThreadId::current();
    }

    /// The shared null-object record: `is_null() == true`, every mutation
    /// is a documented no-op, construction allocates nothing beyond the
    /// one-time static initialization.
    pub fn null() -> Record {
        static NULL: OnceLock<Record> = OnceLock::new();
        NULL.get_or_init(|| {
            let mut inner = Inner::empty();
            inner.id = MethodCallId::new("<null>");
            Arc::new(MethodCallInfo {
                is_null: true,
                inner: Mutex::new(inner),
            })
        })
        .clone()
    }

    pub fn id(&self) -> MethodCallId {
        self.inner.lock().id.clone()
    }

    pub fn is_null(&self) -> bool {
        self.is_null
    }

    pub fn class_type(&self) -> String {
        self.inner.lock().class_type.clone()
    }

    pub fn method_descriptor(&self) -> String {
        self.inner.lock().method_descriptor.clone()
    }

    pub fn level(&self) -> u32 {
        self.inner.lock().level
    }

    pub fn thread_id(&self) -> CallerThreadId {
        self.inner.lock().thread_id
    }

    pub fn parent_thread_id(&self) -> i64 {
        self.inner.lock().parent_thread_id
    }

    pub fn parent(&self) -> Option<Record> {
        self.inner.lock().parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_static(&self) -> bool {
        self.inner.lock().is_static
    }

    pub fn is_extension(&self) -> bool {
        self.inner.lock().is_extension
    }

    pub fn extended_type(&self) -> Option<String> {
        self.inner.lock().extended_type.clone()
    }

    pub fn start_time(&self) -> SystemTime {
        self.inner.lock().start_time
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.inner.lock().elapsed
    }

    pub fn set_elapsed(&self, elapsed: Duration) {
        if self.is_null {
            return;
        }
        self.inner.lock().elapsed = Some(elapsed);
    }

    pub fn generic_args(&self) -> Vec<String> {
        self.inner.lock().generic_args.clone()
    }

    pub fn parameter_types(&self) -> Vec<String> {
        self.inner.lock().parameter_types.clone()
    }

    pub fn associated_reporters(&self) -> Vec<String> {
        self.inner.lock().associated_reporters.clone()
    }

    pub fn add_associated_reporter(&self, reporter_id: impl Into<String>) {
        if self.is_null {
            return;
        }
        self.inner.lock().associated_reporters.push(reporter_id.into());
    }

    /// Sets the call stack linkage on push. `level` is `parent.level + 1`,
    /// or `1` when `parent` is `None` (the process root).
    pub fn attach_to_parent(&self, parent: Option<&Record>) {
        let mut inner = self.inner.lock();
        match parent {
            Some(p) => {
                inner.level = p.level() + 1;
                inner.parent_thread_id = p.thread_id().0;
                inner.parent = Some(Arc::downgrade(p));
            }
            None => {
                inner.level = 1;
                inner.parent_thread_id = NO_PARENT_THREAD;
                inner.parent = Some(Arc::downgrade(&MethodCallInfo::null()));
            }
        }
    }

    /// Returns the current parameter map. Insertion order is preserved so
    /// reporters produce reproducible output (§3).
    pub fn parameters(&self) -> IndexMap<String, String> {
        self.inner.lock().parameters.clone()
    }

    /// Sets a parameter; last write wins for duplicate keys. No-op on the
    /// null record (§4.6).
    pub fn set_parameter(&self, name: impl Into<String>, value: impl Into<String>) {
        if self.is_null {
            return;
        }
        self.inner.lock().parameters.insert(name.into(), value.into());
    }

    pub fn attribute_parameter_names(&self) -> HashSet<String> {
        self.inner.lock().attribute_parameters.clone()
    }
}

/// Process-wide generator shared by every [`crate::pool`]-equivalent pool
/// instance; exposed here so callers outside the engine crate (tests) can
/// mint ids without depending on the engine.
pub fn method_call_id_gen() -> &'static MethodCallIdGen {
    static GEN: OnceLock<MethodCallIdGen> = OnceLock::new();
    GEN.get_or_init(MethodCallIdGen::new)
}

/// Monotonic counter used to assert "refcount never goes negative" style
/// invariants in tests without exposing raw `Arc::strong_count` coupling in
/// production code paths.
#[allow(dead_code)]
static RECORDS_CREATED: AtomicU64 = AtomicU64::new(0);

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
