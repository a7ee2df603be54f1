// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Call Stack Engine (spec §4.4): per-thread stacks, the global tree,
//! parent linkage, observer fan-out, and gap/drain detection.
//!
//! Push/pop/log operations serialize through a single mutex (§5 (ii)); the
//! depth check runs against a `thread_local!` counter first, before the
//! lock is taken, so a runaway recursive caller fails fast without ever
//! contending the lock (§4.4: "increment a per-thread depth counter
//! first").

use std::cell::Cell;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use callwatch_core::{CallerThreadId, LifecycleEvent, Record};

use crate::controller::MonitoringController;
use crate::reporter::Observer;

/// Maximum call depth on a single thread before a push is a fatal
/// programming error (spec §3's Call Stack invariant (d)).
pub const MAX_STACK_DEPTH: u32 = 1000;

thread_local! {
    static DEPTH: Cell<u32> = const { Cell::new(0) };
}

struct StackState {
    thread_stacks: HashMap<CallerThreadId, Vec<Record>>,
    thread_roots: HashMap<CallerThreadId, Record>,
    global_stack: Vec<Record>,
    root_parent: Option<Record>,
    root_thread: Option<CallerThreadId>,
}

impl StackState {
    fn new() -> Self {
        Self {
            thread_stacks: HashMap::new(),
            thread_roots: HashMap::new(),
            global_stack: Vec::new(),
            root_parent: None,
            root_thread: None,
        }
    }

    fn is_drained(&self) -> bool {
        self.thread_stacks.values().all(|s| s.is_empty())
    }
}

/// Per-thread call stacks, the process-wide tree root, and the observer
/// fan-out that every lifecycle event is published through.
pub struct CallStackEngine {
    state: Mutex<StackState>,
    observers: Mutex<HashMap<u64, Arc<dyn Observer>>>,
    next_observer_id: AtomicU64,
    controller: MonitoringController,
}

/// Scoped releaser returned by [`CallStackEngine::subscribe`]. Dropping it
/// removes the observer from the fan-out set.
pub struct ObserverHandle {
    engine: Arc<CallStackEngine>,
    id: u64,
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.engine.observers.lock().remove(&self.id);
    }
}

impl CallStackEngine {
    pub fn new(controller: MonitoringController) -> Self {
        Self {
            state: Mutex::new(StackState::new()),
            observers: Mutex::new(HashMap::new()),
            next_observer_id: AtomicU64::new(0),
            controller,
        }
    }

    /// Registers an observer in the fan-out set (spec §5 (iv): "the
    /// observer registry is a concurrent map").
    pub fn subscribe(self: &Arc<Self>, observer: Arc<dyn Observer>) -> ObserverHandle {
        let id = self.next_observer_id.fetch_add(1, Ordering::Relaxed);
        self.observers.lock().insert(id, observer);
        ObserverHandle {
            engine: Arc::clone(self),
            id,
        }
    }

    /// Pushes `record` onto the calling thread's stack and the global
    /// stack, wiring up parent linkage per the spec's exact algorithm.
    /// Panics (a documented fatal programming error) past depth 1000.
    pub fn push(&self, record: Record) {
        let depth = DEPTH.with(|d| {
            let next = d.get() + 1;
            d.set(next);
            next
        });
        if depth >= MAX_STACK_DEPTH {
            panic!("call stack depth exceeded {MAX_STACK_DEPTH} on thread {:?}", record.thread_id());
        }

        let mut state = self.state.lock();
        let thread = record.thread_id();

        match &state.root_parent {
            None => {
                record.attach_to_parent(None);
                state.root_parent = Some(Arc::clone(&record));
                state.root_thread = Some(thread);
            }
            Some(root) => {
                let root = Arc::clone(root);
                let thread_stack_empty = state.thread_stacks.get(&thread).map_or(true, |s| s.is_empty());
                let is_root_thread = state.root_thread == Some(thread);
                let parent = if thread_stack_empty || !is_root_thread {
                    root
                } else {
                    Arc::clone(state.thread_stacks.get(&thread).and_then(|s| s.last()).expect("checked non-empty above"))
                };
                record.attach_to_parent(Some(&parent));
            }
        }

        let thread_stack = state.thread_stacks.entry(thread).or_default();
        if thread_stack.is_empty() {
            state.thread_roots.insert(thread, Arc::clone(&record));
        }
        thread_stack.push(Arc::clone(&record));
        state.global_stack.push(record);
    }

    /// Pops `record` from the calling thread's stack (spec §4.4). A
    /// mismatch with the thread stack's top is logged, not thrown; the
    /// global stack and `root_parent` are only cleared when `record`
    /// actually was their top/root.
    pub fn pop(&self, record: &Record) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));

        let mut state = self.state.lock();
        let thread = record.thread_id();

        if let Some(stack) = state.thread_stacks.get_mut(&thread) {
            match stack.pop() {
                Some(popped) if Arc::ptr_eq(&popped, record) => {}
                Some(_mismatched) => {
                    tracing::warn!(thread_id = thread.0, "call stack pop mismatch on thread, discarding stale top");
                }
                None => {
                    tracing::warn!(thread_id = thread.0, "pop called with an empty thread stack");
                }
            }
            if stack.is_empty() {
                state.thread_stacks.remove(&thread);
                state.thread_roots.remove(&thread);
            }
        }

        if matches!(state.global_stack.last(), Some(top) if Arc::ptr_eq(top, record)) {
            state.global_stack.pop();
        }

        if matches!(&state.root_parent, Some(root) if Arc::ptr_eq(root, record)) {
            state.root_parent = None;
            state.root_thread = None;
        }

        let drained = state.is_drained();
        drop(state);

        if drained {
            self.publish(&LifecycleEvent::Empty {
                version: self.controller.current_version(),
            });
        }
    }

    /// Publishes `event` to every subscribed observer. A panicking
    /// observer is logged and skipped; it never prevents delivery to the
    /// rest (spec §4.4: "exceptions in one observer must not prevent
    /// delivery to others").
    pub fn publish(&self, event: &LifecycleEvent) {
        let observers: Vec<_> = self.observers.lock().values().cloned().collect();
        for observer in observers {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_next(event)));
            if outcome.is_err() {
                tracing::error!("observer panicked while handling a lifecycle event; continuing fan-out");
            }
        }
    }

    pub fn root_parent(&self) -> Option<Record> {
        self.state.lock().root_parent.clone()
    }

    pub fn thread_stack_depth(&self, thread: CallerThreadId) -> usize {
        self.state.lock().thread_stacks.get(&thread).map_or(0, Vec::len)
    }

    pub fn is_drained(&self) -> bool {
        self.state.lock().is_drained()
    }
}

#[cfg(test)]
#[path = "stack_tests.rs"]
mod tests;
