// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitoring Controller: global enable state, per-component-type
//! declared/effective state, version bumps, state-change notification, and
//! the operation-context chain (spec §4.2).
//!
//! Locking discipline follows §5 (i): a single readers-writer lock guards
//! mutable controller state. The spec calls for "recursion permitted on
//! the same thread" so state-changed callbacks may legally query state
//! mid-notification; `parking_lot::RwLock` has no safe same-thread
//! read-after-write upgrade, so per the resolved design note in §9, this
//! implementation fires callbacks *after* releasing the write guard,
//! against a cloned post-mutation snapshot. Callbacks therefore take a
//! fresh read lock like any other caller and must not assume they are
//! still inside the writer's critical section.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use callwatch_core::{MonitoringVersion, SystemMonotonicClock, VersionManager};

/// Declared/effective state for one component family (reporter, filter,
/// or output types), keyed by `TypeId` (spec §3's "component state
/// tables"). `effective = declared ∧ global_enabled` is maintained as an
/// invariant by every mutator, never recomputed lazily by readers, except
/// for the "nothing ever declared" default handled by `effective()` itself.
#[derive(Debug, Default, Clone)]
struct ComponentStateTable {
    declared: HashMap<TypeId, bool>,
    effective: HashMap<TypeId, bool>,
}

impl ComponentStateTable {
    fn register_if_absent(&mut self, type_id: TypeId, global_enabled: bool) {
        let declared = *self.declared.entry(type_id).or_insert(true);
        self.effective.entry(type_id).or_insert(declared && global_enabled);
    }

    fn set_declared(&mut self, type_id: TypeId, enabled: bool, global_enabled: bool) {
        self.declared.insert(type_id, enabled);
        self.effective.insert(type_id, enabled && global_enabled);
    }

    /// An absent entry defaults to `false`, *unless nothing in this family
    /// has ever been declared at all* — in which case it defaults to
    /// `global_enabled` (spec.md:88: "if no reporter types are declared,
    /// default is 'all interested'"). A family with at least one
    /// declaration is assumed to be an intentional allow-list; an
    /// untouched family has opted into nothing, so it opts out of nothing.
    fn effective(&self, type_id: TypeId, global_enabled: bool) -> bool {
        if self.declared.is_empty() {
            return global_enabled;
        }
        self.effective.get(&type_id).copied().unwrap_or(false)
    }

    fn recompute_effective(&mut self, global_enabled: bool) {
        let declared = self.declared.clone();
        for (type_id, was_declared) in declared {
            self.effective.insert(type_id, was_declared && global_enabled);
        }
    }

    fn zero_effective(&mut self) {
        for v in self.effective.values_mut() {
            *v = false;
        }
    }
}

/// Which component family a `set_component_state`/`get_component_state`
/// call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentFamily {
    Reporter,
    Filter,
    Output,
}

struct Inner {
    reporters: ComponentStateTable,
    filters: ComponentStateTable,
    outputs: ComponentStateTable,
    callbacks: Vec<Arc<dyn Fn(MonitoringVersion) + Send + Sync>>,
}

impl Inner {
    fn table_mut(&mut self, family: ComponentFamily) -> &mut ComponentStateTable {
        match family {
            ComponentFamily::Reporter => &mut self.reporters,
            ComponentFamily::Filter => &mut self.filters,
            ComponentFamily::Output => &mut self.outputs,
        }
    }

    fn table(&self, family: ComponentFamily) -> &ComponentStateTable {
        match family {
            ComponentFamily::Reporter => &self.reporters,
            ComponentFamily::Filter => &self.filters,
            ComponentFamily::Output => &self.outputs,
        }
    }
}

/// Inner state shared by a live [`OperationScope`] and the controller's
/// weak registry, so `enable`/`disable` can propagate a new version into
/// every in-flight operation (§4.2).
struct OperationContextInner {
    version: Mutex<MonitoringVersion>,
}

/// RAII handle for a nested operation scope (§3 "Operation Context", §4.2
/// `begin_operation`). Dropping it pops back to the parent; dropping the
/// outermost ("root") scope bumps the controller's version as a commit
/// signal.
pub struct OperationScope {
    handle: Arc<ControllerHandle>,
    inner: Arc<OperationContextInner>,
    is_root: bool,
}

impl OperationScope {
    /// The version captured when this scope began (or most recently
    /// updated to, if `enable`/`disable` ran while this scope was live).
    pub fn version(&self) -> MonitoringVersion {
        *self.inner.version.lock()
    }
}

impl Drop for OperationScope {
    fn drop(&mut self) {
        if self.is_root {
            *self.handle.root_operation.lock() = None;
            let version = self.handle.mint_version();
            self.handle.propagate_version_to_operations(version);
        }
    }
}

/// Shared controller state, referenced by `Arc` so `OperationScope` and
/// clones of `MonitoringController` can see the same instance.
struct ControllerHandle {
    global_enabled: AtomicBool,
    version_mgr: VersionManager<SystemMonotonicClock>,
    current_version: Mutex<MonitoringVersion>,
    state: RwLock<Inner>,
    operation_contexts: Mutex<Vec<Weak<OperationContextInner>>>,
    root_operation: Mutex<Option<Weak<OperationContextInner>>>,
}

impl ControllerHandle {
    fn mint_version(&self) -> MonitoringVersion {
        let version = self.version_mgr.next();
        *self.current_version.lock() = version;
        version
    }

    fn current_version(&self) -> MonitoringVersion {
        *self.current_version.lock()
    }

    fn propagate_version_to_operations(&self, version: MonitoringVersion) {
        let mut contexts = self.operation_contexts.lock();
        contexts.retain(|weak| {
            if let Some(ctx) = weak.upgrade() {
                *ctx.version.lock() = version;
                true
            } else {
                false
            }
        });
    }
}

/// The Monitoring Controller (spec §4.2): global enable/disable, per-type
/// component state, and the authoritative [`MonitoringVersion`].
///
/// Cheaply cloneable; every clone refers to the same underlying state.
#[derive(Clone)]
pub struct MonitoringController {
    handle: Arc<ControllerHandle>,
}

impl Default for MonitoringController {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitoringController {
    pub fn new() -> Self {
        Self {
            handle: Arc::new(ControllerHandle {
                global_enabled: AtomicBool::new(false),
                version_mgr: VersionManager::new(SystemMonotonicClock),
                current_version: Mutex::new(MonitoringVersion::ZERO),
                state: RwLock::new(Inner {
                    reporters: ComponentStateTable::default(),
                    filters: ComponentStateTable::default(),
                    outputs: ComponentStateTable::default(),
                    callbacks: Vec::new(),
                }),
                operation_contexts: Mutex::new(Vec::new()),
                root_operation: Mutex::new(None),
            }),
        }
    }

    /// Lock-free read of the global enable flag (§4.2).
    pub fn is_enabled(&self) -> bool {
        self.handle.global_enabled.load(Ordering::Acquire)
    }

    /// The version most recently minted by a mutation. Reading this never
    /// mints a new version.
    pub fn current_version(&self) -> MonitoringVersion {
        self.handle.current_version()
    }

    fn notify(&self, version: MonitoringVersion, callbacks: Vec<Arc<dyn Fn(MonitoringVersion) + Send + Sync>>) {
        self.handle.propagate_version_to_operations(version);
        for cb in callbacks {
            cb(version);
        }
    }

    pub fn enable(&self) -> MonitoringVersion {
        let (version, callbacks) = {
            let mut inner = self.handle.state.write();
            self.handle.global_enabled.store(true, Ordering::Release);
            inner.reporters.recompute_effective(true);
            inner.filters.recompute_effective(true);
            inner.outputs.recompute_effective(true);
            let version = self.handle.mint_version();
            (version, inner.callbacks.clone())
        };
        self.notify(version, callbacks);
        version
    }

    pub fn disable(&self) -> MonitoringVersion {
        let (version, callbacks) = {
            let mut inner = self.handle.state.write();
            self.handle.global_enabled.store(false, Ordering::Release);
            inner.reporters.zero_effective();
            inner.filters.zero_effective();
            inner.outputs.zero_effective();
            let version = self.handle.mint_version();
            (version, inner.callbacks.clone())
        };
        self.notify(version, callbacks);
        version
    }

    /// Registers a component type with a default declared state of
    /// `true` (enabled once registered; see DESIGN.md for the rationale).
    /// Idempotent.
    pub fn register_component(&self, family: ComponentFamily, type_id: TypeId) {
        let mut inner = self.handle.state.write();
        let global_enabled = self.is_enabled();
        inner.table_mut(family).register_if_absent(type_id, global_enabled);
    }

    /// `set_component_state(type, enabled)` (§4.2). Per the resolved
    /// (R2) policy, this call **always** bumps the version, even if
    /// `enabled` equals the current declared state.
    pub fn set_component_state(&self, family: ComponentFamily, type_id: TypeId, enabled: bool) -> MonitoringVersion {
        let (version, callbacks) = {
            let mut inner = self.handle.state.write();
            let global_enabled = self.is_enabled();
            inner.table_mut(family).set_declared(type_id, enabled, global_enabled);
            let version = self.handle.mint_version();
            (version, inner.callbacks.clone())
        };
        self.notify(version, callbacks);
        version
    }

    pub fn get_component_state(&self, family: ComponentFamily, type_id: TypeId) -> bool {
        let global_enabled = self.is_enabled();
        self.handle.state.read().table(family).effective(type_id, global_enabled)
    }

    pub fn add_state_changed_callback<F>(&self, callback: F)
    where
        F: Fn(MonitoringVersion) + Send + Sync + 'static,
    {
        self.handle.state.write().callbacks.push(Arc::new(callback));
    }

    /// Begins an operation scope (§4.2 `begin_operation`), capturing the
    /// current version under a reader lock. The first scope with no live
    /// parent becomes the root; dropping the root bumps the version as a
    /// commit signal.
    pub fn begin_operation(&self) -> OperationScope {
        let version = self.current_version();
        let inner = Arc::new(OperationContextInner {
            version: Mutex::new(version),
        });
        self.handle.operation_contexts.lock().push(Arc::downgrade(&inner));

        let mut root_slot = self.handle.root_operation.lock();
        let is_root = match root_slot.as_ref().and_then(Weak::upgrade) {
            Some(_) => false,
            None => {
                *root_slot = Some(Arc::downgrade(&inner));
                true
            }
        };
        drop(root_slot);

        OperationScope {
            handle: Arc::clone(&self.handle),
            inner,
            is_root,
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
