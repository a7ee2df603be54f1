// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Class Monitor / Performance Monitor facade (spec §4.7): the entry
//! points instrumented code actually calls. `Engine` owns the shared
//! controller, registry, call stack, and pool; `for_class::<T>()` /
//! `for_current_class()` / `for_external_class(name)` bind a class
//! identity and hand back a [`ClassMonitor`] whose `start`/`async_start`
//! build the real construction sequence: rent a record if the engine is
//! globally enabled, initialize and start every declared reporter,
//! collect their cleanups, push onto the call stack, apply the
//! fine-grained admission rule, and return a context.
//!
//! Reflection-based method matching is out of scope (§1); every entry
//! point here is already the "external-method" shape — the caller names
//! its own method descriptor rather than the facade discovering it by
//! inspecting a type. A look-up failure degrades to the null context the
//! same way a disabled engine would, per §7's "failures degrade, they
//! never propagate into instrumented code."

use std::any::type_name;
use std::sync::Arc;

use callwatch_core::{MethodCallInfoParams, MonitoringVersion, Record};

use crate::config::{EngineConfiguration, EngineConfigurationBuilder, MethodConfiguration};
use crate::context::{AsyncMethodCallContext, MethodCallContext};
use crate::controller::{ComponentFamily, MonitoringController};
use crate::policy;
use crate::pool::MethodCallInfoPool;
use crate::registry::ComponentRegistry;
use crate::reporter::{Filter, Observer, Reporter};
use crate::stack::{CallStackEngine, ObserverHandle};

/// The shared runtime behind every [`ClassMonitor`]: one controller, one
/// registry, one call stack, one pool, process-wide.
#[derive(Clone)]
pub struct Engine {
    controller: MonitoringController,
    registry: Arc<ComponentRegistry>,
    stack: Arc<CallStackEngine>,
    pool: Arc<MethodCallInfoPool>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        let controller = MonitoringController::new();
        Self {
            stack: Arc::new(CallStackEngine::new(controller.clone())),
            controller,
            registry: Arc::new(ComponentRegistry::new()),
            pool: Arc::new(MethodCallInfoPool::new()),
        }
    }

    pub fn enable(&self) {
        self.controller.enable();
    }

    pub fn disable(&self) {
        self.controller.disable();
    }

    pub fn controller(&self) -> &MonitoringController {
        &self.controller
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// Applies an [`EngineConfigurationBuilder`], declaring every
    /// reporter/filter/output type it names to the registry and the
    /// controller's component-state tables (§4.7: "`configure(builder)`").
    pub fn configure(&self, builder: EngineConfigurationBuilder) -> EngineConfiguration {
        let config = builder.build();
        for type_id in &config.reporter_types {
            self.controller.register_component(ComponentFamily::Reporter, *type_id);
        }
        for type_id in &config.filter_types {
            self.controller.register_component(ComponentFamily::Filter, *type_id);
        }
        for type_id in &config.output_types {
            self.controller.register_component(ComponentFamily::Output, *type_id);
        }
        config
    }

    /// Binds a `ClassMonitor` to `T`'s type name (`for_class<T>()`, §4.7).
    pub fn for_class<T: 'static>(&self) -> ClassMonitor {
        self.for_external_class(type_name::<T>())
    }

    /// Binds a `ClassMonitor` to the caller's own module path, standing in
    /// for reflection-based "current class" detection that Rust has no
    /// equivalent of (`for_current_class()`, §4.7).
    #[track_caller]
    pub fn for_current_class(&self) -> ClassMonitor {
        self.for_external_class(std::panic::Location::caller().file())
    }

    /// Binds a `ClassMonitor` to an externally-named class, skipping any
    /// reflection-based lookup (§4.7's "external-method variants").
    pub fn for_external_class(&self, class_type: impl Into<String>) -> ClassMonitor {
        ClassMonitor {
            class_type: class_type.into(),
            controller: self.controller.clone(),
            registry: Arc::clone(&self.registry),
            stack: Arc::clone(&self.stack),
            pool: Arc::clone(&self.pool),
        }
    }
}

/// A class identity bound to the shared engine state (§4.7). `start`/
/// `async_start` run the full entry-point construction sequence for one
/// method call on this class.
pub struct ClassMonitor {
    class_type: String,
    controller: MonitoringController,
    registry: Arc<ComponentRegistry>,
    stack: Arc<CallStackEngine>,
    pool: Arc<MethodCallInfoPool>,
}

impl ClassMonitor {
    fn params(&self, method_descriptor: &str, config: &MethodConfiguration) -> MethodCallInfoParams {
        MethodCallInfoParams {
            class_type: self.class_type.clone(),
            method_descriptor: method_descriptor.to_string(),
            generic_args: config.generic_args.clone(),
            parameter_types: config.parameter_types.clone(),
            is_static: config.is_static,
            is_extension: config.is_extension,
            extended_type: config.extended_type.clone(),
            parameters: config.parameters.clone(),
            attribute_parameters: Default::default(),
        }
    }

    /// Synchronous entry point (§4.7 `start(config)`). Returns the null
    /// context when the engine is globally disabled at entry; otherwise
    /// rents and pushes a record regardless of finer-grained admission, so
    /// nested/sibling calls keep a correct tree, and suppresses Start/End/
    /// Exception/LogEntry only when the admission rule itself rejects the
    /// call (§8 Glossary: "at least one enabled reporter is interested ∧
    /// at least one enabled filter permits").
    pub fn start(&self, method_descriptor: &str, config: MethodConfiguration) -> MethodCallContext {
        if !self.controller.is_enabled() {
            return MethodCallContext::null();
        }

        let captured_version = self.controller.current_version();
        let record = self.pool.rent(self.params(method_descriptor, &config));
        self.stack.push(Arc::clone(&record));

        let mut handles = Vec::new();
        let mut is_admitted = false;
        for reporter in &config.reporters {
            // Initialization failure degrades silently per §7; the
            // reporter simply does not get wired up for this call.
            let _ = block_on_current_thread(reporter.initialize(&config, &record));
            record.add_associated_reporter(format!("{:p}", Arc::as_ptr(reporter)));

            if policy::should_track(&self.controller, &self.registry, captured_version, Some(reporter.reporter_type_id()), None, &[]) {
                handles.push(self.stack.subscribe(Arc::clone(reporter) as Arc<dyn Observer>));
                if reporter_admits(&self.controller, &self.registry, captured_version, reporter, &config.filters, &record) {
                    is_admitted = true;
                }
            }
        }

        let ctx = MethodCallContext::tracking(record, Arc::clone(&self.stack), Arc::clone(&self.pool), captured_version, is_admitted);
        ctx.add_disposable(move || drop(handles));
        ctx
    }

    /// Asynchronous entry point (§4.7 `async_start(config)`).
    pub async fn async_start(&self, method_descriptor: &str, config: MethodConfiguration) -> AsyncMethodCallContext {
        if !self.controller.is_enabled() {
            return AsyncMethodCallContext::null();
        }

        let captured_version = self.controller.current_version();
        let record = self.pool.rent(self.params(method_descriptor, &config));
        self.stack.push(Arc::clone(&record));

        let mut handles = Vec::new();
        let mut is_admitted = false;
        for reporter in &config.reporters {
            let _ = reporter.initialize(&config, &record).await;
            record.add_associated_reporter(format!("{:p}", Arc::as_ptr(reporter)));

            if policy::should_track(&self.controller, &self.registry, captured_version, Some(reporter.reporter_type_id()), None, &[]) {
                handles.push(self.stack.subscribe(Arc::clone(reporter) as Arc<dyn Observer>));
                if reporter_admits(&self.controller, &self.registry, captured_version, reporter, &config.filters, &record) {
                    is_admitted = true;
                }
            }
        }

        let ctx = AsyncMethodCallContext::tracking(record, Arc::clone(&self.stack), Arc::clone(&self.pool), captured_version, is_admitted);
        if let AsyncMethodCallContext::Tracking(tracking) = &ctx {
            tracking.add_disposable(Box::new(UnsubscribeOnDispose(handles)));
        }
        ctx
    }
}

/// Unsubscribes every reporter this call wired up, run as the last async
/// cleanup so reporters stop receiving events only after everything else
/// attached to the context has had a chance to run.
struct UnsubscribeOnDispose(Vec<ObserverHandle>);

#[async_trait::async_trait]
impl crate::context::AsyncDisposable for UnsubscribeOnDispose {
    async fn dispose(self: Box<Self>) -> Result<(), crate::error::EngineError> {
        Ok(())
    }
}

/// Whether one already-interested reporter admits this call (§4.5, §8
/// scenario 6: "at least one enabled filter permits"). No attached filters
/// always admits. Otherwise each filter is gated two ways, in priority
/// order:
///
/// - if a reporter↔filter relationship was ever explicitly declared (type-
///   or instance-level, in `registry`), that declaration decides, via the
///   strict policy-evaluator path (§4.5's "absent means not permitted");
/// - otherwise the filter's own component state decides, defaulting to
///   "enabled" when no filter type has ever been declared at all (spec.md:88).
///
/// A filter that is enabled by either path still has to actually accept
/// the record through `should_include`.
fn reporter_admits(
    controller: &MonitoringController,
    registry: &ComponentRegistry,
    captured_version: MonitoringVersion,
    reporter: &Arc<dyn Reporter>,
    filters: &[Arc<dyn Filter>],
    record: &Record,
) -> bool {
    if filters.is_empty() {
        return true;
    }

    let reporter_type = reporter.reporter_type_id();
    let instance_id = format!("{:p}", Arc::as_ptr(reporter));

    filters.iter().any(|filter| {
        let filter_type = filter.filter_type_id();
        let has_instance_relationship = registry.has_instance_relationship(&instance_id, filter_type);
        let has_type_relationship = registry.has_type_relationship(reporter_type, filter_type);

        // `should_track` only consults the instance-level table when it is
        // handed at least one instance id, so an empty slice here is what
        // lets an explicit type-level-only relationship actually be read,
        // instead of being shadowed by an always-present instance id that
        // was never declared.
        let enabled = if has_instance_relationship {
            policy::should_track(controller, registry, captured_version, Some(reporter_type), Some(filter_type), std::slice::from_ref(&instance_id))
        } else if has_type_relationship {
            policy::should_track(controller, registry, captured_version, Some(reporter_type), Some(filter_type), &[])
        } else {
            controller.get_component_state(ComponentFamily::Filter, filter_type)
        };

        enabled && filter.should_include(record)
    })
}

/// Blocks on a reporter's async `initialize` from the synchronous `start`
/// entry point by spinning up a throwaway current-thread runtime.
/// Reporters are expected to do negligible work in `initialize` (attach
/// outputs/filters), so the cost of a fresh runtime per call is
/// acceptable; callers on the hot path should prefer `async_start`. Runtime
/// construction failure degrades to a skipped initialization, consistent
/// with §7's silent-degradation contract.
fn block_on_current_thread<F: std::future::Future>(future: F) -> Option<F::Output> {
    match tokio::runtime::Builder::new_current_thread().build() {
        Ok(runtime) => Some(runtime.block_on(future)),
        Err(err) => {
            tracing::error!(error = %err, "failed to build a throwaway runtime for reporter initialization");
            None
        }
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
