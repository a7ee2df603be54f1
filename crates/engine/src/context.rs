// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Method Call Context (spec §4.6): the scoped handle returned at method
//! entry. The synchronous variant exits on scope `Drop`; Rust has no async
//! `Drop`, so the asynchronous variant exposes an explicit
//! `async fn dispose(self)` that the caller is expected to await, with a
//! `Drop` fallback that runs best-effort synchronous cleanup (and logs a
//! warning) if the caller forgot.
//!
//! Both variants are rendered as small enums (`Tracking` | `Null`) rather
//! than a single struct with an `is_null` flag, so the shared-singleton
//! null context allocates nothing and every method is a plain match arm.

use std::cell::Cell;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;

use callwatch_core::{CapturedException, LifecycleEvent, LogEntryPayload, LogLevel, MethodCallInfo, MonitoringVersion, Record};

use crate::error::EngineError;
use crate::pool::{MethodCallInfoPool, RecordHandle};
use crate::stack::CallStackEngine;

struct ContextCore {
    record: Record,
    stack: Arc<CallStackEngine>,
    pool: Arc<MethodCallInfoPool>,
    captured_version: MonitoringVersion,
    start: Instant,
    is_admitted: bool,
    exception_emitted: Cell<bool>,
}

impl ContextCore {
    fn new(record: Record, stack: Arc<CallStackEngine>, pool: Arc<MethodCallInfoPool>, captured_version: MonitoringVersion, is_admitted: bool) -> Self {
        let core = Self {
            record,
            stack,
            pool,
            captured_version,
            start: Instant::now(),
            is_admitted,
            exception_emitted: Cell::new(false),
        };
        if core.is_admitted {
            core.stack.publish(&LifecycleEvent::Start {
                call_id: core.record.id(),
                version: core.captured_version,
                start_time: core.record.start_time(),
                class_type: core.record.class_type(),
                method_descriptor: core.record.method_descriptor(),
                level: core.record.level(),
                parameters: core.record.parameters(),
            });
        }
        core
    }

    fn set_parameter(&self, name: impl Into<String>, value: impl Into<String>) {
        if !self.is_admitted {
            return;
        }
        self.record.set_parameter(name, value);
    }

    /// `use()` (§4.3): extends the record's lifetime past this context's
    /// own exit. See [`MethodCallInfoPool::use_handle`].
    fn use_handle(&self) -> RecordHandle {
        self.pool.use_handle(&self.record)
    }

    fn log(&self, message: impl Into<String>) {
        if !self.is_admitted {
            return;
        }
        self.stack.publish(&LifecycleEvent::LogEntry {
            call_id: self.record.id(),
            version: self.captured_version,
            entry: LogEntryPayload {
                level: LogLevel::Info,
                message: message.into(),
            },
        });
    }

    /// Emits `Exception` immediately (spec §4.6: "`log_exception(e)` may be
    /// called explicitly with the same effect"). Marks the exception as
    /// already reported so `finish` does not emit a second, generic one if
    /// the thread also happens to be unwinding.
    fn log_exception<E: std::fmt::Display>(&self, type_name: &str, error: &E) {
        self.exception_emitted.set(true);
        if !self.is_admitted {
            return;
        }
        self.stack.publish(&LifecycleEvent::Exception {
            call_id: self.record.id(),
            version: self.captured_version,
            elapsed: self.start.elapsed(),
            exception: CapturedException {
                type_name: type_name.to_string(),
                message: error.to_string(),
                backtrace: String::new(),
            },
        });
    }

    /// Runs the shared exit sequence: stop the timer, emit `Exception` if
    /// the thread is unwinding and nothing was logged explicitly, emit
    /// `End`, pop from the call stack, and return the record to the pool.
    ///
    /// Takes `&mut self` so the record can be moved out (replaced with the
    /// shared null record) rather than cloned: `return_to_pool` only
    /// recycles once `Arc::strong_count` is back to 1, and `self.record`
    /// staying alive for the duration of this call would otherwise always
    /// count as a second reference, so a record would never make it back
    /// into the free list.
    fn finish(&mut self) {
        let elapsed = self.start.elapsed();
        self.record.set_elapsed(elapsed);

        if std::thread::panicking() && !self.exception_emitted.get() {
            self.exception_emitted.set(true);
            if self.is_admitted {
                self.stack.publish(&LifecycleEvent::Exception {
                    call_id: self.record.id(),
                    version: self.captured_version,
                    elapsed,
                    exception: CapturedException {
                        type_name: "panic".to_string(),
                        message: "scope exited while the thread was unwinding".to_string(),
                        backtrace: String::new(),
                    },
                });
            }
        }

        if self.is_admitted {
            self.stack.publish(&LifecycleEvent::End {
                call_id: self.record.id(),
                version: self.captured_version,
                elapsed,
            });
        }

        self.stack.pop(&self.record);
        let record = std::mem::replace(&mut self.record, MethodCallInfo::null());
        self.pool.return_to_pool(record);
    }
}

/// The real, tracking half of [`MethodCallContext`]. Exits on `Drop`.
pub struct TrackingContext {
    core: ContextCore,
    disposables: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl TrackingContext {
    fn new(record: Record, stack: Arc<CallStackEngine>, pool: Arc<MethodCallInfoPool>, captured_version: MonitoringVersion, is_admitted: bool) -> Self {
        Self {
            core: ContextCore::new(record, stack, pool, captured_version, is_admitted),
            disposables: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self) -> &Record {
        &self.core.record
    }

    /// Extends the record's lifetime past this context's own `Drop`
    /// (§4.3's `use()`). Safe to clone the record out of a context and
    /// read it later precisely because the handle keeps it out of the
    /// pool's free list until the handle itself is dropped.
    pub fn use_handle(&self) -> RecordHandle {
        self.core.use_handle()
    }

    pub fn set_parameter(&self, name: impl Into<String>, value: impl Into<String>) {
        self.core.set_parameter(name, value);
    }

    pub fn log(&self, message: impl Into<String>) {
        self.core.log(message);
    }

    pub fn log_exception<E: std::fmt::Display>(&self, error: &E) {
        self.core.log_exception(std::any::type_name::<E>(), error);
    }

    /// Registers a cleanup that runs on exit, in reverse registration
    /// order, after `Exception`/`End` have been emitted.
    pub fn add_disposable(&self, cleanup: impl FnOnce() + Send + 'static) {
        self.disposables.lock().push(Box::new(cleanup));
    }
}

impl Drop for TrackingContext {
    fn drop(&mut self) {
        self.core.finish();
        let disposables = std::mem::take(&mut *self.disposables.lock());
        for disposable in disposables.into_iter().rev() {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(disposable));
            if outcome.is_err() {
                tracing::error!("a method call context cleanup panicked; continuing with the rest");
            }
        }
    }
}

/// Scoped handle for a synchronous method call (spec §4.6). `Null` is the
/// shared, allocation-free singleton used when monitoring is disabled at
/// entry.
pub enum MethodCallContext {
    Tracking(TrackingContext),
    Null,
}

impl MethodCallContext {
    pub(crate) fn tracking(record: Record, stack: Arc<CallStackEngine>, pool: Arc<MethodCallInfoPool>, captured_version: MonitoringVersion, is_admitted: bool) -> Self {
        Self::Tracking(TrackingContext::new(record, stack, pool, captured_version, is_admitted))
    }

    pub fn null() -> Self {
        Self::Null
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn record(&self) -> Option<&Record> {
        match self {
            Self::Tracking(ctx) => Some(ctx.record()),
            Self::Null => None,
        }
    }

    /// `None` on the null context; otherwise extends the record's lifetime
    /// past this context's own `Drop` (§4.3's `use()`).
    pub fn use_handle(&self) -> Option<RecordHandle> {
        match self {
            Self::Tracking(ctx) => Some(ctx.use_handle()),
            Self::Null => None,
        }
    }

    pub fn set_parameter(&self, name: impl Into<String>, value: impl Into<String>) {
        if let Self::Tracking(ctx) = self {
            ctx.set_parameter(name, value);
        }
    }

    pub fn log(&self, message: impl Into<String>) {
        if let Self::Tracking(ctx) = self {
            ctx.log(message);
        }
    }

    pub fn log_exception<E: std::fmt::Display>(&self, error: &E) {
        if let Self::Tracking(ctx) = self {
            ctx.log_exception(error);
        }
    }

    pub fn add_disposable(&self, cleanup: impl FnOnce() + Send + 'static) {
        if let Self::Tracking(ctx) = self {
            ctx.add_disposable(cleanup);
        }
    }
}

/// A cleanup a reporter attaches to an asynchronous context, run
/// sequentially in reverse-registration order by `dispose()`.
#[async_trait]
pub trait AsyncDisposable: Send {
    async fn dispose(self: Box<Self>) -> Result<(), EngineError>;
}

/// The real, tracking half of [`AsyncMethodCallContext`]. Exits on an
/// awaited `dispose()`; `Drop` is only a safety net.
pub struct AsyncTrackingContext {
    core: ContextCore,
    disposables: Mutex<Vec<Box<dyn AsyncDisposable>>>,
    finished: Cell<bool>,
}

impl AsyncTrackingContext {
    fn new(record: Record, stack: Arc<CallStackEngine>, pool: Arc<MethodCallInfoPool>, captured_version: MonitoringVersion, is_admitted: bool) -> Self {
        Self {
            core: ContextCore::new(record, stack, pool, captured_version, is_admitted),
            disposables: Mutex::new(Vec::new()),
            finished: Cell::new(false),
        }
    }

    pub fn record(&self) -> &Record {
        &self.core.record
    }

    /// Extends the record's lifetime past this context's own exit (§4.3's
    /// `use()`). See [`TrackingContext::use_handle`].
    pub fn use_handle(&self) -> RecordHandle {
        self.core.use_handle()
    }

    pub fn set_parameter(&self, name: impl Into<String>, value: impl Into<String>) {
        self.core.set_parameter(name, value);
    }

    pub fn log(&self, message: impl Into<String>) {
        self.core.log(message);
    }

    pub fn log_exception<E: std::fmt::Display>(&self, error: &E) {
        self.core.log_exception(std::any::type_name::<E>(), error);
    }

    pub fn add_disposable(&self, disposable: Box<dyn AsyncDisposable>) {
        self.disposables.lock().push(disposable);
    }

    /// Emits `Exception`-if-unwinding/`End`, pops from the stack, returns
    /// the record to the pool, then awaits every attached cleanup in
    /// reverse-registration order. The first cleanup error is logged and
    /// returned after the rest have still run.
    pub async fn dispose(mut self) -> Result<(), EngineError> {
        let disposables = std::mem::take(&mut *self.disposables.lock());
        self.core.finish();
        self.finished.set(true);

        let mut first_error = None;
        for disposable in disposables.into_iter().rev() {
            if let Err(err) = disposable.dispose().await {
                tracing::error!(error = %err, "an async method call context cleanup failed; continuing with the rest");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for AsyncTrackingContext {
    fn drop(&mut self) {
        if self.finished.get() {
            return;
        }
        tracing::warn!("an AsyncMethodCallContext was dropped without calling dispose(); attached async cleanups will not run");
        self.core.finish();
        self.finished.set(true);
    }
}

/// Scoped handle for an asynchronous method call (spec §4.6).
#[must_use = "awaiting dispose() runs attached cleanups in order; dropping without it falls back to best-effort synchronous cleanup"]
pub enum AsyncMethodCallContext {
    Tracking(AsyncTrackingContext),
    Null,
}

impl AsyncMethodCallContext {
    pub(crate) fn tracking(record: Record, stack: Arc<CallStackEngine>, pool: Arc<MethodCallInfoPool>, captured_version: MonitoringVersion, is_admitted: bool) -> Self {
        Self::Tracking(AsyncTrackingContext::new(record, stack, pool, captured_version, is_admitted))
    }

    pub fn null() -> Self {
        Self::Null
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn record(&self) -> Option<&Record> {
        match self {
            Self::Tracking(ctx) => Some(ctx.record()),
            Self::Null => None,
        }
    }

    /// `None` on the null context; otherwise extends the record's lifetime
    /// past this context's own exit (§4.3's `use()`).
    pub fn use_handle(&self) -> Option<RecordHandle> {
        match self {
            Self::Tracking(ctx) => Some(ctx.use_handle()),
            Self::Null => None,
        }
    }

    pub fn set_parameter(&self, name: impl Into<String>, value: impl Into<String>) {
        if let Self::Tracking(ctx) = self {
            ctx.set_parameter(name, value);
        }
    }

    pub fn log(&self, message: impl Into<String>) {
        if let Self::Tracking(ctx) = self {
            ctx.log(message);
        }
    }

    pub fn log_exception<E: std::fmt::Display>(&self, error: &E) {
        if let Self::Tracking(ctx) = self {
            ctx.log_exception(error);
        }
    }

    pub async fn dispose(self) -> Result<(), EngineError> {
        match self {
            Self::Tracking(ctx) => ctx.dispose().await,
            Self::Null => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
