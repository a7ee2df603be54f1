// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::controller::MonitoringController;
use crate::pool::MethodCallInfoPool;
use callwatch_core::test_support::sample_record;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;

struct RecordingObserver {
    events: StdMutex<Vec<LifecycleEvent>>,
}

impl crate::reporter::Observer for RecordingObserver {
    fn on_next(&self, event: &LifecycleEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
    fn on_error(&self, _message: &str) {}
    fn on_completed(&self) {}
}

fn harness() -> (Arc<CallStackEngine>, Arc<MethodCallInfoPool>, Arc<RecordingObserver>, crate::stack::ObserverHandle) {
    let stack = Arc::new(CallStackEngine::new(MonitoringController::new()));
    let pool = Arc::new(MethodCallInfoPool::new());
    let observer = Arc::new(RecordingObserver {
        events: StdMutex::new(Vec::new()),
    });
    let handle = stack.subscribe(observer.clone());
    (stack, pool, observer, handle)
}

fn kinds(events: &[LifecycleEvent]) -> Vec<&'static str> {
    events
        .iter()
        .map(|e| match e {
            LifecycleEvent::Start { .. } => "Start",
            LifecycleEvent::End { .. } => "End",
            LifecycleEvent::Exception { .. } => "Exception",
            LifecycleEvent::LogEntry { .. } => "LogEntry",
            LifecycleEvent::Gap { .. } => "Gap",
            LifecycleEvent::Empty { .. } => "Empty",
        })
        .collect()
}

#[test]
fn admitted_tracking_context_emits_start_then_end_on_drop() {
    let (stack, pool, observer, _handle) = harness();
    let record = sample_record("a", "Widget", "Widget.render");
    stack.push(Arc::clone(&record));

    {
        let ctx = MethodCallContext::tracking(Arc::clone(&record), Arc::clone(&stack), Arc::clone(&pool), MonitoringVersion::ZERO, true);
        assert!(!ctx.is_null());
        ctx.log("hello");
    }

    let events = observer.events.lock().unwrap();
    assert_eq!(kinds(&events), vec!["Start", "LogEntry", "End"]);
}

#[test]
fn non_admitted_tracking_context_still_pops_the_stack_but_emits_nothing() {
    let (stack, pool, observer, _handle) = harness();
    let record = sample_record("a", "Widget", "Widget.render");
    stack.push(Arc::clone(&record));

    {
        let ctx = MethodCallContext::tracking(Arc::clone(&record), Arc::clone(&stack), Arc::clone(&pool), MonitoringVersion::ZERO, false);
        ctx.log("should not appear");
        ctx.set_parameter("k", "v");
    }

    assert!(observer.events.lock().unwrap().is_empty());
    assert_eq!(stack.thread_stack_depth(record.thread_id()), 0);
    assert!(record.parameters().is_empty(), "suppressed context must not mutate the record's parameters");
}

#[test]
fn null_context_is_inert() {
    let ctx = MethodCallContext::null();
    assert!(ctx.is_null());
    assert!(ctx.record().is_none());
    ctx.log("noop");
    ctx.set_parameter("k", "v");
    ctx.add_disposable(|| panic!("must never run"));
}

#[test]
fn explicit_log_exception_suppresses_the_generic_panic_exception() {
    let (stack, pool, observer, _handle) = harness();
    let record = sample_record("a", "Widget", "Widget.render");
    stack.push(Arc::clone(&record));

    let ctx = MethodCallContext::tracking(Arc::clone(&record), Arc::clone(&stack), Arc::clone(&pool), MonitoringVersion::ZERO, true);
    ctx.log_exception(&"boom");
    drop(ctx);

    let events = observer.events.lock().unwrap();
    let exceptions: Vec<_> = events.iter().filter(|e| matches!(e, LifecycleEvent::Exception { .. })).collect();
    assert_eq!(exceptions.len(), 1, "only the explicit log_exception call should produce an Exception event");
}

#[test]
fn unwinding_without_log_exception_emits_a_generic_exception_before_end() {
    let (stack, pool, observer, _handle) = harness();
    let record = sample_record("a", "Widget", "Widget.render");
    stack.push(Arc::clone(&record));

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ctx = MethodCallContext::tracking(Arc::clone(&record), Arc::clone(&stack), Arc::clone(&pool), MonitoringVersion::ZERO, true);
        panic!("caller blew up");
    }));
    assert!(outcome.is_err());

    let events = observer.events.lock().unwrap();
    assert_eq!(kinds(&events), vec!["Start", "Exception", "End"]);
}

#[test]
fn disposables_run_on_drop_in_reverse_registration_order() {
    let (stack, pool, _observer, _handle) = harness();
    let record = sample_record("a", "Widget", "Widget.render");
    stack.push(Arc::clone(&record));

    let order = Arc::new(StdMutex::new(Vec::new()));
    {
        let ctx = MethodCallContext::tracking(Arc::clone(&record), Arc::clone(&stack), Arc::clone(&pool), MonitoringVersion::ZERO, true);
        let o1 = order.clone();
        ctx.add_disposable(move || o1.lock().unwrap().push(1));
        let o2 = order.clone();
        ctx.add_disposable(move || o2.lock().unwrap().push(2));
    }

    assert_eq!(*order.lock().unwrap(), vec![2, 1]);
}

#[test]
fn a_panicking_disposable_does_not_block_the_rest() {
    let (stack, pool, _observer, _handle) = harness();
    let record = sample_record("a", "Widget", "Widget.render");
    stack.push(Arc::clone(&record));

    let ran = Arc::new(AtomicUsize::new(0));
    {
        let ctx = MethodCallContext::tracking(Arc::clone(&record), Arc::clone(&stack), Arc::clone(&pool), MonitoringVersion::ZERO, true);
        ctx.add_disposable(|| panic!("cleanup blew up"));
        let flag = ran.clone();
        ctx.add_disposable(move || {
            flag.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

struct FailingDisposable;

#[async_trait::async_trait]
impl AsyncDisposable for FailingDisposable {
    async fn dispose(self: Box<Self>) -> Result<(), EngineError> {
        Err(EngineError::Cleanup("output closed".to_string()))
    }
}

struct CountingDisposable(Arc<AtomicUsize>);

#[async_trait::async_trait]
impl AsyncDisposable for CountingDisposable {
    async fn dispose(self: Box<Self>) -> Result<(), EngineError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn async_dispose_runs_every_cleanup_and_surfaces_the_first_error() {
    let (stack, pool, observer, _handle) = harness();
    let record = sample_record("a", "Widget", "Widget.render");
    stack.push(Arc::clone(&record));

    let count = Arc::new(AtomicUsize::new(0));
    let ctx = AsyncMethodCallContext::tracking(Arc::clone(&record), Arc::clone(&stack), Arc::clone(&pool), MonitoringVersion::ZERO, true);
    if let AsyncMethodCallContext::Tracking(tracking) = &ctx {
        tracking.add_disposable(Box::new(CountingDisposable(count.clone())));
        tracking.add_disposable(Box::new(FailingDisposable));
        tracking.add_disposable(Box::new(CountingDisposable(count.clone())));
    }

    let result = ctx.dispose().await;
    assert!(result.is_err());
    assert_eq!(count.load(Ordering::SeqCst), 2, "both non-failing cleanups still ran");

    let events = observer.events.lock().unwrap();
    assert_eq!(kinds(&events), vec!["Start", "End"]);
}

#[tokio::test]
async fn async_null_context_dispose_is_a_noop() {
    let ctx = AsyncMethodCallContext::null();
    assert!(ctx.is_null());
    assert!(ctx.dispose().await.is_ok());
}

#[test]
fn use_handle_keeps_the_record_readable_after_the_context_drops() {
    let (stack, pool, observer, _handle) = harness();
    let record = sample_record("a", "Widget", "Widget.render");
    stack.push(Arc::clone(&record));

    let handle = {
        let ctx = MethodCallContext::tracking(Arc::clone(&record), Arc::clone(&stack), Arc::clone(&pool), MonitoringVersion::ZERO, true);
        ctx.set_parameter("k", "v");
        ctx.use_handle().expect("tracking context always yields a handle")
    };
    drop(record);

    let events = observer.events.lock().unwrap();
    assert_eq!(kinds(&events), vec!["Start", "End"], "the context still finished normally while the handle is held");
    drop(events);

    assert_eq!(handle.record().class_type(), "Widget", "the handle's record is still readable after the owning context dropped");
    assert_eq!(handle.record().parameters().get("k").map(String::as_str), Some("v"));
}

#[test]
fn dropping_an_async_context_without_dispose_still_finishes_the_record() {
    let (stack, pool, observer, _handle) = harness();
    let record = sample_record("a", "Widget", "Widget.render");
    stack.push(Arc::clone(&record));

    {
        let _ctx = AsyncMethodCallContext::tracking(Arc::clone(&record), Arc::clone(&stack), Arc::clone(&pool), MonitoringVersion::ZERO, true);
    }

    let events = observer.events.lock().unwrap();
    assert_eq!(kinds(&events), vec!["Start", "End"]);
    assert_eq!(stack.thread_stack_depth(record.thread_id()), 0);
}
