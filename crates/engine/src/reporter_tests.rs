// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use callwatch_core::test_support::sample_record;
use std::sync::atomic::{AtomicUsize, Ordering};

struct CountingObserver {
    next: AtomicUsize,
    errors: AtomicUsize,
    completed: AtomicUsize,
}

impl Observer for CountingObserver {
    fn on_next(&self, _event: &LifecycleEvent) {
        self.next.fetch_add(1, Ordering::SeqCst);
    }

    fn on_error(&self, _message: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    fn on_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn observer_counts_each_callback_independently() {
    let observer = CountingObserver {
        next: AtomicUsize::new(0),
        errors: AtomicUsize::new(0),
        completed: AtomicUsize::new(0),
    };
    observer.on_next(&LifecycleEvent::Empty {
        version: callwatch_core::MonitoringVersion::ZERO,
    });
    observer.on_error("boom");
    observer.on_completed();

    assert_eq!(observer.next.load(Ordering::SeqCst), 1);
    assert_eq!(observer.errors.load(Ordering::SeqCst), 1);
    assert_eq!(observer.completed.load(Ordering::SeqCst), 1);
}

struct HasWorkflowName;

impl Filter for HasWorkflowName {
    fn should_include(&self, record: &Record) -> bool {
        record
            .parameters()
            .get(callwatch_core::WORKFLOW_ITEM_NAME)
            .is_some_and(|v| !v.is_empty())
    }
}

#[test]
fn filter_inspects_the_records_current_parameters() {
    let record = sample_record("a", "Widget", "Widget.render");
    let filter = HasWorkflowName;
    assert!(!filter.should_include(&record));

    record.set_parameter(callwatch_core::WORKFLOW_ITEM_NAME, "checkout");
    assert!(filter.should_include(&record));
}
