// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal in-memory reference components (spec §4 Supplemented: "a
//! minimal reference reporter, test-support only"). Not a real sink — no
//! CSV/TXT/Rantt formatting, no file system — just enough to exercise the
//! facade and call stack end to end without hand-rolling an `Observer` in
//! every caller.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use callwatch_core::{LifecycleEvent, Record};

use crate::error::EngineError;
use crate::reporter::{Filter, Observer, Output, Reporter};

/// A reporter that keeps every event it has seen in memory, in arrival
/// order, for assertions in tests and demos.
#[derive(Default)]
pub struct InMemoryReporter {
    events: Mutex<Vec<LifecycleEvent>>,
    outputs: Mutex<Vec<Arc<dyn Output>>>,
    filters: Mutex<Vec<Arc<dyn Filter>>>,
}

impl InMemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().clone()
    }

    pub fn filter_count(&self) -> usize {
        self.filters.lock().len()
    }
}

impl Observer for InMemoryReporter {
    fn on_next(&self, event: &LifecycleEvent) {
        self.events.lock().push(event.clone());
    }

    fn on_error(&self, _message: &str) {}

    fn on_completed(&self) {}
}

#[async_trait]
impl Reporter for InMemoryReporter {
    async fn initialize(&self, _configuration: &crate::config::MethodConfiguration, _root_record: &Record) -> Result<(), EngineError> {
        Ok(())
    }

    fn add_output(&self, output: Arc<dyn Output>) {
        self.outputs.lock().push(output);
    }

    fn add_filter(&self, filter: Arc<dyn Filter>) {
        self.filters.lock().push(filter);
    }
}

/// An output sink that records every call it receives, for assertions.
#[derive(Default)]
pub struct InMemoryOutput {
    items: Mutex<Vec<String>>,
}

impl InMemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<String> {
        self.items.lock().clone()
    }
}

#[async_trait]
impl Output for InMemoryOutput {
    async fn initialize(&self, reporter_name: &str) {
        self.items.lock().push(format!("init:{reporter_name}"));
    }

    async fn write_item(&self, event: &LifecycleEvent, message: Option<&str>) {
        self.items.lock().push(format!("item:{event:?}:{message:?}"));
    }

    async fn write_summary(&self, message: &str) {
        self.items.lock().push(format!("summary:{message}"));
    }

    async fn write_error(&self, error: &str) {
        self.items.lock().push(format!("error:{error}"));
    }
}

/// A filter that always admits, for tests that need a non-null filter
/// without caring about its predicate.
pub struct AlwaysAdmit;

impl Filter for AlwaysAdmit {
    fn should_include(&self, _record: &Record) -> bool {
        true
    }
}

#[cfg(test)]
#[path = "test_support_tests.rs"]
mod tests;
