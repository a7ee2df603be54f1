// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observer / Reporter / Filter / Output contracts (spec §6).
//!
//! `Observer` is the engine-internal fan-out sink; `Reporter` is an
//! `Observer` that also knows how to initialize itself against a
//! configuration and attach outputs/filters. Concrete sinks (CSV/TXT/Rantt
//! writers) are out of scope; only the contracts live here.

use std::any::TypeId;
use std::sync::Arc;

use async_trait::async_trait;
use callwatch_core::{LifecycleEvent, Record};

use crate::config::MethodConfiguration;
use crate::error::EngineError;

/// Engine-internal fan-out sink. Implementations must not block or panic;
/// the engine catches panics at the call site and continues delivering to
/// other observers, but a well-behaved observer should never rely on that.
pub trait Observer: Send + Sync {
    fn on_next(&self, event: &LifecycleEvent);
    fn on_error(&self, message: &str);
    fn on_completed(&self);
}

/// A reporter subscribes to the call stack's event stream and fans events
/// out to its attached outputs, applying its attached filters.
#[async_trait]
pub trait Reporter: Observer {
    /// Called once before reporting begins, with the configuration that
    /// produced this reporter and the first record it will ever see.
    async fn initialize(&self, configuration: &MethodConfiguration, root_record: &Record) -> Result<(), EngineError>;

    fn add_output(&self, output: Arc<dyn Output>);

    fn add_filter(&self, filter: Arc<dyn Filter>);

    /// Identity used to look up this reporter's declared/effective state
    /// in the controller's component tables (spec §4.2, §4.5). The
    /// default is correct for every concrete reporter type and need never
    /// be overridden.
    fn reporter_type_id(&self) -> TypeId
    where
        Self: 'static,
    {
        TypeId::of::<Self>()
    }
}

/// Pure predicate over a record's current parameter map and method
/// descriptor (spec §6).
pub trait Filter: Send + Sync {
    fn should_include(&self, record: &Record) -> bool;

    /// Identity used to look up this filter's declared/effective state and
    /// its reporter-relationship entries (spec §4.2, §4.5), mirroring
    /// [`Reporter::reporter_type_id`]. The default is correct for every
    /// concrete filter type and need never be overridden.
    fn filter_type_id(&self) -> TypeId
    where
        Self: 'static,
    {
        TypeId::of::<Self>()
    }
}

/// A typed sink a reporter writes to. Out of scope to implement a concrete
/// CSV/TXT/Rantt writer; this is the contract concrete sinks would satisfy.
#[async_trait]
pub trait Output: Send + Sync {
    async fn initialize(&self, reporter_name: &str);
    async fn write_item(&self, event: &LifecycleEvent, message: Option<&str>);
    async fn write_summary(&self, message: &str);
    async fn write_error(&self, error: &str);
}

#[cfg(test)]
#[path = "reporter_tests.rs"]
mod tests;
