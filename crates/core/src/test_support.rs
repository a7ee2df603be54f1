// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use std::time::{Duration, SystemTime};

use indexmap::IndexMap;

use crate::event::{CapturedException, LifecycleEvent, LogEntryPayload, LogLevel};
use crate::id::MethodCallId;
use crate::record::{MethodCallInfo, MethodCallInfoParams, Record};
use crate::version::MonitoringVersion;

pub fn sample_record(id: &str, class_type: &str, method_descriptor: &str) -> Record {
    let params = MethodCallInfoParams {
        class_type: class_type.to_string(),
        method_descriptor: method_descriptor.to_string(),
        ..Default::default()
    };
    std::sync::Arc::new(MethodCallInfo::new(MethodCallId::new(id), params, SystemTime::now()))
}

pub fn start_event(call_id: &str, version: MonitoringVersion, level: u32) -> LifecycleEvent {
    LifecycleEvent::Start {
        call_id: MethodCallId::new(call_id),
        version,
        start_time: SystemTime::now(),
        class_type: "TestClass".to_string(),
        method_descriptor: "TestClass.test_method".to_string(),
        level,
        parameters: IndexMap::new(),
    }
}

pub fn end_event(call_id: &str, version: MonitoringVersion, elapsed: Duration) -> LifecycleEvent {
    LifecycleEvent::End {
        call_id: MethodCallId::new(call_id),
        version,
        elapsed,
    }
}

pub fn exception_event(call_id: &str, version: MonitoringVersion, message: &str) -> LifecycleEvent {
    LifecycleEvent::Exception {
        call_id: MethodCallId::new(call_id),
        version,
        elapsed: Duration::from_millis(1),
        exception: CapturedException {
            type_name: "TestError".to_string(),
            message: message.to_string(),
            backtrace: String::new(),
        },
    }
}

pub fn log_entry_event(call_id: &str, version: MonitoringVersion, message: &str) -> LifecycleEvent {
    LifecycleEvent::LogEntry {
        call_id: MethodCallId::new(call_id),
        version,
        entry: LogEntryPayload {
            level: LogLevel::Info,
            message: message.to_string(),
        },
    }
}
