// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events emitted to reporters (spec §4.6, §7).
//!
//! Every observable thing that happens to a monitored call is one of these
//! variants. Reporters receive them in emission order per call; the engine
//! guarantees `Start` precedes everything else for a given id and `End`
//! (or `Exception`) is the last event for that id.

use std::time::{Duration, SystemTime};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::id::MethodCallId;
use crate::version::MonitoringVersion;

/// A single captured exception/panic (§4.6, §7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedException {
    pub type_name: String,
    pub message: String,
    /// Best-effort textual backtrace; empty when unavailable (e.g. panics
    /// caught without `RUST_BACKTRACE` capture enabled).
    pub backtrace: String,
}

/// One entry logged against an in-flight call via the logging surface
/// (§4.6's `LogEntry` event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntryPayload {
    pub level: LogLevel,
    pub message: String,
}

/// Severity for a [`LogEntryPayload`]. Intentionally small and
/// library-local rather than reused from a logging facade: this rides on
/// the monitoring event stream, not on `tracing`'s own subscriber output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// A lifecycle event for one `MethodCallId`, tagged with the monitoring
/// version that was in effect when it was produced (§4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// Emitted when a call enters the stack, after all filters admit it.
    Start {
        call_id: MethodCallId,
        version: MonitoringVersion,
        start_time: SystemTime,
        class_type: String,
        method_descriptor: String,
        level: u32,
        parameters: IndexMap<String, String>,
    },
    /// Emitted when a call exits normally.
    End {
        call_id: MethodCallId,
        version: MonitoringVersion,
        elapsed: Duration,
    },
    /// Emitted instead of `End` when the call unwound via a panic or
    /// propagated error (§7).
    Exception {
        call_id: MethodCallId,
        version: MonitoringVersion,
        elapsed: Duration,
        exception: CapturedException,
    },
    /// A log line attached to an in-flight call.
    LogEntry {
        call_id: MethodCallId,
        version: MonitoringVersion,
        entry: LogEntryPayload,
    },
    /// Emitted when the engine detects a break in otherwise-contiguous
    /// monitoring (e.g. a disabled window inside an enabled one) so
    /// reporters can render a visible discontinuity instead of silently
    /// dropping time (§4.6).
    Gap {
        version: MonitoringVersion,
        since: SystemTime,
        duration: Duration,
    },
    /// Emitted exactly once per drain cycle when there is nothing else to
    /// report, so reporters that flush on a timer have a heartbeat they can
    /// distinguish from "no drain happened" (§4.6, §8).
    Empty { version: MonitoringVersion },
}

impl LifecycleEvent {
    /// The call this event concerns, or `None` for process-wide events
    /// (`Gap`, `Empty`) that aren't scoped to one call.
    pub fn call_id(&self) -> Option<&MethodCallId> {
        match self {
            LifecycleEvent::Start { call_id, .. }
            | LifecycleEvent::End { call_id, .. }
            | LifecycleEvent::Exception { call_id, .. }
            | LifecycleEvent::LogEntry { call_id, .. } => Some(call_id),
            LifecycleEvent::Gap { .. } | LifecycleEvent::Empty { .. } => None,
        }
    }

    pub fn version(&self) -> MonitoringVersion {
        match self {
            LifecycleEvent::Start { version, .. }
            | LifecycleEvent::End { version, .. }
            | LifecycleEvent::Exception { version, .. }
            | LifecycleEvent::LogEntry { version, .. }
            | LifecycleEvent::Gap { version, .. }
            | LifecycleEvent::Empty { version, .. } => *version,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
