// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn start_event() -> LifecycleEvent {
    LifecycleEvent::Start {
        call_id: MethodCallId::new("a"),
        version: MonitoringVersion::ZERO,
        start_time: SystemTime::UNIX_EPOCH,
        class_type: "Widget".into(),
        method_descriptor: "Widget.render".into(),
        level: 1,
        parameters: IndexMap::new(),
    }
}

#[test]
fn call_id_present_for_call_scoped_events() {
    let ev = start_event();
    assert_eq!(ev.call_id().unwrap(), &MethodCallId::new("a"));
}

#[test]
fn call_id_absent_for_process_scoped_events() {
    let gap = LifecycleEvent::Gap {
        version: MonitoringVersion::ZERO,
        since: SystemTime::UNIX_EPOCH,
        duration: Duration::from_secs(1),
    };
    assert!(gap.call_id().is_none());

    let empty = LifecycleEvent::Empty { version: MonitoringVersion::ZERO };
    assert!(empty.call_id().is_none());
}

#[test]
fn version_accessor_covers_every_variant() {
    let v = MonitoringVersion { timestamp_ms: 9, counter: 1, uuid: 2 };
    let events = vec![
        LifecycleEvent::Start {
            call_id: MethodCallId::new("a"),
            version: v,
            start_time: SystemTime::UNIX_EPOCH,
            class_type: "C".into(),
            method_descriptor: "C.m".into(),
            level: 1,
            parameters: IndexMap::new(),
        },
        LifecycleEvent::End { call_id: MethodCallId::new("a"), version: v, elapsed: Duration::ZERO },
        LifecycleEvent::Exception {
            call_id: MethodCallId::new("a"),
            version: v,
            elapsed: Duration::ZERO,
            exception: CapturedException {
                type_name: "E".into(),
                message: "boom".into(),
                backtrace: String::new(),
            },
        },
        LifecycleEvent::LogEntry {
            call_id: MethodCallId::new("a"),
            version: v,
            entry: LogEntryPayload { level: LogLevel::Info, message: "hi".into() },
        },
        LifecycleEvent::Gap { version: v, since: SystemTime::UNIX_EPOCH, duration: Duration::ZERO },
        LifecycleEvent::Empty { version: v },
    ];
    for ev in events {
        assert_eq!(ev.version(), v);
    }
}

#[test]
fn serde_roundtrip_preserves_variant() {
    let ev = start_event();
    let json = serde_json::to_string(&ev).unwrap();
    let back: LifecycleEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(ev, back);
}
