// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn display_messages_are_human_readable() {
    assert_eq!(EngineError::InvalidArgument("bad kind".to_string()).to_string(), "invalid argument: bad kind");
    assert_eq!(EngineError::MethodNotFound("Widget.go".to_string()).to_string(), "method not found: Widget.go");
    assert_eq!(EngineError::Cleanup("output closed".to_string()).to_string(), "cleanup failed: output closed");
}

#[test]
fn core_error_converts_via_from() {
    let core_err = callwatch_core::CoreError::InvalidArgument("bad".to_string());
    let engine_err: EngineError = core_err.into();
    assert!(matches!(engine_err, EngineError::Core(_)));
}
