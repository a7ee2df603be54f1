// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::params::WorkflowItemType;

#[test]
fn unrecognized_value_converts_via_from() {
    let parse_err = "Bogus".parse::<WorkflowItemType>().unwrap_err();
    let err: CoreError = parse_err.clone().into();
    match err {
        CoreError::UnrecognizedValue(inner) => assert_eq!(inner, parse_err),
        other => panic!("expected UnrecognizedValue, got {other:?}"),
    }
}

#[test]
fn display_messages_are_human_readable() {
    assert_eq!(
        CoreError::ComponentNotFound("WorkflowFilter".into()).to_string(),
        "component not found: WorkflowFilter"
    );
    assert_eq!(
        CoreError::InvalidArgument("unknown method".into()).to_string(),
        "invalid argument: unknown method"
    );
}
