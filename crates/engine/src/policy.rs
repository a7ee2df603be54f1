// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy Evaluator (spec §4.5): `should_track`, a pure function of
//! captured version, controller state, and the reporter↔filter
//! relationship graph. No locks beyond what `controller`/`registry`
//! already take internally; no I/O.

use std::any::TypeId;

use callwatch_core::MonitoringVersion;

use crate::controller::{ComponentFamily, MonitoringController};
use crate::registry::ComponentRegistry;

/// `should_track` (spec §4.5). Evaluation order is fixed so results are
/// deterministic across calls with identical inputs:
///
/// 1. Fast-path gate: globally enabled **and** `captured_version` still
///    equals the controller's current version.
/// 2. If `reporter_type` is given, it must be effectively enabled.
/// 3. Filter admission, in priority order:
///    - if `reporter_instance_ids` is non-empty, any listed instance must
///      have `filter_type` enabled at the instance level;
///    - else if `reporter_type` is given, the type-level relationship
///      table must permit `filter_type` for that reporter type;
///    - else `filter_type` must be effectively enabled globally.
#[allow(clippy::too_many_arguments)]
pub fn should_track(
    controller: &MonitoringController,
    registry: &ComponentRegistry,
    captured_version: MonitoringVersion,
    reporter_type: Option<TypeId>,
    filter_type: Option<TypeId>,
    reporter_instance_ids: &[String],
) -> bool {
    if !controller.is_enabled() || captured_version != controller.current_version() {
        return false;
    }

    if let Some(reporter_type) = reporter_type {
        if !controller.get_component_state(ComponentFamily::Reporter, reporter_type) {
            return false;
        }
    }

    if let Some(filter_type) = filter_type {
        let admitted = if !reporter_instance_ids.is_empty() {
            reporter_instance_ids
                .iter()
                .any(|id| registry.filter_enabled_for_reporter_instance(id, filter_type))
        } else if let Some(reporter_type) = reporter_type {
            registry.filter_enabled_for_reporter_type(reporter_type, filter_type)
        } else {
            controller.get_component_state(ComponentFamily::Filter, filter_type)
        };
        if !admitted {
            return false;
        }
    }

    true
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
