// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::any::TypeId;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

struct ReporterA;
struct ReporterB;

#[test]
fn disabled_by_default() {
    let controller = MonitoringController::new();
    assert!(!controller.is_enabled());
}

#[test]
fn enable_sets_flag_and_bumps_version() {
    let controller = MonitoringController::new();
    let before = controller.current_version();
    let after = controller.enable();
    assert!(controller.is_enabled());
    assert!(after > before);
    assert_eq!(controller.current_version(), after);
}

#[test]
fn disable_zeroes_effective_state_but_keeps_declared() {
    let controller = MonitoringController::new();
    let reporter = TypeId::of::<ReporterA>();
    controller.register_component(ComponentFamily::Reporter, reporter);
    controller.enable();
    assert!(controller.get_component_state(ComponentFamily::Reporter, reporter));

    controller.disable();
    assert!(!controller.get_component_state(ComponentFamily::Reporter, reporter));

    controller.enable();
    assert!(
        controller.get_component_state(ComponentFamily::Reporter, reporter),
        "declared state survives a disable/enable cycle"
    );
}

/// (R1) enable(); disable(); enable() returns to an effective state
/// byte-for-byte equal to the first post-enable state, for a fixed
/// configuration.
#[test]
fn enable_disable_enable_round_trips_effective_state() {
    let controller = MonitoringController::new();
    let a = TypeId::of::<ReporterA>();
    let b = TypeId::of::<ReporterB>();
    controller.register_component(ComponentFamily::Reporter, a);
    controller.register_component(ComponentFamily::Reporter, b);
    controller.set_component_state(ComponentFamily::Reporter, b, false);

    controller.enable();
    let first_a = controller.get_component_state(ComponentFamily::Reporter, a);
    let first_b = controller.get_component_state(ComponentFamily::Reporter, b);

    controller.disable();
    controller.enable();

    assert_eq!(controller.get_component_state(ComponentFamily::Reporter, a), first_a);
    assert_eq!(controller.get_component_state(ComponentFamily::Reporter, b), first_b);
}

/// (R2) chosen policy: setting a component to its current declared value
/// still bumps the version.
#[test]
fn set_component_state_always_bumps_version_even_when_unchanged() {
    let controller = MonitoringController::new();
    let reporter = TypeId::of::<ReporterA>();
    controller.register_component(ComponentFamily::Reporter, reporter);

    let v1 = controller.set_component_state(ComponentFamily::Reporter, reporter, true);
    let v2 = controller.set_component_state(ComponentFamily::Reporter, reporter, true);
    assert!(v2 > v1, "repeated identical state change must still bump the version");
}

/// spec.md:88 — a family with nothing ever declared defaults to "all
/// interested" once the controller is enabled; an untouched reporter type
/// must not silently lose tracking just because no one called
/// `add_reporter_type`.
#[test]
fn undeclared_component_family_defaults_to_interested_when_enabled() {
    let controller = MonitoringController::new();
    let reporter = TypeId::of::<ReporterA>();
    assert!(!controller.get_component_state(ComponentFamily::Reporter, reporter), "disabled controller never tracks");

    controller.enable();
    assert!(
        controller.get_component_state(ComponentFamily::Reporter, reporter),
        "nothing was ever declared for this family, so it defaults to interested"
    );
}

/// Once anything in a family has been declared, that family is treated as
/// an intentional allow-list: an unrelated, still-undeclared type in the
/// *same* family does not benefit from the "nothing declared" default.
#[test]
fn declaring_one_type_stops_the_family_wide_default_for_others() {
    let controller = MonitoringController::new();
    let a = TypeId::of::<ReporterA>();
    let b = TypeId::of::<ReporterB>();
    controller.register_component(ComponentFamily::Reporter, a);
    controller.enable();

    assert!(controller.get_component_state(ComponentFamily::Reporter, a));
    assert!(
        !controller.get_component_state(ComponentFamily::Reporter, b),
        "b was never declared once the family already has a declaration"
    );
}

#[test]
fn get_component_state_reflects_global_disabled() {
    let controller = MonitoringController::new();
    let reporter = TypeId::of::<ReporterA>();
    controller.register_component(ComponentFamily::Reporter, reporter);
    controller.set_component_state(ComponentFamily::Reporter, reporter, true);
    assert!(!controller.get_component_state(ComponentFamily::Reporter, reporter));

    controller.enable();
    assert!(controller.get_component_state(ComponentFamily::Reporter, reporter));
}

#[test]
fn state_changed_callbacks_fire_in_registration_order_after_the_write_lock_is_released() {
    let controller = MonitoringController::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let o1 = Arc::clone(&order);
    controller.add_state_changed_callback(move |_v| o1.lock().push(1));
    let o2 = Arc::clone(&order);
    controller.add_state_changed_callback(move |_v| o2.lock().push(2));

    controller.enable();
    assert_eq!(*order.lock(), vec![1, 2]);
}

#[test]
fn callback_may_read_controller_state_without_deadlocking() {
    let controller = MonitoringController::new();
    let seen_enabled = Arc::new(AtomicUsize::new(0));
    let controller_for_cb = controller.clone();
    let seen = Arc::clone(&seen_enabled);
    controller.add_state_changed_callback(move |_v| {
        if controller_for_cb.is_enabled() {
            seen.fetch_add(1, AtomicOrdering::SeqCst);
        }
    });

    controller.enable();
    assert_eq!(seen_enabled.load(AtomicOrdering::SeqCst), 1);
}

#[test]
fn operation_scope_captures_version_and_sees_later_bumps() {
    let controller = MonitoringController::new();
    let scope = controller.begin_operation();
    let captured = scope.version();

    let bumped = controller.enable();
    assert_eq!(scope.version(), bumped);
    assert_ne!(scope.version(), captured);
}

#[test]
fn dropping_the_root_operation_scope_bumps_the_version() {
    let controller = MonitoringController::new();
    let before = controller.current_version();
    {
        let _scope = controller.begin_operation();
    }
    assert!(controller.current_version() > before);
}

#[test]
fn nested_operation_scope_is_not_root() {
    let controller = MonitoringController::new();
    let _root = controller.begin_operation();
    let before_drop = controller.current_version();
    {
        let _nested = controller.begin_operation();
    }
    assert_eq!(
        controller.current_version(),
        before_drop,
        "dropping a non-root scope must not itself bump the version"
    );
}
