// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

struct ReporterA;
struct ReporterB;
struct FilterX;

#[test]
fn registering_a_type_twice_keeps_one_descriptor() {
    let registry = ComponentRegistry::new();
    let id1 = registry.register_reporter_type::<ReporterA>();
    let id2 = registry.register_reporter_type::<ReporterA>();
    assert_eq!(id1, id2);
    assert_eq!(registry.reporter_types().len(), 1);
}

#[test]
fn distinct_types_register_distinct_ids() {
    let registry = ComponentRegistry::new();
    let a = registry.register_reporter_type::<ReporterA>();
    let b = registry.register_reporter_type::<ReporterB>();
    assert_ne!(a, b);
}

#[test]
fn unregistered_type_is_not_registered() {
    let registry = ComponentRegistry::new();
    registry.register_reporter_type::<ReporterA>();
    assert!(!registry.is_reporter_type_registered(TypeId::of::<ReporterB>()));
}

#[test]
fn type_level_relationship_defaults_to_disabled() {
    let registry = ComponentRegistry::new();
    let reporter = TypeId::of::<ReporterA>();
    let filter = TypeId::of::<FilterX>();
    assert!(!registry.filter_enabled_for_reporter_type(reporter, filter));
}

#[test]
fn type_level_relationship_is_settable() {
    let registry = ComponentRegistry::new();
    let reporter = TypeId::of::<ReporterA>();
    let filter = TypeId::of::<FilterX>();
    registry.set_filter_state_for_reporter_type(reporter, filter, true);
    assert!(registry.filter_enabled_for_reporter_type(reporter, filter));
}

#[test]
fn has_type_relationship_distinguishes_never_declared_from_declared_disabled() {
    let registry = ComponentRegistry::new();
    let reporter = TypeId::of::<ReporterA>();
    let filter = TypeId::of::<FilterX>();
    assert!(!registry.has_type_relationship(reporter, filter));

    registry.set_filter_state_for_reporter_type(reporter, filter, false);
    assert!(registry.has_type_relationship(reporter, filter));
    assert!(!registry.filter_enabled_for_reporter_type(reporter, filter));
}

#[test]
fn has_instance_relationship_distinguishes_never_declared_from_declared_disabled() {
    let registry = ComponentRegistry::new();
    let filter = TypeId::of::<FilterX>();
    assert!(!registry.has_instance_relationship("reporter-1", filter));

    registry.set_filter_state_for_reporter_instance("reporter-1", filter, false);
    assert!(registry.has_instance_relationship("reporter-1", filter));
    assert!(!registry.filter_enabled_for_reporter_instance("reporter-1", filter));
}

#[test]
fn instance_level_relationship_is_independent_of_type_level() {
    let registry = ComponentRegistry::new();
    let filter = TypeId::of::<FilterX>();
    registry.set_filter_state_for_reporter_instance("reporter-1", filter, true);

    assert!(registry.filter_enabled_for_reporter_instance("reporter-1", filter));
    assert!(!registry.filter_enabled_for_reporter_instance("reporter-2", filter));
    assert!(!registry.filter_enabled_for_reporter_type(TypeId::of::<ReporterA>(), filter));
}
