// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Component Registry: which reporter/filter/output types exist, and the
//! reporter↔filter relationship graph (spec §2, §4.2).
//!
//! Per the "Dynamic type/component registry → tagged variants" design note
//! (§9): components are identified by `TypeId` rather than reflected at
//! runtime, and the registry is a concurrent map keyed by that identity —
//! there is no closed built-in enum here because the spec's reporter/filter
//! kinds are themselves an open extension point (`add_reporter_type<T>()`
//! etc. in the facade), so the "tagged variant" is just `(TypeId, &'static
//! str, ComponentKind)`.

use std::any::TypeId;

use dashmap::DashMap;

/// Which of the three component families a registration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Reporter,
    Filter,
    Output,
}

/// A registered component type: identity plus a human-readable label for
/// logging and error messages. No function table is stored here — the
/// actual behavior lives behind the `Reporter`/`Filter`/`Output` trait
/// objects constructed by the facade; the registry only tracks identity
/// and relationships.
#[derive(Debug, Clone, Copy)]
pub struct ComponentDescriptor {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub kind: ComponentKind,
}

/// Tracks registered component types and the reporter↔filter applicability
/// graph. Cheap to clone (internally `Arc`-free maps are owned directly;
/// callers share a registry behind `Arc<ComponentRegistry>`).
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    reporters: DashMap<TypeId, ComponentDescriptor>,
    filters: DashMap<TypeId, ComponentDescriptor>,
    outputs: DashMap<TypeId, ComponentDescriptor>,
    /// `(reporter_type, filter_type) -> enabled`
    type_filter_relationships: DashMap<(TypeId, TypeId), bool>,
    /// `(reporter_instance_id, filter_type) -> enabled`
    instance_filter_relationships: DashMap<(String, TypeId), bool>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_reporter_type<T: 'static>(&self) -> TypeId {
        self.register::<T>(&self.reporters, ComponentKind::Reporter)
    }

    pub fn register_filter_type<T: 'static>(&self) -> TypeId {
        self.register::<T>(&self.filters, ComponentKind::Filter)
    }

    pub fn register_output_type<T: 'static>(&self) -> TypeId {
        self.register::<T>(&self.outputs, ComponentKind::Output)
    }

    fn register<T: 'static>(
        &self,
        table: &DashMap<TypeId, ComponentDescriptor>,
        kind: ComponentKind,
    ) -> TypeId {
        let type_id = TypeId::of::<T>();
        table.entry(type_id).or_insert(ComponentDescriptor {
            type_id,
            type_name: std::any::type_name::<T>(),
            kind,
        });
        type_id
    }

    pub fn is_reporter_type_registered(&self, type_id: TypeId) -> bool {
        self.reporters.contains_key(&type_id)
    }

    pub fn is_filter_type_registered(&self, type_id: TypeId) -> bool {
        self.filters.contains_key(&type_id)
    }

    pub fn is_output_type_registered(&self, type_id: TypeId) -> bool {
        self.outputs.contains_key(&type_id)
    }

    pub fn reporter_types(&self) -> Vec<ComponentDescriptor> {
        self.reporters.iter().map(|e| *e.value()).collect()
    }

    pub fn filter_types(&self) -> Vec<ComponentDescriptor> {
        self.filters.iter().map(|e| *e.value()).collect()
    }

    pub fn output_types(&self) -> Vec<ComponentDescriptor> {
        self.outputs.iter().map(|e| *e.value()).collect()
    }

    /// Sets whether `filter_type` applies to every instance of
    /// `reporter_type`. Absent entries default to `false`: an undeclared
    /// relationship does not permit the filter (§4.5 is the strict path;
    /// contrast with the looser admission-rule default in
    /// `CallStackEngine::log_status`).
    pub fn set_filter_state_for_reporter_type(
        &self,
        reporter_type: TypeId,
        filter_type: TypeId,
        enabled: bool,
    ) {
        self.type_filter_relationships
            .insert((reporter_type, filter_type), enabled);
    }

    pub fn filter_enabled_for_reporter_type(&self, reporter_type: TypeId, filter_type: TypeId) -> bool {
        self.type_filter_relationships
            .get(&(reporter_type, filter_type))
            .map(|e| *e.value())
            .unwrap_or(false)
    }

    /// Whether a type-level relationship has ever been declared for this
    /// pair, regardless of whether it is currently enabled. Callers use
    /// this to decide whether the strict relationship-table path applies
    /// at all, or whether to fall back to the looser global default.
    pub fn has_type_relationship(&self, reporter_type: TypeId, filter_type: TypeId) -> bool {
        self.type_filter_relationships.contains_key(&(reporter_type, filter_type))
    }

    pub fn set_filter_state_for_reporter_instance(
        &self,
        reporter_id: impl Into<String>,
        filter_type: TypeId,
        enabled: bool,
    ) {
        self.instance_filter_relationships
            .insert((reporter_id.into(), filter_type), enabled);
    }

    pub fn filter_enabled_for_reporter_instance(&self, reporter_id: &str, filter_type: TypeId) -> bool {
        self.instance_filter_relationships
            .get(&(reporter_id.to_string(), filter_type))
            .map(|e| *e.value())
            .unwrap_or(false)
    }

    /// Whether an instance-level relationship has ever been declared for
    /// this pair. See [`Self::has_type_relationship`].
    pub fn has_instance_relationship(&self, reporter_id: &str, filter_type: TypeId) -> bool {
        self.instance_filter_relationships.contains_key(&(reporter_id.to_string(), filter_type))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
