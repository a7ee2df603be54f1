// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration Builder (spec §4.7, §6): a global `EngineConfiguration`
//! declares which component types exist, and a per-call `MethodConfiguration`
//! declares the reporters/filters/parameters a single `start`/`async_start`
//! invocation runs with.

use std::any::TypeId;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::reporter::{Filter, Reporter};

/// Declares which reporter/filter/output types the engine knows about.
/// Built via [`EngineConfigurationBuilder`] and applied through
/// `callwatch_engine::configure`.
#[derive(Debug, Clone, Default)]
pub struct EngineConfiguration {
    pub reporter_types: Vec<TypeId>,
    pub filter_types: Vec<TypeId>,
    pub output_types: Vec<TypeId>,
    /// Type names registered via `track_assembly`/`track_type` (§4 Supplemented:
    /// Configuration Builder completeness — Rust has no reflection-based
    /// assembly scanning, so these are registration hooks, not a scan).
    pub tracked_type_names: Vec<&'static str>,
}

/// Fluent builder for [`EngineConfiguration`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfigurationBuilder {
    config: EngineConfiguration,
}

impl EngineConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_reporter_type<T: 'static>(mut self) -> Self {
        self.config.reporter_types.push(TypeId::of::<T>());
        self
    }

    pub fn add_filter<T: 'static>(mut self) -> Self {
        self.config.filter_types.push(TypeId::of::<T>());
        self
    }

    pub fn add_output<T: 'static>(mut self) -> Self {
        self.config.output_types.push(TypeId::of::<T>());
        self
    }

    /// Registers a type name without scanning for its methods (Rust has no
    /// reflection-based assembly scanner; see §4 Supplemented note).
    pub fn track_assembly(mut self, assembly_name: &'static str) -> Self {
        self.config.tracked_type_names.push(assembly_name);
        self
    }

    pub fn track_type<T: 'static>(mut self) -> Self {
        self.config.tracked_type_names.push(std::any::type_name::<T>());
        self
    }

    pub fn build(self) -> EngineConfiguration {
        self.config
    }
}

/// Per-call configuration: which reporters/filters a single `start`
/// invocation runs with, plus the parameters merged into the rented
/// record (spec §4.4: "config entries override attributes").
#[derive(Clone, Default)]
pub struct MethodConfiguration {
    pub reporters: Vec<Arc<dyn Reporter>>,
    pub filters: Vec<Arc<dyn Filter>>,
    pub parameters: IndexMap<String, String>,
    pub generic_args: Vec<String>,
    pub parameter_types: Vec<String>,
    pub is_static: bool,
    pub is_extension: bool,
    pub extended_type: Option<String>,
}

impl std::fmt::Debug for MethodConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodConfiguration")
            .field("reporters", &self.reporters.len())
            .field("filters", &self.filters.len())
            .field("parameters", &self.parameters)
            .field("generic_args", &self.generic_args)
            .field("parameter_types", &self.parameter_types)
            .field("is_static", &self.is_static)
            .field("is_extension", &self.is_extension)
            .field("extended_type", &self.extended_type)
            .finish()
    }
}

/// Fluent builder for [`MethodConfiguration`].
#[derive(Default)]
pub struct MethodConfigurationBuilder {
    config: MethodConfiguration,
}

impl MethodConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.config.reporters.push(reporter);
        self
    }

    pub fn add_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.config.filters.push(filter);
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.parameters.insert(name.into(), value.into());
        self
    }

    pub fn generic_arg(mut self, type_name: impl Into<String>) -> Self {
        self.config.generic_args.push(type_name.into());
        self
    }

    pub fn parameter_type(mut self, type_name: impl Into<String>) -> Self {
        self.config.parameter_types.push(type_name.into());
        self
    }

    pub fn is_static(mut self, value: bool) -> Self {
        self.config.is_static = value;
        self
    }

    pub fn is_extension(mut self, value: bool) -> Self {
        self.config.is_extension = value;
        self
    }

    pub fn extended_type(mut self, type_name: impl Into<String>) -> Self {
        self.config.extended_type = Some(type_name.into());
        self
    }

    pub fn build(self) -> MethodConfiguration {
        self.config
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
