// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Well-known parameter keys and the workflow-item vocabulary (spec §3).
//!
//! The parameter map itself is just `IndexMap<String, String>` (see
//! [`crate::record`]) — no key is structurally privileged. These constants
//! and enums exist only so the bundled reporters (and callers that want to
//! participate in workflow reporting) agree on spelling.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Parameter key naming the workflow item (e.g. a UI action or query name).
pub const WORKFLOW_ITEM_NAME: &str = "WorkflowItemName";
/// Parameter key naming the [`WorkflowItemType`].
pub const WORKFLOW_ITEM_TYPE: &str = "WorkflowItemType";
/// Parameter key naming the [`WorkflowItemGranularity`].
pub const WORKFLOW_ITEM_GRANULARITY: &str = "WorkflowItemGranularity";
/// Parameter key carrying a SQL query string.
pub const SQL_QUERY: &str = "SqlQuery";
/// Parameter key naming the entity a call acts on.
pub const ENTITY_NAME: &str = "EntityName";
/// Parameter key carrying a call's result, rendered for reporting.
pub const RESULT: &str = "Result";
/// Parameter key carrying a call's input, rendered for reporting.
pub const INPUT: &str = "Input";

/// Classification of a workflow item, used by workflow-aware reporters to
/// decide how to group and render a call (§3, §9 GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowItemType {
    /// Synthetic item covering a period with no tracked child call.
    Gap,
    UserInteraction,
    DataProcess,
    DataIO,
    Refresh,
    Overview,
}

impl WorkflowItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowItemType::Gap => "Gap",
            WorkflowItemType::UserInteraction => "UserInteraction",
            WorkflowItemType::DataProcess => "DataProcess",
            WorkflowItemType::DataIO => "DataIO",
            WorkflowItemType::Refresh => "Refresh",
            WorkflowItemType::Overview => "Overview",
        }
    }
}

impl fmt::Display for WorkflowItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a parameter value doesn't match the well-known
/// vocabulary for its key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized value {0:?}")]
pub struct UnrecognizedValue(pub String);

impl FromStr for WorkflowItemType {
    type Err = UnrecognizedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Gap" => Ok(WorkflowItemType::Gap),
            "UserInteraction" => Ok(WorkflowItemType::UserInteraction),
            "DataProcess" => Ok(WorkflowItemType::DataProcess),
            "DataIO" => Ok(WorkflowItemType::DataIO),
            "Refresh" => Ok(WorkflowItemType::Refresh),
            "Overview" => Ok(WorkflowItemType::Overview),
            other => Err(UnrecognizedValue(other.to_string())),
        }
    }
}

/// Granularity of a workflow item, fine-to-coarse ordered so reporters can
/// filter by "at least this coarse" (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkflowItemGranularity {
    Fine,
    Medium,
    Coarse,
}

impl WorkflowItemGranularity {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowItemGranularity::Fine => "Fine",
            WorkflowItemGranularity::Medium => "Medium",
            WorkflowItemGranularity::Coarse => "Coarse",
        }
    }
}

impl fmt::Display for WorkflowItemGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowItemGranularity {
    type Err = UnrecognizedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Fine" => Ok(WorkflowItemGranularity::Fine),
            "Medium" => Ok(WorkflowItemGranularity::Medium),
            "Coarse" => Ok(WorkflowItemGranularity::Coarse),
            other => Err(UnrecognizedValue(other.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
