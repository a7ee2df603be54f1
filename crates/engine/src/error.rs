// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime.

use thiserror::Error;

/// Errors surfaced synchronously to instrumented code (§7: "configuration
/// errors ... surface as Invalid Argument at the call site; no state
/// mutation occurs").
///
/// Everything else the engine can encounter (reflection miss, pool
/// exhaustion, reporter failure) degrades silently per §7 and never
/// reaches this type.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("method not found: {0}")]
    MethodNotFound(String),
    #[error("component not found: {0}")]
    ComponentNotFound(String),
    #[error("cleanup failed: {0}")]
    Cleanup(String),
    #[error(transparent)]
    Core(#[from] callwatch_core::CoreError),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
