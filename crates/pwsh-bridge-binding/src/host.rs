// crates/pwsh-bridge-binding/src/host.rs
// ============================================================================
// Module: Host Contract
// Description: Interface to the process that executes wrapped scripts.
// Purpose: Decouple call orchestration from host process management.
// Dependencies: async-trait, thiserror
// ============================================================================

//! ## Overview
//! A [`Host`] executes one wrapped script and returns whatever it wrote to its
//! output streams. Process lifecycle, timeouts, and cancellation belong to the
//! host implementation; the binding waits for `execute` to resolve and never
//! retries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Streams captured from the host for a single script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostOutput {
    /// Standard output, when the host captured it.
    pub stdout: Option<String>,
    /// Standard error, when the host captured it.
    pub stderr: Option<String>,
}

impl HostOutput {
    /// Builds output carrying only standard output.
    #[must_use]
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stdout: Some(text.into()),
            stderr: None,
        }
    }
}

/// Host execution failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The host could not accept the script.
    #[error("host unavailable: {0}")]
    Unavailable(String),
    /// The host accepted the script but failed while running it.
    #[error("host execution failed: {0}")]
    Execution(String),
}

// ============================================================================
// SECTION: Host Trait
// ============================================================================

/// Executes wrapped scripts.
#[async_trait]
pub trait Host: Send + Sync {
    /// Runs `script` as a single unit and returns the captured streams.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the script cannot be run.
    async fn execute(&self, script: &str) -> Result<HostOutput, HostError>;
}
