// crates/pwsh-bridge-core/src/exception.rs
// ============================================================================
// Module: Remote Exception
// Description: Structured exception captured by the shim inside the host.
// Purpose: Carry the host's own error identity back to the caller.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! When a wrapped command throws, the shim reports a [`RemoteException`]
//! instead of data. Field names on the wire match the host's exception
//! metadata (`Exception`, `FullyQualifiedErrorId`, `InvocationInfo`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Remote Exception
// ============================================================================

/// Exception raised by a command inside the host runtime.
///
/// # Invariants
/// - All three fields are mandatory strings on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteException {
    /// Exception message.
    #[serde(rename = "Exception")]
    pub exception: String,
    /// Qualified error identifier (for example `RuntimeException`).
    #[serde(rename = "FullyQualifiedErrorId")]
    pub fully_qualified_error_id: String,
    /// Source line, line number, and column offset of the failing statement.
    #[serde(rename = "InvocationInfo")]
    pub invocation_info: String,
}

impl fmt::Display for RemoteException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.fully_qualified_error_id, self.exception)
    }
}
