// crates/pwsh-bridge-core/src/shim/mod.rs
// ============================================================================
// Module: Command Shims
// Description: Shim contract, envelope types, and parse results.
// Purpose: Wrap commands so every run yields one tagged, decodable result.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`Shim`] turns a raw command into a script that always reports back a
//! single result envelope, whether the command succeeds or throws, and later
//! recovers that envelope from the host's output streams. Shims are pluggable;
//! [`DefaultShim`] targets PowerShell and reads only standard output.
//!
//! Invariants:
//! - [`ShimParseResult`] holds exactly one of data or a remote exception.
//! - Parse failures surface as [`ShimError`]; nothing is silently dropped.
//! - Shims are stateless and may be shared across concurrent calls.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::exception::RemoteException;
use crate::identifiers::ExecutionId;
use crate::parameters::ParameterRecord;

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod default;
pub mod sentinel;

pub use default::DefaultShim;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Hard ceiling on the serialization depth of the result envelope.
pub const MAX_SERIALIZATION_DEPTH: u32 = 100;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Output stream of the host process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Primary output stream.
    Stdout,
    /// Error output stream.
    Stderr,
}

impl StreamKind {
    /// Returns a stable label for the stream.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while preparing a shim or parsing its output.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShimError {
    /// A stream the shim requires was not captured.
    #[error("missing expected stream: {0}")]
    MissingStream(StreamKind),
    /// No well-formed sentinel for the execution id was found.
    #[error("result sentinel not found")]
    SentinelNotFound,
    /// Sentinel payload exceeds the size limit.
    #[error("result payload exceeds {limit} bytes (got {actual})")]
    PayloadTooLarge {
        /// Maximum accepted payload size.
        limit: usize,
        /// Actual payload size.
        actual: usize,
    },
    /// Payload is not valid base64-encoded UTF-8 JSON.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    /// Decoded JSON does not have the `{success, data}` envelope shape.
    #[error("could not decode shim output: {0}")]
    EnvelopeShape(String),
    /// Failure envelope does not carry a well-formed remote exception.
    #[error("could not decode exception from shim output: {0}")]
    ExceptionShape(String),
    /// Parameters or the result envelope could not be encoded.
    #[error("shim encoding failed: {0}")]
    Encode(String),
}

// ============================================================================
// SECTION: Shim Types
// ============================================================================

/// Options passed from the calling layer to [`Shim::prepare`].
///
/// Defaults are owned by the caller; the shim applies them as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShimOptions {
    /// Expose each parameter as its own variable next to the parameter object.
    pub expand_parameters: bool,
    /// Serialization depth applied to the command's own output.
    pub result_serialization_depth: u32,
}

impl ShimOptions {
    /// Returns the depth used to serialize the whole envelope.
    ///
    /// One level is added for the `{success, data}` wrapper, capped at
    /// [`MAX_SERIALIZATION_DEPTH`].
    #[must_use]
    pub const fn envelope_depth(&self) -> u32 {
        let depth = self.result_serialization_depth.saturating_add(1);
        if depth > MAX_SERIALIZATION_DEPTH { MAX_SERIALIZATION_DEPTH } else { depth }
    }
}

/// Output streams captured from the host for one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapturedStreams<'a> {
    /// Primary output stream, when captured.
    pub stdout: Option<&'a str>,
    /// Error output stream, when captured.
    pub stderr: Option<&'a str>,
}

impl<'a> CapturedStreams<'a> {
    /// Returns the requested stream or [`ShimError::MissingStream`].
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::MissingStream`] when the stream was not captured.
    pub fn require(&self, kind: StreamKind) -> Result<&'a str, ShimError> {
        let stream = match kind {
            StreamKind::Stdout => self.stdout,
            StreamKind::Stderr => self.stderr,
        };
        match stream {
            Some(text) => Ok(text),
            None => Err(ShimError::MissingStream(kind)),
        }
    }
}

/// Result envelope emitted by the shim inside the host.
///
/// # Invariants
/// - On failure `data` holds the remote exception as its first element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShimOutput {
    /// Whether the command completed without raising.
    pub success: bool,
    /// Values emitted by the command, or the exception on failure.
    pub data: Vec<Value>,
}

impl ShimOutput {
    /// Builds a success envelope from the command's emitted values.
    #[must_use]
    pub const fn success(data: Vec<Value>) -> Self {
        Self {
            success: true,
            data,
        }
    }

    /// Builds a failure envelope carrying a remote exception.
    #[must_use]
    pub fn failure(exception: &RemoteException) -> Self {
        Self {
            success: false,
            data: vec![json!({
                "Exception": exception.exception,
                "FullyQualifiedErrorId": exception.fully_qualified_error_id,
                "InvocationInfo": exception.invocation_info,
            })],
        }
    }
}

/// Decoded outcome of a shimmed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShimParseResult {
    /// Values captured from the command, still wrapped in their sequence.
    Data(Value),
    /// Exception raised by the command inside the host.
    Error(RemoteException),
}

// ============================================================================
// SECTION: Shim Trait
// ============================================================================

/// Wraps commands and recovers their results.
pub trait Shim: Send + Sync {
    /// Returns true when [`Shim::parse_result`] needs standard output.
    fn requires_stdout(&self) -> bool;

    /// Returns true when [`Shim::parse_result`] needs standard error.
    fn requires_stderr(&self) -> bool;

    /// Wraps `command` into a script ready for the host.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::Encode`] when the parameters cannot be encoded.
    fn prepare(
        &self,
        id: &ExecutionId,
        command: &str,
        parameters: &ParameterRecord,
        options: &ShimOptions,
    ) -> Result<String, ShimError>;

    /// Recovers the result of a command prepared with the same `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError`] when the output does not contain a well-formed
    /// result for `id`.
    fn parse_result(
        &self,
        id: &ExecutionId,
        streams: CapturedStreams<'_>,
    ) -> Result<ShimParseResult, ShimError>;
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
