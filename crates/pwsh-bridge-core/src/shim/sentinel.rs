// crates/pwsh-bridge-core/src/shim/sentinel.rs
// ============================================================================
// Module: Result Sentinels
// Description: Location and decoding of tagged result envelopes.
// Purpose: Recover exactly one call's result from noisy output streams.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A sentinel is the literal text `{{<id>=<payload>}}`, where the payload is
//! base64 over the JSON result envelope. Host streams may carry arbitrary
//! other text, including sentinels from unrelated calls, so the scan only
//! accepts a token that opens with `{{`, names the exact id, and closes with
//! `}}` right after the payload run.
//!
//! Invariants:
//! - An id never matches as a prefix or suffix of a longer id.
//! - The first well-formed sentinel for the id wins.
//! - Payloads above [`MAX_SENTINEL_PAYLOAD_BYTES`] are rejected before decoding.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use super::ShimError;
use super::ShimOutput;
use super::ShimParseResult;
use crate::encoding::decode_lenient;
use crate::encoding::encode_bytes;
use crate::exception::RemoteException;
use crate::identifiers::ExecutionId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted sentinel payload length in bytes (64 MiB).
pub const MAX_SENTINEL_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;
/// Maximum number of trailing padding characters.
const MAX_PADDING: usize = 3;

// ============================================================================
// SECTION: Scanning
// ============================================================================

/// Returns true for bytes allowed in the payload run.
const fn is_payload_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'/' | b'-' | b'_')
}

/// Finds the first well-formed sentinel for `id` and returns its payload.
///
/// The returned slice excludes the braces and the `<id>=` prefix but keeps
/// any trailing `=` padding.
#[must_use]
pub fn find_sentinel<'a>(id: &ExecutionId, text: &'a str) -> Option<&'a str> {
    let opener = format!("{{{{{id}=");
    for (start, _) in text.match_indices(opener.as_str()) {
        let body_start = start + opener.len();
        let rest = &text.as_bytes()[body_start ..];
        let mut end = rest.iter().take_while(|byte| is_payload_byte(**byte)).count();
        let padding = rest[end ..].iter().take_while(|byte| **byte == b'=').count();
        if padding > MAX_PADDING {
            continue;
        }
        end += padding;
        if rest[end ..].starts_with(b"}}") {
            return Some(&text[body_start .. body_start + end]);
        }
    }
    None
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders `output` as the sentinel a shim emits for `id`.
///
/// # Errors
///
/// Returns [`ShimError::Encode`] when the envelope cannot be serialized.
pub fn render_sentinel(id: &ExecutionId, output: &ShimOutput) -> Result<String, ShimError> {
    let json = serde_json::to_vec(output).map_err(|err| ShimError::Encode(err.to_string()))?;
    Ok(format!("{{{{{id}={}}}}}", encode_bytes(&json)))
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Locates and decodes the result envelope for `id` within `text`.
///
/// Success envelopes yield their data as a JSON array. Failure envelopes
/// yield the remote exception carried as the first data element.
///
/// # Errors
///
/// Returns [`ShimError`] when no sentinel is present or its payload is not a
/// well-formed envelope.
pub fn parse_sentinel_output(id: &ExecutionId, text: &str) -> Result<ShimParseResult, ShimError> {
    let payload = find_sentinel(id, text).ok_or(ShimError::SentinelNotFound)?;
    if payload.len() > MAX_SENTINEL_PAYLOAD_BYTES {
        return Err(ShimError::PayloadTooLarge {
            limit: MAX_SENTINEL_PAYLOAD_BYTES,
            actual: payload.len(),
        });
    }
    let bytes = decode_lenient(payload).map_err(|err| ShimError::MalformedPayload(err.to_string()))?;
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|err| ShimError::MalformedPayload(err.to_string()))?;
    let output: ShimOutput =
        serde_json::from_value(value).map_err(|err| ShimError::EnvelopeShape(err.to_string()))?;
    if output.success {
        return Ok(ShimParseResult::Data(Value::Array(output.data)));
    }
    let first = output
        .data
        .into_iter()
        .next()
        .ok_or_else(|| ShimError::ExceptionShape("failure envelope carries no exception".to_string()))?;
    let exception: RemoteException =
        serde_json::from_value(first).map_err(|err| ShimError::ExceptionShape(err.to_string()))?;
    Ok(ShimParseResult::Error(exception))
}
