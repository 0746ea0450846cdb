// crates/pwsh-bridge-core/src/encoding.rs
// ============================================================================
// Module: Transport Encoding
// Description: Base64 and hex helpers for text crossing the script channel.
// Purpose: Keep quoting hazards out of generated scripts and parsed output.
// Dependencies: base64
// ============================================================================

//! ## Overview
//! All structured data crosses the host boundary as base64 over UTF-8 bytes.
//! Encoding always uses the standard padded alphabet. Decoding accepts the
//! URL-safe characters `-` and `_` as well as missing padding, since host
//! runtimes differ in how they emit base64.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;

use base64::DecodeError;
use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::GeneralPurpose;
use base64::engine::GeneralPurposeConfig;
use base64::engine::general_purpose::STANDARD;

// ============================================================================
// SECTION: Engines
// ============================================================================

/// Standard alphabet engine that tolerates absent or present padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Encodes bytes with the standard padded base64 alphabet.
#[must_use]
pub fn encode_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Encodes text as base64 over its UTF-8 bytes.
#[must_use]
pub fn encode_text(text: &str) -> String {
    encode_bytes(text.as_bytes())
}

/// Encodes bytes as a lowercase hex string.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

/// Decodes standard or URL-safe base64, with or without padding.
///
/// # Errors
///
/// Returns [`DecodeError`] when the input is not valid base64.
pub fn decode_lenient(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    let normalized: Cow<'_, str> = if encoded.contains(['-', '_']) {
        Cow::Owned(encoded.replace('-', "+").replace('_', "/"))
    } else {
        Cow::Borrowed(encoded)
    };
    LENIENT.decode(normalized.as_bytes())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
