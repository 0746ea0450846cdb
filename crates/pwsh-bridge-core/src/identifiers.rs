// crates/pwsh-bridge-core/src/identifiers.rs
// ============================================================================
// Module: Execution Identifiers
// Description: Random correlation tokens tagging a single invocation.
// Purpose: Locate one call's result sentinel in a shared output stream.
// Dependencies: rand, thiserror
// ============================================================================

//! ## Overview
//! Every invocation is tagged with an [`ExecutionId`]: a random hex token used
//! in the result sentinel `{{<id>=<payload>}}`. Tokens are drawn from the
//! operating system RNG so that concurrent calls sharing one output stream do
//! not collide.
//!
//! Invariants:
//! - Execution ids are ASCII alphanumeric and between
//!   [`MIN_EXECUTION_ID_LENGTH`] and [`MAX_EXECUTION_ID_LENGTH`] characters.
//! - Generated ids are never reused; callers request a fresh id per call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

use crate::encoding::hex_encode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum execution id length in characters.
pub const MIN_EXECUTION_ID_LENGTH: usize = 5;
/// Maximum execution id length in characters.
pub const MAX_EXECUTION_ID_LENGTH: usize = 25;
/// Execution id length used by the orchestrator unless configured otherwise.
pub const DEFAULT_EXECUTION_ID_LENGTH: usize = 20;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when constructing execution ids.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Length is outside the accepted range.
    #[error(
        "execution id length {0} is outside [{MIN_EXECUTION_ID_LENGTH}, {MAX_EXECUTION_ID_LENGTH}]"
    )]
    Length(usize),
    /// Id contains characters other than `[A-Za-z0-9]`.
    #[error("execution id must be ascii alphanumeric")]
    NotAlphanumeric,
}

// ============================================================================
// SECTION: Random Tokens
// ============================================================================

/// Returns a random lowercase hex token of `length` characters.
///
/// The token is built from `length / 2` random bytes, so an odd `length` is
/// rounded down to the nearest even number.
#[must_use]
pub fn random_token(length: usize) -> String {
    let mut bytes = vec![0u8; length / 2];
    OsRng.fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

// ============================================================================
// SECTION: Execution Id
// ============================================================================

/// Correlation token for a single invocation.
///
/// # Invariants
/// - Value is ASCII alphanumeric with a length in `[5, 25]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Generates a fresh random id of `length` characters (rounded down to even).
    ///
    /// # Errors
    ///
    /// Returns [`IdError::Length`] when the rounded length is out of range.
    pub fn generate(length: usize) -> Result<Self, IdError> {
        check_length(length - length % 2)?;
        Ok(Self(random_token(length)))
    }

    /// Wraps an existing token after validating it.
    ///
    /// # Errors
    ///
    /// Returns [`IdError`] when the token is not a valid execution id.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        check_length(value.len())?;
        if !value.bytes().all(|byte| byte.is_ascii_alphanumeric()) {
            return Err(IdError::NotAlphanumeric);
        }
        Ok(Self(value))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ExecutionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ensures an id length is inside the accepted range.
const fn check_length(length: usize) -> Result<(), IdError> {
    if length < MIN_EXECUTION_ID_LENGTH || length > MAX_EXECUTION_ID_LENGTH {
        return Err(IdError::Length(length));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
