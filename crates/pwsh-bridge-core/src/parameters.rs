// crates/pwsh-bridge-core/src/parameters.rs
// ============================================================================
// Module: Parameter Codec
// Description: Validation and transport encoding of named parameters.
// Purpose: Turn caller values into a block that survives the script channel.
// Dependencies: serde, serde_jcs, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`ParameterRecord`] maps parameter names to JSON values. It is produced
//! by [`validate_parameters`] from captured [`RawValue`] trees and encoded as
//! base64 over RFC 8785 canonical JSON, so quotes, newlines, and non-ASCII
//! text never need escaping inside the generated script.
//!
//! Invariants:
//! - Names are identifiers, unique without regard to ASCII case, and never
//!   [`RESERVED_PARAMETER_NAME`], a [`HOST_RESERVED_NAMES`] entry, or a name
//!   starting with [`SHIM_NAME_PREFIX`].
//! - Values contain only JSON data kinds; validation rejects anything
//!   recorded as [`RawValue::Unsupported`] at any depth.
//! - Numbers are held in canonical form, so
//!   `ParameterRecord::decode(&record.encode()?)` yields `record`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Map;
use serde_json::Number;
use serde_json::Value;
use thiserror::Error;

use crate::capture::RawValue;
use crate::encoding::decode_lenient;
use crate::encoding::encode_bytes;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name of the parameter object inside the host; unavailable as a parameter name.
pub const RESERVED_PARAMETER_NAME: &str = "params";
/// Maximum parameter name length in characters.
pub const MAX_PARAMETER_NAME_LENGTH: usize = 128;
/// Prefix of the shim's own functions and variables.
pub const SHIM_NAME_PREFIX: &str = "__pwshBridge";

/// Automatic and constant host variables a parameter must not shadow.
///
/// Compared without regard to ASCII case, as the host does.
pub const HOST_RESERVED_NAMES: &[&str] = &[
    "_",
    "args",
    "ConsoleFileName",
    "EnabledExperimentalFeatures",
    "Error",
    "ErrorView",
    "Event",
    "EventArgs",
    "EventSubscriber",
    "ExecutionContext",
    "false",
    "foreach",
    "HOME",
    "Host",
    "input",
    "IsCoreCLR",
    "IsLinux",
    "IsMacOS",
    "IsWindows",
    "LASTEXITCODE",
    "Matches",
    "MyInvocation",
    "NestedPromptLevel",
    "null",
    "PID",
    "PROFILE",
    "PSBoundParameters",
    "PSCmdlet",
    "PSCommandPath",
    "PSCulture",
    "PSDebugContext",
    "PSEdition",
    "PSHOME",
    "PSItem",
    "PSScriptRoot",
    "PSSenderInfo",
    "PSUICulture",
    "PSVersionTable",
    "PWD",
    "Sender",
    "ShellId",
    "StackTrace",
    "switch",
    "this",
    "true",
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while validating or encoding parameters.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    /// A value (or a nested part of it) is not a transportable data kind.
    #[error("parameter {location} was of invalid type '{kind}'")]
    InvalidKind {
        /// Offending parameter name.
        name: String,
        /// Index when the offending value sits inside a top-level sequence.
        index: Option<usize>,
        /// Full location, e.g. `friends[2]` or `person.address.zip`.
        location: String,
        /// Kind label of the offending value.
        kind: &'static str,
    },
    /// Parameter name is not usable inside the host.
    #[error("invalid parameter name '{name}': {reason}")]
    InvalidName {
        /// Rejected name.
        name: String,
        /// Rejection reason.
        reason: &'static str,
    },
    /// Parameter name appears more than once.
    #[error("duplicate parameter name: {0}")]
    DuplicateName(String),
    /// Canonical JSON serialization failed.
    #[error("parameter encoding failed: {0}")]
    Encode(String),
    /// Encoded block could not be decoded.
    #[error("parameter decoding failed: {0}")]
    Decode(String),
}

// ============================================================================
// SECTION: Name Validation
// ============================================================================

/// Validates a single parameter name.
///
/// # Errors
///
/// Returns [`ParameterError::InvalidName`] when the name is not a usable
/// identifier.
pub fn validate_parameter_name(name: &str) -> Result<(), ParameterError> {
    let reject = |reason| {
        Err(ParameterError::InvalidName {
            name: name.to_string(),
            reason,
        })
    };
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return reject("must not be empty");
    };
    if name.len() > MAX_PARAMETER_NAME_LENGTH {
        return reject("exceeds maximum length");
    }
    if !(first.is_ascii_alphabetic() || first == '_')
        || !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        return reject("must be an identifier");
    }
    if name.eq_ignore_ascii_case(RESERVED_PARAMETER_NAME) {
        return reject("reserved for the parameter object");
    }
    if HOST_RESERVED_NAMES.iter().any(|reserved| name.eq_ignore_ascii_case(reserved)) {
        return reject("reserved by the host");
    }
    if name
        .get(.. SHIM_NAME_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(SHIM_NAME_PREFIX))
    {
        return reject("reserved for the shim");
    }
    Ok(())
}

/// Tracks names already seen, case-insensitively.
#[derive(Default)]
struct NameSet(BTreeSet<String>);

impl NameSet {
    /// Validates and records a name.
    fn admit(&mut self, name: &str) -> Result<(), ParameterError> {
        validate_parameter_name(name)?;
        if !self.0.insert(name.to_ascii_lowercase()) {
            return Err(ParameterError::DuplicateName(name.to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Value Validation
// ============================================================================

/// Path segment used to report nested violations.
enum Segment {
    /// Sequence element.
    Index(usize),
    /// Object field.
    Field(String),
}

/// Unsupported kind found while converting a raw value.
struct Violation {
    /// Segments from the offending value outward.
    segments: Vec<Segment>,
    /// Kind label of the offending value.
    kind: &'static str,
}

impl Violation {
    /// Records the enclosing segment while unwinding.
    fn within(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Converts the violation into an error naming the parameter.
    fn into_error(self, name: &str) -> ParameterError {
        let index = match self.segments.last() {
            Some(Segment::Index(index)) => Some(*index),
            _ => None,
        };
        let mut location = name.to_string();
        for segment in self.segments.iter().rev() {
            match segment {
                Segment::Index(index) => {
                    let _ = write!(location, "[{index}]");
                }
                Segment::Field(field) => {
                    location.push('.');
                    location.push_str(field);
                }
            }
        }
        ParameterError::InvalidKind {
            name: name.to_string(),
            index,
            location,
            kind: self.kind,
        }
    }
}

/// Rewrites a float into the number its canonical JSON text reads back as.
///
/// Canonical JSON prints integral floats without a fraction (`1.0` as `1`,
/// `-0.0` as `0`), so they decode as integers.
fn canonical_number(number: Number) -> Number {
    if !number.is_f64() {
        return number;
    }
    serde_jcs::to_string(&number)
        .ok()
        .and_then(|text| serde_json::from_str::<Number>(&text).ok())
        .unwrap_or(number)
}

/// Converts a raw value into JSON, failing on the first unsupported kind.
fn into_json(raw: RawValue) -> Result<Value, Violation> {
    match raw {
        RawValue::Null => Ok(Value::Null),
        RawValue::Bool(flag) => Ok(Value::Bool(flag)),
        RawValue::Number(number) => Ok(Value::Number(canonical_number(number))),
        RawValue::String(text) => Ok(Value::String(text)),
        RawValue::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                values.push(into_json(item).map_err(|v| v.within(Segment::Index(index)))?);
            }
            Ok(Value::Array(values))
        }
        RawValue::Object(entries) => {
            let mut map = Map::new();
            for (key, item) in entries {
                match into_json(item) {
                    Ok(value) => {
                        map.insert(key, value);
                    }
                    Err(violation) => return Err(violation.within(Segment::Field(key))),
                }
            }
            Ok(Value::Object(map))
        }
        RawValue::Unsupported(kind) => Err(Violation {
            segments: Vec::new(),
            kind: kind.label(),
        }),
    }
}

/// Validates named raw values and builds a parameter record.
///
/// Null values are accepted as-is. Sequences and objects are checked element
/// by element, so a single unsupported entry fails the whole record.
///
/// # Errors
///
/// Returns [`ParameterError`] naming the first offending parameter.
pub fn validate_parameters<I, K>(parameters: I) -> Result<ParameterRecord, ParameterError>
where
    I: IntoIterator<Item = (K, RawValue)>,
    K: Into<String>,
{
    let mut names = NameSet::default();
    let mut values = BTreeMap::new();
    for (name, raw) in parameters {
        let name = name.into();
        names.admit(&name)?;
        let value = into_json(raw).map_err(|violation| violation.into_error(&name))?;
        values.insert(name, value);
    }
    Ok(ParameterRecord {
        values,
    })
}

// ============================================================================
// SECTION: Parameter Record
// ============================================================================

/// Validated mapping from parameter name to JSON value.
///
/// # Invariants
/// - Produced only by [`validate_parameters`] or [`ParameterRecord::decode`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParameterRecord {
    /// Values keyed by parameter name.
    values: BTreeMap<String, Value>,
}

impl ParameterRecord {
    /// Creates an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the record has no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Iterates parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Encodes the record as base64 over canonical JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::Encode`] when canonicalization fails.
    pub fn encode(&self) -> Result<String, ParameterError> {
        let bytes = serde_jcs::to_vec(&self.values)
            .map_err(|err| ParameterError::Encode(err.to_string()))?;
        Ok(encode_bytes(&bytes))
    }

    /// Decodes a block produced by [`ParameterRecord::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::Decode`] for malformed blocks and name errors
    /// for records that violate the naming rules.
    pub fn decode(block: &str) -> Result<Self, ParameterError> {
        let bytes = decode_lenient(block).map_err(|err| ParameterError::Decode(err.to_string()))?;
        let values: BTreeMap<String, Value> =
            serde_json::from_slice(&bytes).map_err(|err| ParameterError::Decode(err.to_string()))?;
        let mut names = NameSet::default();
        for name in values.keys() {
            names.admit(name)?;
        }
        Ok(Self {
            values,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
