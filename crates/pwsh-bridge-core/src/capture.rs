// crates/pwsh-bridge-core/src/capture.rs
// ============================================================================
// Module: Parameter Capture
// Description: Lossless capture of serializable values into a raw value tree.
// Purpose: Record every kind a caller hands over, including kinds JSON drops.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Callers pass parameters as arbitrary [`serde::Serialize`] values. Converting
//! them straight into [`serde_json::Value`] would silently coerce some kinds
//! (a `NaN` becomes `null`, for instance), so [`RawValue::capture`] runs a
//! dedicated serializer that keeps those kinds visible as
//! [`RawValue::Unsupported`]. Validation in [`crate::parameters`] then rejects
//! them with the offending key and location.
//!
//! Invariants:
//! - Capture never fails; serializer errors are recorded in the tree.
//! - Map keys follow `serde_json` rules: strings, and integers rendered as
//!   strings. Any other key kind marks the whole map unsupported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::Serialize;
use serde::ser;
use serde_json::Number;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Raw Values
// ============================================================================

/// Kinds that cannot be carried faithfully through the JSON transport.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedKind {
    /// Floating point value that is `NaN` or infinite.
    NonFiniteNumber,
    /// 128-bit integer outside the 64-bit range.
    IntegerOutOfRange,
    /// Map whose keys are not strings or integers.
    NonStringKey,
    /// The value's `Serialize` implementation reported an error.
    Unserializable(String),
}

impl UnsupportedKind {
    /// Returns a stable label for error reporting.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NonFiniteNumber => "non-finite number",
            Self::IntegerOutOfRange => "integer out of range",
            Self::NonStringKey => "non-string map key",
            Self::Unserializable(_) => "unserializable",
        }
    }
}

/// Raw value tree captured from a caller-supplied parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Absent value (`None`, unit).
    Null,
    /// Boolean value.
    Bool(bool),
    /// Finite JSON number.
    Number(Number),
    /// String value.
    String(String),
    /// Sequence of values.
    Array(Vec<RawValue>),
    /// Object keyed by string.
    Object(BTreeMap<String, RawValue>),
    /// Value of a kind the transport does not support.
    Unsupported(UnsupportedKind),
}

impl RawValue {
    /// Captures a serializable value without losing unsupported kinds.
    #[must_use]
    pub fn capture<T: Serialize + ?Sized>(value: &T) -> Self {
        value.serialize(RawValueSerializer).unwrap_or_else(|err| {
            Self::Unsupported(UnsupportedKind::Unserializable(err.to_string()))
        })
    }

    /// Returns the kind label used in validation messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Unsupported(kind) => kind.label(),
        }
    }

    /// Returns true for the null value.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => Self::Number(number),
            Value::String(text) => Self::String(text),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(key, value)| (key, Self::from(value))).collect())
            }
        }
    }
}

// ============================================================================
// SECTION: Serializer
// ============================================================================

/// Error raised by a value's own `Serialize` implementation.
#[derive(Debug, Error)]
#[error("{0}")]
struct CaptureError(String);

impl ser::Error for CaptureError {
    fn custom<T: Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

/// Serializer producing [`RawValue`] trees.
struct RawValueSerializer;

/// Converts a signed 128-bit integer when it fits the JSON number range.
fn wide_signed(value: i128) -> RawValue {
    if let Ok(narrow) = i64::try_from(value) {
        return RawValue::Number(Number::from(narrow));
    }
    u64::try_from(value).map_or(RawValue::Unsupported(UnsupportedKind::IntegerOutOfRange), |v| {
        RawValue::Number(Number::from(v))
    })
}

impl ser::Serializer for RawValueSerializer {
    type Ok = RawValue;
    type Error = CaptureError;
    type SerializeSeq = SeqCapture;
    type SerializeTuple = SeqCapture;
    type SerializeTupleStruct = SeqCapture;
    type SerializeTupleVariant = VariantSeqCapture;
    type SerializeMap = MapCapture;
    type SerializeStruct = MapCapture;
    type SerializeStructVariant = VariantMapCapture;

    fn serialize_bool(self, v: bool) -> Result<RawValue, CaptureError> {
        Ok(RawValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<RawValue, CaptureError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<RawValue, CaptureError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<RawValue, CaptureError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<RawValue, CaptureError> {
        Ok(RawValue::Number(Number::from(v)))
    }

    fn serialize_i128(self, v: i128) -> Result<RawValue, CaptureError> {
        Ok(wide_signed(v))
    }

    fn serialize_u8(self, v: u8) -> Result<RawValue, CaptureError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<RawValue, CaptureError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<RawValue, CaptureError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<RawValue, CaptureError> {
        Ok(RawValue::Number(Number::from(v)))
    }

    fn serialize_u128(self, v: u128) -> Result<RawValue, CaptureError> {
        Ok(u64::try_from(v).map_or(RawValue::Unsupported(UnsupportedKind::IntegerOutOfRange), |v| {
            RawValue::Number(Number::from(v))
        }))
    }

    fn serialize_f32(self, v: f32) -> Result<RawValue, CaptureError> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<RawValue, CaptureError> {
        Ok(Number::from_f64(v)
            .map_or(RawValue::Unsupported(UnsupportedKind::NonFiniteNumber), RawValue::Number))
    }

    fn serialize_char(self, v: char) -> Result<RawValue, CaptureError> {
        Ok(RawValue::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<RawValue, CaptureError> {
        Ok(RawValue::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<RawValue, CaptureError> {
        Ok(RawValue::Array(
            v.iter().map(|byte| RawValue::Number(Number::from(u64::from(*byte)))).collect(),
        ))
    }

    fn serialize_none(self) -> Result<RawValue, CaptureError> {
        Ok(RawValue::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<RawValue, CaptureError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<RawValue, CaptureError> {
        Ok(RawValue::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<RawValue, CaptureError> {
        Ok(RawValue::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<RawValue, CaptureError> {
        Ok(RawValue::String(variant.to_owned()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<RawValue, CaptureError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<RawValue, CaptureError> {
        let mut entries = BTreeMap::new();
        entries.insert(variant.to_owned(), RawValue::capture(value));
        Ok(RawValue::Object(entries))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqCapture, CaptureError> {
        Ok(SeqCapture {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqCapture, CaptureError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqCapture, CaptureError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSeqCapture, CaptureError> {
        Ok(VariantSeqCapture {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapCapture, CaptureError> {
        Ok(MapCapture::default())
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapCapture, CaptureError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<VariantMapCapture, CaptureError> {
        Ok(VariantMapCapture {
            variant,
            entries: BTreeMap::new(),
        })
    }
}

// ============================================================================
// SECTION: Compound Captures
// ============================================================================

/// Sequence, tuple, and tuple struct capture.
struct SeqCapture {
    /// Captured elements in order.
    items: Vec<RawValue>,
}

impl ser::SerializeSeq for SeqCapture {
    type Ok = RawValue;
    type Error = CaptureError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        self.items.push(RawValue::capture(value));
        Ok(())
    }

    fn end(self) -> Result<RawValue, CaptureError> {
        Ok(RawValue::Array(self.items))
    }
}

impl ser::SerializeTuple for SeqCapture {
    type Ok = RawValue;
    type Error = CaptureError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<RawValue, CaptureError> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqCapture {
    type Ok = RawValue;
    type Error = CaptureError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<RawValue, CaptureError> {
        ser::SerializeSeq::end(self)
    }
}

/// Tuple variant capture, externally tagged like `serde_json`.
struct VariantSeqCapture {
    /// Variant name used as the object key.
    variant: &'static str,
    /// Captured tuple fields.
    items: Vec<RawValue>,
}

impl ser::SerializeTupleVariant for VariantSeqCapture {
    type Ok = RawValue;
    type Error = CaptureError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        self.items.push(RawValue::capture(value));
        Ok(())
    }

    fn end(self) -> Result<RawValue, CaptureError> {
        let mut entries = BTreeMap::new();
        entries.insert(self.variant.to_owned(), RawValue::Array(self.items));
        Ok(RawValue::Object(entries))
    }
}

/// Map and struct capture.
#[derive(Default)]
struct MapCapture {
    /// Captured entries.
    entries: BTreeMap<String, RawValue>,
    /// Key waiting for its value; `Some(None)` marks an unsupported key.
    pending_key: Option<Option<String>>,
    /// Set once any key could not be represented as a string.
    invalid_key: bool,
}

/// Renders a captured map key the way `serde_json` does.
fn map_key(raw: RawValue) -> Option<String> {
    match raw {
        RawValue::String(text) => Some(text),
        RawValue::Number(number) if !number.is_f64() => Some(number.to_string()),
        RawValue::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

impl ser::SerializeMap for MapCapture {
    type Ok = RawValue;
    type Error = CaptureError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), CaptureError> {
        self.pending_key = Some(map_key(RawValue::capture(key)));
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        match self.pending_key.take() {
            Some(Some(key)) => {
                self.entries.insert(key, RawValue::capture(value));
                Ok(())
            }
            Some(None) => {
                self.invalid_key = true;
                Ok(())
            }
            None => Err(<CaptureError as ser::Error>::custom("map value serialized before key")),
        }
    }

    fn end(self) -> Result<RawValue, CaptureError> {
        if self.invalid_key {
            return Ok(RawValue::Unsupported(UnsupportedKind::NonStringKey));
        }
        Ok(RawValue::Object(self.entries))
    }
}

impl ser::SerializeStruct for MapCapture {
    type Ok = RawValue;
    type Error = CaptureError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CaptureError> {
        self.entries.insert(key.to_owned(), RawValue::capture(value));
        Ok(())
    }

    fn end(self) -> Result<RawValue, CaptureError> {
        ser::SerializeMap::end(self)
    }
}

/// Struct variant capture, externally tagged like `serde_json`.
struct VariantMapCapture {
    /// Variant name used as the object key.
    variant: &'static str,
    /// Captured struct fields.
    entries: BTreeMap<String, RawValue>,
}

impl ser::SerializeStructVariant for VariantMapCapture {
    type Ok = RawValue;
    type Error = CaptureError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CaptureError> {
        self.entries.insert(key.to_owned(), RawValue::capture(value));
        Ok(())
    }

    fn end(self) -> Result<RawValue, CaptureError> {
        let mut outer = BTreeMap::new();
        outer.insert(self.variant.to_owned(), RawValue::Object(self.entries));
        Ok(RawValue::Object(outer))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
