// crates/pwsh-bridge-binding/src/guard.rs
// ============================================================================
// Module: Result Type Guards
// Description: Predicates deciding whether decoded data fits a call's result.
// Purpose: Validate host output before it is handed to typed callers.
// Dependencies: jsonschema, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`TypeGuard`] answers one question: does this JSON value have the shape
//! the caller expects? Guards come in four forms:
//! - closures over `&Value`,
//! - [`Shape`], a closed tagged union of expected shapes,
//! - [`SchemaGuard`], a compiled JSON Schema,
//! - [`SerdeGuard`], which accepts a value iff it deserializes into `T`.
//!
//! Invariants:
//! - Guards are pure and may be shared between concurrent calls.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use jsonschema::Validator;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while constructing guards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    /// The JSON Schema failed to compile.
    #[error("invalid result schema: {0}")]
    Schema(String),
}

// ============================================================================
// SECTION: Type Guard Trait
// ============================================================================

/// Predicate over decoded result values.
pub trait TypeGuard: Send + Sync {
    /// Returns true when `value` is acceptable.
    fn matches(&self, value: &Value) -> bool;
}

impl<F> TypeGuard for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn matches(&self, value: &Value) -> bool {
        self(value)
    }
}

// ============================================================================
// SECTION: Shapes
// ============================================================================

/// Expected shape of a result value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Any value.
    Any,
    /// No result: `null` or an empty sequence.
    Void,
    /// Exactly `null`.
    Null,
    /// A string.
    String,
    /// Any number.
    Number,
    /// An integral number.
    Integer,
    /// A boolean.
    Boolean,
    /// A sequence whose elements all match the inner shape.
    Array(Box<Self>),
    /// An object carrying at least the listed fields.
    Object(BTreeMap<String, Self>),
    /// Any one of the listed shapes.
    OneOf(Vec<Self>),
}

impl Shape {
    /// Sequence of `element`.
    #[must_use]
    pub fn array_of(element: Self) -> Self {
        Self::Array(Box::new(element))
    }

    /// Object with the given required fields.
    #[must_use]
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Object(fields.into_iter().map(|(name, shape)| (name.into(), shape)).collect())
    }
}

impl TypeGuard for Shape {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Void => match value {
                Value::Null => true,
                Value::Array(items) => items.is_empty(),
                _ => false,
            },
            Self::Null => value.is_null(),
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array(element) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|item| element.matches(item))),
            Self::Object(fields) => value.as_object().is_some_and(|object| {
                fields.iter().all(|(name, shape)| {
                    object.get(name).is_some_and(|field| shape.matches(field))
                })
            }),
            Self::OneOf(shapes) => shapes.iter().any(|shape| shape.matches(value)),
        }
    }
}

// ============================================================================
// SECTION: Schema Guard
// ============================================================================

/// Guard backed by a compiled JSON Schema.
pub struct SchemaGuard {
    /// Compiled validator.
    validator: Validator,
}

impl SchemaGuard {
    /// Compiles `schema` into a guard.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Schema`] when the schema is invalid.
    pub fn new(schema: &Value) -> Result<Self, GuardError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|err| GuardError::Schema(err.to_string()))?;
        Ok(Self {
            validator,
        })
    }
}

impl fmt::Debug for SchemaGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaGuard").finish_non_exhaustive()
    }
}

impl TypeGuard for SchemaGuard {
    fn matches(&self, value: &Value) -> bool {
        self.validator.is_valid(value)
    }
}

// ============================================================================
// SECTION: Serde Guard
// ============================================================================

/// Guard accepting values that deserialize into `T`.
pub struct SerdeGuard<T> {
    /// Target type marker.
    target: PhantomData<fn() -> T>,
}

impl<T> SerdeGuard<T> {
    /// Creates the guard.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            target: PhantomData,
        }
    }
}

impl<T> Default for SerdeGuard<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeGuard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SerdeGuard")
    }
}

impl<T: DeserializeOwned> TypeGuard for SerdeGuard<T> {
    fn matches(&self, value: &Value) -> bool {
        T::deserialize(value).is_ok()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
