// crates/pwsh-bridge-binding/src/descriptor.rs
// ============================================================================
// Module: Call Descriptors
// Description: Declarative binding of command text to parameters and results.
// Purpose: Describe a bound operation once and invoke it many times.
// Dependencies: pwsh-bridge-core, serde, thiserror
// ============================================================================

//! ## Overview
//! A [`CallDescriptor`] fixes everything about a bound operation except its
//! arguments: the command text, the ordered parameter names, the result guard,
//! and optional per-call overrides of the binding defaults. Descriptors are
//! built once through [`CallDescriptor::builder`] and validated up front, so
//! argument lists are the only input checked per call.
//!
//! Invariants:
//! - Parameter names are valid, unique, and listed in positional order.
//! - A serialization depth override never exceeds [`MAX_SERIALIZATION_DEPTH`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use pwsh_bridge_core::IdError;
use pwsh_bridge_core::MAX_SERIALIZATION_DEPTH;
use pwsh_bridge_core::ParameterError;
use pwsh_bridge_core::RawValue;
use pwsh_bridge_core::Shim;
use pwsh_bridge_core::validate_parameter_name;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::guard::SerdeGuard;
use crate::guard::TypeGuard;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by invalid descriptors or binding settings.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// Command text is empty or whitespace.
    #[error("command text must be non-empty")]
    EmptyCommand,
    /// A parameter name is invalid or repeated.
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    /// Serialization depth exceeds the ceiling.
    #[error("serialization depth {0} exceeds {MAX_SERIALIZATION_DEPTH}")]
    DepthOutOfRange(u32),
    /// Execution id length is not usable.
    #[error(transparent)]
    ExecutionId(#[from] IdError),
}

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Positional arguments for one call, captured from `Serialize` values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    /// Captured values in positional order.
    values: Vec<RawValue>,
}

impl Arguments {
    /// Creates an empty argument list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: Vec::new(),
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg<V: Serialize + ?Sized>(mut self, value: &V) -> Self {
        self.values.push(RawValue::capture(value));
        self
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no arguments were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consumes the list into its captured values.
    #[must_use]
    pub fn into_values(self) -> Vec<RawValue> {
        self.values
    }
}

impl FromIterator<RawValue> for Arguments {
    fn from_iter<I: IntoIterator<Item = RawValue>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// SECTION: Call Descriptor
// ============================================================================

/// Bound operation returning `T`.
pub struct CallDescriptor<T> {
    /// Raw command text placed inside the shim.
    command: String,
    /// Parameter names in positional order.
    parameters: Vec<String>,
    /// Guard used to select the result.
    guard: Arc<dyn TypeGuard>,
    /// Override for parameter expansion.
    expand_parameters: Option<bool>,
    /// Override for result serialization depth.
    serialization_depth: Option<u32>,
    /// Override for the binding's shim.
    shim: Option<Arc<dyn Shim>>,
    /// Result type marker.
    result: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned + 'static> CallDescriptor<T> {
    /// Starts a descriptor for `command`.
    #[must_use]
    pub fn builder(command: impl Into<String>) -> CallDescriptorBuilder<T> {
        CallDescriptorBuilder {
            command: command.into(),
            parameters: Vec::new(),
            guard: None,
            expand_parameters: None,
            serialization_depth: None,
            shim: None,
            result: PhantomData,
        }
    }
}

impl<T> CallDescriptor<T> {
    /// Returns the command text.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns the parameter names in positional order.
    #[must_use]
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Returns the result guard.
    #[must_use]
    pub fn guard(&self) -> &dyn TypeGuard {
        self.guard.as_ref()
    }

    /// Returns the parameter expansion override.
    #[must_use]
    pub const fn expand_parameters(&self) -> Option<bool> {
        self.expand_parameters
    }

    /// Returns the serialization depth override.
    #[must_use]
    pub const fn serialization_depth(&self) -> Option<u32> {
        self.serialization_depth
    }

    /// Returns the shim override.
    #[must_use]
    pub fn shim(&self) -> Option<&Arc<dyn Shim>> {
        self.shim.as_ref()
    }
}

impl<T> Clone for CallDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            command: self.command.clone(),
            parameters: self.parameters.clone(),
            guard: Arc::clone(&self.guard),
            expand_parameters: self.expand_parameters,
            serialization_depth: self.serialization_depth,
            shim: self.shim.clone(),
            result: PhantomData,
        }
    }
}

impl<T> fmt::Debug for CallDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallDescriptor")
            .field("command", &self.command)
            .field("parameters", &self.parameters)
            .field("expand_parameters", &self.expand_parameters)
            .field("serialization_depth", &self.serialization_depth)
            .field("shim_override", &self.shim.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for [`CallDescriptor`].
pub struct CallDescriptorBuilder<T> {
    /// Raw command text.
    command: String,
    /// Parameter names in positional order.
    parameters: Vec<String>,
    /// Explicit guard, if any.
    guard: Option<Arc<dyn TypeGuard>>,
    /// Override for parameter expansion.
    expand_parameters: Option<bool>,
    /// Override for result serialization depth.
    serialization_depth: Option<u32>,
    /// Override for the binding's shim.
    shim: Option<Arc<dyn Shim>>,
    /// Result type marker.
    result: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned + 'static> CallDescriptorBuilder<T> {
    /// Appends the next positional parameter name.
    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(name.into());
        self
    }

    /// Appends several positional parameter names.
    #[must_use]
    pub fn parameters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters.extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets the result guard; defaults to [`SerdeGuard<T>`].
    #[must_use]
    pub fn guard(mut self, guard: impl TypeGuard + 'static) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Overrides parameter expansion for this call.
    #[must_use]
    pub const fn expand_parameters(mut self, expand: bool) -> Self {
        self.expand_parameters = Some(expand);
        self
    }

    /// Overrides result serialization depth for this call.
    #[must_use]
    pub const fn serialization_depth(mut self, depth: u32) -> Self {
        self.serialization_depth = Some(depth);
        self
    }

    /// Overrides the binding's shim for this call.
    #[must_use]
    pub fn shim(mut self, shim: Arc<dyn Shim>) -> Self {
        self.shim = Some(shim);
        self
    }

    /// Validates and builds the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the command, parameter names, or
    /// overrides are invalid.
    pub fn build(self) -> Result<CallDescriptor<T>, DescriptorError> {
        if self.command.trim().is_empty() {
            return Err(DescriptorError::EmptyCommand);
        }
        let mut seen = BTreeSet::new();
        for name in &self.parameters {
            validate_parameter_name(name)?;
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(ParameterError::DuplicateName(name.clone()).into());
            }
        }
        if let Some(depth) = self.serialization_depth
            && depth > MAX_SERIALIZATION_DEPTH
        {
            return Err(DescriptorError::DepthOutOfRange(depth));
        }
        let guard = self.guard.unwrap_or_else(|| Arc::new(SerdeGuard::<T>::new()));
        Ok(CallDescriptor {
            command: self.command,
            parameters: self.parameters,
            guard,
            expand_parameters: self.expand_parameters,
            serialization_depth: self.serialization_depth,
            shim: self.shim,
            result: PhantomData,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
