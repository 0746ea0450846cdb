// crates/pwsh-bridge-binding/src/binding.rs
// ============================================================================
// Module: Call Orchestration
// Description: Runs call descriptors against a host and selects typed results.
// Purpose: Tie the codec, shim, host, and result validation into one call.
// Dependencies: pwsh-bridge-config, pwsh-bridge-core, serde, thiserror
// ============================================================================

//! ## Overview
//! [`Binding::call`] performs one invocation:
//! 1. generate a fresh [`ExecutionId`],
//! 2. zip parameter names with arguments and validate the record,
//! 3. wrap the command with the active shim and send it to the host with a
//!    trailing line break,
//! 4. parse the streams the shim requires,
//! 5. raise [`RemoteError`] for remote exceptions, otherwise select the result
//!    with [`select_result`].
//!
//! Invariants:
//! - Arity and parameter errors are returned before the host is contacted.
//! - Remote errors take priority over result validation.
//! - Each call records exactly one audit event and is never retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use pwsh_bridge_config::BridgeConfig;
use pwsh_bridge_config::CallsConfig;
use pwsh_bridge_core::CapturedStreams;
use pwsh_bridge_core::DefaultShim;
use pwsh_bridge_core::ExecutionId;
use pwsh_bridge_core::IdError;
use pwsh_bridge_core::MAX_EXECUTION_ID_LENGTH;
use pwsh_bridge_core::MAX_SERIALIZATION_DEPTH;
use pwsh_bridge_core::MIN_EXECUTION_ID_LENGTH;
use pwsh_bridge_core::ParameterError;
use pwsh_bridge_core::RemoteException;
use pwsh_bridge_core::Shim;
use pwsh_bridge_core::ShimError;
use pwsh_bridge_core::ShimOptions;
use pwsh_bridge_core::ShimParseResult;
use pwsh_bridge_core::validate_parameters;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::audit::CallAuditEvent;
use crate::audit::CallAuditEventParams;
use crate::audit::CallAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::audit_sink_from_config;
use crate::descriptor::Arguments;
use crate::descriptor::CallDescriptor;
use crate::descriptor::DescriptorError;
use crate::guard::TypeGuard;
use crate::host::Host;
use crate::host::HostError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Exception raised by the remote command, surfaced as a Rust error.
///
/// Display text is `<FullyQualifiedErrorId>: <message>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{exception}")]
pub struct RemoteError {
    /// Exception reported by the host.
    exception: RemoteException,
}

impl RemoteError {
    /// Wraps a remote exception.
    #[must_use]
    pub const fn new(exception: RemoteException) -> Self {
        Self {
            exception,
        }
    }

    /// Returns the exception message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.exception.exception
    }

    /// Returns the qualified error identifier.
    #[must_use]
    pub fn fully_qualified_error_id(&self) -> &str {
        &self.exception.fully_qualified_error_id
    }

    /// Returns the invocation context of the failing statement.
    #[must_use]
    pub fn invocation_info(&self) -> &str {
        &self.exception.invocation_info
    }

    /// Returns the wrapped exception.
    #[must_use]
    pub const fn exception(&self) -> &RemoteException {
        &self.exception
    }
}

/// Errors raised by [`Binding`] calls.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum BindingError {
    /// Descriptor or binding settings are invalid.
    #[error("invalid call settings: {0}")]
    Descriptor(#[from] DescriptorError),
    /// Argument count does not match the descriptor's parameter names.
    #[error("expected {expected} arguments, got {actual}")]
    Arity {
        /// Number of declared parameters.
        expected: usize,
        /// Number of supplied arguments.
        actual: usize,
    },
    /// A parameter value failed validation.
    #[error(transparent)]
    Parameters(#[from] ParameterError),
    /// Result could not be recovered from the host output.
    #[error(transparent)]
    Shim(#[from] ShimError),
    /// The host failed to run the script.
    #[error(transparent)]
    Host(#[from] HostError),
    /// The command raised inside the host.
    #[error(transparent)]
    Remote(#[from] RemoteError),
    /// Result data did not satisfy the descriptor's guard.
    #[error("validation of result data failed")]
    ResultType,
    /// Audit sink could not be opened.
    #[error("audit sink unavailable: {0}")]
    Audit(String),
}

impl BindingError {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Descriptor(_) => "descriptor",
            Self::Arity { .. } => "arity",
            Self::Parameters(_) => "parameters",
            Self::Shim(_) => "parse",
            Self::Host(_) => "host",
            Self::Remote(_) => "remote",
            Self::ResultType => "result_type",
            Self::Audit(_) => "audit",
        }
    }
}

impl From<IdError> for BindingError {
    fn from(err: IdError) -> Self {
        Self::Descriptor(DescriptorError::ExecutionId(err))
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Call settings applied when a descriptor does not override them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallDefaults {
    /// Expose each parameter as its own variable inside the host.
    pub expand_parameters: bool,
    /// Serialization depth applied to command results.
    pub serialization_depth: u32,
    /// Length of generated execution ids.
    pub execution_id_length: usize,
}

impl Default for CallDefaults {
    fn default() -> Self {
        Self::from(&CallsConfig::default())
    }
}

impl From<&CallsConfig> for CallDefaults {
    fn from(config: &CallsConfig) -> Self {
        Self {
            expand_parameters: config.expand_parameters,
            serialization_depth: config.serialization_depth,
            execution_id_length: config.execution_id_length,
        }
    }
}

impl CallDefaults {
    /// Validates the defaults.
    fn validate(&self) -> Result<(), DescriptorError> {
        if self.serialization_depth > MAX_SERIALIZATION_DEPTH {
            return Err(DescriptorError::DepthOutOfRange(self.serialization_depth));
        }
        let rounded = self.execution_id_length - self.execution_id_length % 2;
        if !(MIN_EXECUTION_ID_LENGTH ..= MAX_EXECUTION_ID_LENGTH).contains(&rounded) {
            return Err(DescriptorError::ExecutionId(IdError::Length(rounded)));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Binding
// ============================================================================

/// Runs call descriptors against a host.
#[derive(Clone)]
pub struct Binding {
    /// Host executing wrapped scripts.
    host: Arc<dyn Host>,
    /// Shim used unless a descriptor overrides it.
    shim: Arc<dyn Shim>,
    /// Call defaults.
    defaults: CallDefaults,
    /// Audit sink receiving one event per call.
    audit: Arc<dyn CallAuditSink>,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding").field("defaults", &self.defaults).finish_non_exhaustive()
    }
}

impl Binding {
    /// Starts a binding over `host`.
    #[must_use]
    pub fn builder(host: Arc<dyn Host>) -> BindingBuilder {
        BindingBuilder {
            host,
            shim: None,
            defaults: CallDefaults::default(),
            audit: None,
        }
    }

    /// Starts a binding over `host` seeded from `config`.
    ///
    /// Settings applied on the returned builder override the config.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::Audit`] when the configured audit sink cannot
    /// be opened.
    pub fn from_config(
        host: Arc<dyn Host>,
        config: &BridgeConfig,
    ) -> Result<BindingBuilder, BindingError> {
        let audit = audit_sink_from_config(&config.audit)
            .map_err(|err| BindingError::Audit(err.to_string()))?;
        Ok(Self::builder(host).defaults(CallDefaults::from(&config.calls)).audit_sink(audit))
    }

    /// Returns the call defaults.
    #[must_use]
    pub const fn defaults(&self) -> &CallDefaults {
        &self.defaults
    }

    /// Invokes `descriptor` with positional `args`.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError`] when validation, execution, parsing, or result
    /// selection fails, or when the remote command raised.
    pub async fn call<T: DeserializeOwned>(
        &self,
        descriptor: &CallDescriptor<T>,
        args: Arguments,
    ) -> Result<T, BindingError> {
        let started = Instant::now();
        let mut trace = CallTrace::default();
        let result = self.run(descriptor, args, &mut trace).await;
        let (error_kind, remote_error_id) = match &result {
            Ok(_) => (None, None),
            Err(err) => {
                let remote_id = match err {
                    BindingError::Remote(remote) => {
                        Some(remote.fully_qualified_error_id().to_string())
                    }
                    _ => None,
                };
                (Some(err.kind()), remote_id)
            }
        };
        self.audit.record(&CallAuditEvent::new(CallAuditEventParams {
            execution_id: trace.execution_id,
            command: descriptor.command().to_string(),
            parameter_count: trace.parameter_count,
            script_bytes: trace.script_bytes,
            error_kind,
            remote_error_id,
            duration_ms: started.elapsed().as_millis(),
        }));
        result
    }

    /// Runs the call and fills `trace` as it progresses.
    async fn run<T: DeserializeOwned>(
        &self,
        descriptor: &CallDescriptor<T>,
        args: Arguments,
        trace: &mut CallTrace,
    ) -> Result<T, BindingError> {
        let id = ExecutionId::generate(self.defaults.execution_id_length)?;
        trace.execution_id = Some(id.to_string());

        let names = descriptor.parameters();
        if names.len() != args.len() {
            return Err(BindingError::Arity {
                expected: names.len(),
                actual: args.len(),
            });
        }
        let record = validate_parameters(names.iter().cloned().zip(args.into_values()))?;
        trace.parameter_count = record.len();

        let shim = descriptor.shim().unwrap_or(&self.shim);
        let options = ShimOptions {
            expand_parameters: descriptor
                .expand_parameters()
                .unwrap_or(self.defaults.expand_parameters),
            result_serialization_depth: descriptor
                .serialization_depth()
                .unwrap_or(self.defaults.serialization_depth),
        };
        let mut script = shim.prepare(&id, descriptor.command(), &record, &options)?;
        script.push('\n');
        trace.script_bytes = script.len();

        let output = self.host.execute(&script).await?;
        let streams = CapturedStreams {
            stdout: output.stdout.as_deref().filter(|_| shim.requires_stdout()),
            stderr: output.stderr.as_deref().filter(|_| shim.requires_stderr()),
        };
        match shim.parse_result(&id, streams)? {
            ShimParseResult::Error(exception) => Err(RemoteError::new(exception).into()),
            ShimParseResult::Data(data) => select_result(descriptor.guard(), &data),
        }
    }
}

/// Progress of a call, recorded for auditing.
#[derive(Default)]
struct CallTrace {
    /// Generated execution id.
    execution_id: Option<String>,
    /// Number of validated parameters.
    parameter_count: usize,
    /// Size of the script sent to the host.
    script_bytes: usize,
}

// ============================================================================
// SECTION: Result Selection
// ============================================================================

/// Selects and deserializes the call result from captured `data`.
///
/// `data` itself is tried first; when it is a sequence, its elements are then
/// tried in emission order. A candidate is selected when `guard` accepts it
/// and it deserializes into `T`.
///
/// # Errors
///
/// Returns [`BindingError::ResultType`] when no candidate is selected.
pub fn select_result<T: DeserializeOwned>(
    guard: &dyn TypeGuard,
    data: &Value,
) -> Result<T, BindingError> {
    if let Some(value) = accept(guard, data) {
        return Ok(value);
    }
    if let Value::Array(items) = data
        && let Some(value) = items.iter().find_map(|item| accept(guard, item))
    {
        return Ok(value);
    }
    Err(BindingError::ResultType)
}

/// Returns the candidate as `T` when the guard accepts it.
fn accept<T: DeserializeOwned>(guard: &dyn TypeGuard, candidate: &Value) -> Option<T> {
    if !guard.matches(candidate) {
        return None;
    }
    T::deserialize(candidate).ok()
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for [`Binding`].
pub struct BindingBuilder {
    /// Host executing wrapped scripts.
    host: Arc<dyn Host>,
    /// Shim override; defaults to [`DefaultShim`].
    shim: Option<Arc<dyn Shim>>,
    /// Call defaults.
    defaults: CallDefaults,
    /// Audit sink; defaults to [`NoopAuditSink`].
    audit: Option<Arc<dyn CallAuditSink>>,
}

impl BindingBuilder {
    /// Sets the shim used by descriptors without their own.
    #[must_use]
    pub fn shim(mut self, shim: Arc<dyn Shim>) -> Self {
        self.shim = Some(shim);
        self
    }

    /// Sets the call defaults.
    #[must_use]
    pub const fn defaults(mut self, defaults: CallDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Sets the audit sink.
    #[must_use]
    pub fn audit_sink(mut self, audit: Arc<dyn CallAuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Validates settings and builds the binding.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::Descriptor`] when the defaults are invalid.
    pub fn build(self) -> Result<Binding, BindingError> {
        self.defaults.validate()?;
        Ok(Binding {
            host: self.host,
            shim: self.shim.unwrap_or_else(|| Arc::new(DefaultShim::new())),
            defaults: self.defaults,
            audit: self.audit.unwrap_or_else(|| Arc::new(NoopAuditSink)),
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
