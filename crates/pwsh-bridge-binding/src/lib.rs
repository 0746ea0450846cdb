// crates/pwsh-bridge-binding/src/lib.rs
// ============================================================================
// Module: PowerShell Bridge Binding Library
// Description: Typed call orchestration over a PowerShell host.
// Purpose: Bind command text to typed results with validation and auditing.
// Dependencies: async-trait, jsonschema, pwsh-bridge-config, pwsh-bridge-core
// ============================================================================

//! ## Overview
//! A [`Binding`] runs [`CallDescriptor`]s against a [`Host`]:
//! - positional arguments are zipped with the descriptor's parameter names,
//!   validated, and encoded by the core codec,
//! - the active [`pwsh_bridge_core::Shim`] wraps the command and recovers the
//!   tagged result,
//! - remote exceptions become [`RemoteError`], and successful data is selected
//!   with the descriptor's [`TypeGuard`] before being deserialized into the
//!   caller's result type.
//!
//! Every call emits exactly one [`CallAuditEvent`].
//!
//! Invariants:
//! - Arity and parameter errors never reach the host.
//! - A failed remote command is never fed into a type guard.
//! - Calls share no mutable state beyond the host and the audit sink.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod binding;
pub mod descriptor;
pub mod guard;
pub mod host;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::CallAuditEvent;
pub use audit::CallAuditEventParams;
pub use audit::CallAuditSink;
pub use audit::CallOutcome;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::audit_sink_from_config;
pub use binding::Binding;
pub use binding::BindingBuilder;
pub use binding::BindingError;
pub use binding::CallDefaults;
pub use binding::RemoteError;
pub use binding::select_result;
pub use descriptor::Arguments;
pub use descriptor::CallDescriptor;
pub use descriptor::CallDescriptorBuilder;
pub use descriptor::DescriptorError;
pub use guard::GuardError;
pub use guard::SchemaGuard;
pub use guard::SerdeGuard;
pub use guard::Shape;
pub use guard::TypeGuard;
pub use host::Host;
pub use host::HostError;
pub use host::HostOutput;
