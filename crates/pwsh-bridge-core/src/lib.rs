// crates/pwsh-bridge-core/src/lib.rs
// ============================================================================
// Module: PowerShell Bridge Core Library
// Description: Marshalling protocol for commands executed in a PowerShell host.
// Purpose: Encode parameters, wrap commands, and recover tagged results.
// Dependencies: base64, rand, serde, serde_jcs, serde_json
// ============================================================================

//! ## Overview
//! PowerShell Bridge Core implements the pure half of the bridge protocol:
//! - [`ParameterRecord`] validates and encodes named parameters into a
//!   transport-safe block.
//! - [`ExecutionId`] tags a single invocation so its result can be located in
//!   a shared output stream.
//! - [`Shim`] implementations (the default being [`DefaultShim`]) wrap a raw
//!   command into a self-contained script and parse its tagged output.
//!
//! Invariants:
//! - Nothing in this crate performs I/O; every type is safe to share between
//!   concurrent invocations.
//! - Parse failures are reported as [`ShimError`] values and never produce a
//!   partially populated [`ShimParseResult`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod capture;
pub mod encoding;
pub mod exception;
pub mod identifiers;
pub mod parameters;
pub mod shim;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use capture::RawValue;
pub use capture::UnsupportedKind;
pub use exception::RemoteException;
pub use identifiers::DEFAULT_EXECUTION_ID_LENGTH;
pub use identifiers::ExecutionId;
pub use identifiers::IdError;
pub use identifiers::MAX_EXECUTION_ID_LENGTH;
pub use identifiers::MIN_EXECUTION_ID_LENGTH;
pub use identifiers::random_token;
pub use parameters::HOST_RESERVED_NAMES;
pub use parameters::ParameterError;
pub use parameters::ParameterRecord;
pub use parameters::RESERVED_PARAMETER_NAME;
pub use parameters::SHIM_NAME_PREFIX;
pub use parameters::validate_parameter_name;
pub use parameters::validate_parameters;
pub use shim::CapturedStreams;
pub use shim::DefaultShim;
pub use shim::MAX_SERIALIZATION_DEPTH;
pub use shim::Shim;
pub use shim::ShimError;
pub use shim::ShimOptions;
pub use shim::ShimOutput;
pub use shim::ShimParseResult;
pub use shim::StreamKind;
pub use shim::sentinel::MAX_SENTINEL_PAYLOAD_BYTES;
pub use shim::sentinel::find_sentinel;
pub use shim::sentinel::parse_sentinel_output;
pub use shim::sentinel::render_sentinel;
