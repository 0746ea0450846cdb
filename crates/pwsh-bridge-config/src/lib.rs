// crates/pwsh-bridge-config/src/lib.rs
// ============================================================================
// Module: PowerShell Bridge Config Library
// Description: Canonical config model and validation for the bridge.
// Purpose: Single source of truth for pwsh-bridge.toml semantics.
// Dependencies: pwsh-bridge-core, serde, toml
// ============================================================================

//! ## Overview
//! `pwsh-bridge-config` defines the configuration model for the bridge: call
//! defaults applied to every bound command and the audit sink selection.
//! Validation is strict and fail-closed; unknown keys are rejected.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
