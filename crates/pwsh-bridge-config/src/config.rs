// crates/pwsh-bridge-config/src/config.rs
// ============================================================================
// Module: PowerShell Bridge Configuration
// Description: Configuration loading and validation for the bridge.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: pwsh-bridge-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed; a binding never runs with
//! settings that did not validate.
//!
//! Invariants:
//! - [`BridgeConfig::load`] always runs [`BridgeConfig::validate`].
//! - `calls.serialization_depth` never exceeds [`MAX_SERIALIZATION_DEPTH`].
//! - `calls.execution_id_length` is even and inside
//!   [`MIN_CONFIG_EXECUTION_ID_LENGTH`] ..= [`MAX_CONFIG_EXECUTION_ID_LENGTH`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use pwsh_bridge_core::DEFAULT_EXECUTION_ID_LENGTH;
use pwsh_bridge_core::MAX_SERIALIZATION_DEPTH;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "pwsh-bridge.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PWSH_BRIDGE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Smallest execution id length accepted from configuration.
pub const MIN_CONFIG_EXECUTION_ID_LENGTH: usize = 16;
/// Largest execution id length accepted from configuration.
pub const MAX_CONFIG_EXECUTION_ID_LENGTH: usize = 24;
/// Default serialization depth for command results.
pub const DEFAULT_SERIALIZATION_DEPTH: u32 = 2;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Defaults applied to every bound call.
    #[serde(default)]
    pub calls: CallsConfig,
    /// Audit log configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl BridgeConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.calls.validate()?;
        self.audit.validate()
    }
}

/// Call defaults applied when a descriptor does not override them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CallsConfig {
    /// Expose each parameter as its own variable inside the host.
    #[serde(default = "default_expand_parameters")]
    pub expand_parameters: bool,
    /// Serialization depth applied to command results.
    #[serde(default = "default_serialization_depth")]
    pub serialization_depth: u32,
    /// Length of generated execution ids.
    #[serde(default = "default_execution_id_length")]
    pub execution_id_length: usize,
}

impl Default for CallsConfig {
    fn default() -> Self {
        Self {
            expand_parameters: default_expand_parameters(),
            serialization_depth: default_serialization_depth(),
            execution_id_length: default_execution_id_length(),
        }
    }
}

impl CallsConfig {
    /// Validates call defaults.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.serialization_depth > MAX_SERIALIZATION_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "calls.serialization_depth must be at most {MAX_SERIALIZATION_DEPTH}"
            )));
        }
        let length = self.execution_id_length;
        if !(MIN_CONFIG_EXECUTION_ID_LENGTH ..= MAX_CONFIG_EXECUTION_ID_LENGTH).contains(&length) {
            return Err(ConfigError::Invalid(format!(
                "calls.execution_id_length must be within \
                 [{MIN_CONFIG_EXECUTION_ID_LENGTH}, {MAX_CONFIG_EXECUTION_ID_LENGTH}]"
            )));
        }
        if !length.is_multiple_of(2) {
            return Err(ConfigError::Invalid(
                "calls.execution_id_length must be even".to_string(),
            ));
        }
        Ok(())
    }
}

/// Audit log configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Destination for call audit events.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path (JSON lines); required for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (AuditSinkKind::None | AuditSinkKind::Stderr, Some(_)) => Err(ConfigError::Invalid(
                "audit.path is only valid for the file sink".to_string(),
            )),
            (AuditSinkKind::None | AuditSinkKind::Stderr, None) => Ok(()),
        }
    }
}

/// Supported audit sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Audit events are discarded.
    #[default]
    None,
    /// JSON lines written to standard error.
    Stderr,
    /// JSON lines appended to `audit.path`.
    File,
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default for `calls.expand_parameters`.
const fn default_expand_parameters() -> bool {
    true
}

/// Default for `calls.serialization_depth`.
const fn default_serialization_depth() -> u32 {
    DEFAULT_SERIALIZATION_DEPTH
}

/// Default for `calls.execution_id_length`.
const fn default_execution_id_length() -> usize {
    DEFAULT_EXECUTION_ID_LENGTH
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
