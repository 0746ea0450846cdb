// crates/pwsh-bridge-binding/src/audit.rs
// ============================================================================
// Module: Call Audit Logging
// Description: Structured audit events for bound PowerShell calls.
// Purpose: Emit redacted call records without a logging framework dependency.
// Dependencies: pwsh-bridge-config, pwsh-bridge-core, serde, sha2
// ============================================================================

//! ## Overview
//! Every call made through a [`crate::Binding`] produces one
//! [`CallAuditEvent`]. Events carry hashes, counts, and stable labels only;
//! parameter values, host output, and remote messages are never recorded.
//! Sinks write JSON lines so deployments can route them to their preferred
//! pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use pwsh_bridge_config::AuditConfig;
use pwsh_bridge_config::AuditSinkKind;
use pwsh_bridge_core::encoding::hex_encode;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Call outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    /// The call returned a typed result.
    Ok,
    /// The call failed.
    Error,
}

/// Audit event for a single call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Execution id, when one was generated.
    pub execution_id: Option<String>,
    /// SHA-256 of the raw command text (lowercase hex).
    pub command_hash: String,
    /// Number of parameters sent to the host.
    pub parameter_count: usize,
    /// Size of the wrapped script in bytes; zero when nothing was sent.
    pub script_bytes: usize,
    /// Call outcome.
    pub outcome: CallOutcome,
    /// Stable error label when the call failed.
    pub error_kind: Option<&'static str>,
    /// Remote qualified error id when the command raised.
    pub remote_error_id: Option<String>,
    /// Wall-clock call duration in milliseconds.
    pub duration_ms: u128,
}

/// Inputs required to construct a call audit event.
pub struct CallAuditEventParams {
    /// Execution id, when one was generated.
    pub execution_id: Option<String>,
    /// Raw command text; only its hash is kept.
    pub command: String,
    /// Number of parameters sent to the host.
    pub parameter_count: usize,
    /// Size of the wrapped script in bytes.
    pub script_bytes: usize,
    /// Stable error label when the call failed.
    pub error_kind: Option<&'static str>,
    /// Remote qualified error id when the command raised.
    pub remote_error_id: Option<String>,
    /// Wall-clock call duration in milliseconds.
    pub duration_ms: u128,
}

impl CallAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: CallAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let outcome = if params.error_kind.is_some() { CallOutcome::Error } else { CallOutcome::Ok };
        Self {
            event: "pwsh_call",
            timestamp_ms,
            execution_id: params.execution_id,
            command_hash: hex_encode(&Sha256::digest(params.command.as_bytes())),
            parameter_count: params.parameter_count,
            script_bytes: params.script_bytes,
            outcome,
            error_kind: params.error_kind,
            remote_error_id: params.remote_error_id,
            duration_ms: params.duration_ms,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for call events.
pub trait CallAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &CallAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl CallAuditSink for StderrAuditSink {
    fn record(&self, event: &CallAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl CallAuditSink for FileAuditSink {
    fn record(&self, event: &CallAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl CallAuditSink for NoopAuditSink {
    fn record(&self, _event: &CallAuditEvent) {}
}

/// Builds the sink selected by `config`.
///
/// # Errors
///
/// Returns an error when the file sink cannot open its log, or when the file
/// sink has no path.
pub fn audit_sink_from_config(config: &AuditConfig) -> io::Result<Arc<dyn CallAuditSink>> {
    match config.sink {
        AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
        AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditSinkKind::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "audit.path is required for the file sink")
            })?;
            Ok(Arc::new(FileAuditSink::new(Path::new(path.trim()))?))
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use std::fs;

    use pwsh_bridge_config::AuditConfig;
    use pwsh_bridge_config::AuditSinkKind;
    use serde_json::Value;

    use super::CallAuditEvent;
    use super::CallAuditEventParams;
    use super::CallAuditSink;
    use super::CallOutcome;
    use super::FileAuditSink;
    use super::audit_sink_from_config;

    fn params(error_kind: Option<&'static str>) -> CallAuditEventParams {
        CallAuditEventParams {
            execution_id: Some("0a1b2c3d4e5f60718293".to_string()),
            command: "Write-Output 'secret'".to_string(),
            parameter_count: 2,
            script_bytes: 512,
            error_kind,
            remote_error_id: None,
            duration_ms: 3,
        }
    }

    #[test]
    fn event_hashes_command_and_classifies_outcome() {
        let event = CallAuditEvent::new(params(None));
        assert_eq!(event.event, "pwsh_call");
        assert_eq!(event.outcome, CallOutcome::Ok);
        assert_eq!(event.command_hash.len(), 64);
        assert!(!event.command_hash.contains("secret"));

        let failed = CallAuditEvent::new(params(Some("remote")));
        assert_eq!(failed.outcome, CallOutcome::Error);
        assert_eq!(failed.command_hash, event.command_hash);
    }

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = FileAuditSink::new(&path).unwrap();
        sink.record(&CallAuditEvent::new(params(None)));
        sink.record(&CallAuditEvent::new(params(Some("host"))));

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> =
            contents.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["outcome"], "ok");
        assert_eq!(lines[1]["outcome"], "error");
        assert_eq!(lines[1]["error_kind"], "host");
        assert!(!contents.contains("secret"));
    }

    #[test]
    fn file_sink_from_config_requires_path() {
        let config = AuditConfig {
            sink: AuditSinkKind::File,
            path: None,
        };
        assert!(audit_sink_from_config(&config).is_err());
        assert!(audit_sink_from_config(&AuditConfig::default()).is_ok());
    }
}
