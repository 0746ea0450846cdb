// crates/pwsh-bridge-binding/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: In-process PowerShell host emulator for binding tests.
// Purpose: Run wrapped scripts deterministically without a real host.
// Dependencies: pwsh-bridge-binding, pwsh-bridge-core, tokio
// ============================================================================

//! ## Overview
//! [`EmulatorHost`] understands just enough of the default shim's script to
//! act like a host: it recovers the execution id, the command text, and the
//! parameter block, runs a registered Rust handler for the command, and
//! answers with a rendered sentinel. All output goes to one shared
//! transcript, and every call sees the whole transcript on stdout, so
//! sentinels from earlier and concurrent calls are always present.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use pwsh_bridge_binding::Host;
use pwsh_bridge_binding::HostError;
use pwsh_bridge_binding::HostOutput;
use pwsh_bridge_core::ExecutionId;
use pwsh_bridge_core::ParameterRecord;
use pwsh_bridge_core::RemoteException;
use pwsh_bridge_core::ShimOutput;
use pwsh_bridge_core::render_sentinel;
use serde_json::Value;

// ============================================================================
// SECTION: Script Markers
// ============================================================================

const COMMAND_OPEN: &str = "function __pwshBridgeCommand {\n";
const COMMAND_CLOSE: &str = "\n        }\n        try {";
const BLOCK_OPEN: &str = "FromBase64String(\"";
const BLOCK_CLOSE: &str = "\")";
const SENTINEL_OPEN: &str = "Write-Output \"{{";

// ============================================================================
// SECTION: Emulator
// ============================================================================

/// Handler emulating one command.
pub type Handler =
    Box<dyn Fn(&ParameterRecord) -> Result<Vec<Value>, RemoteException> + Send + Sync>;

/// Script as understood by the emulator.
#[derive(Debug, Clone)]
pub struct ParsedScript {
    pub id: ExecutionId,
    pub command: String,
    pub parameters: ParameterRecord,
    pub expanded: bool,
    pub depth: u32,
}

/// Parses a script produced by the default shim.
pub fn parse_script(script: &str) -> ParsedScript {
    let command = between(script, COMMAND_OPEN, COMMAND_CLOSE).to_string();
    let block = between(script, BLOCK_OPEN, BLOCK_CLOSE);
    let id_text = between(script, SENTINEL_OPEN, "=");
    let depth = between(script, "-Depth ", " ").parse().unwrap();
    ParsedScript {
        id: ExecutionId::parse(id_text).unwrap(),
        command,
        parameters: ParameterRecord::decode(block).unwrap(),
        expanded: script.contains("Set-Variable -Name $_.Name"),
        depth,
    }
}

fn between<'a>(text: &'a str, open: &str, close: &str) -> &'a str {
    let start = text.find(open).unwrap() + open.len();
    let end = start + text[start ..].find(close).unwrap();
    &text[start .. end]
}

/// Emulated host sharing one output transcript across calls.
#[derive(Default)]
pub struct EmulatorHost {
    handlers: BTreeMap<String, Handler>,
    transcript: Mutex<String>,
    scripts: Mutex<Vec<ParsedScript>>,
}

impl EmulatorHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for the exact command text.
    pub fn with_command<F>(mut self, command: &str, handler: F) -> Self
    where
        F: Fn(&ParameterRecord) -> Result<Vec<Value>, RemoteException> + Send + Sync + 'static,
    {
        self.handlers.insert(command.to_string(), Box::new(handler));
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Scripts executed so far, in arrival order.
    pub fn scripts(&self) -> Vec<ParsedScript> {
        self.scripts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.scripts.lock().unwrap().len()
    }
}

#[async_trait]
impl Host for EmulatorHost {
    async fn execute(&self, script: &str) -> Result<HostOutput, HostError> {
        if !script.ends_with('\n') {
            return Err(HostError::Execution("script was not terminated".to_string()));
        }
        let parsed = parse_script(script);
        tokio::task::yield_now().await;
        let output = match self.handlers.get(&parsed.command) {
            Some(handler) => match handler(&parsed.parameters) {
                Ok(data) => ShimOutput::success(data),
                Err(exception) => ShimOutput::failure(&exception),
            },
            None => ShimOutput::failure(&RemoteException {
                exception: format!("The term '{}' is not recognized.", parsed.command),
                fully_qualified_error_id: "CommandNotFoundException".to_string(),
                invocation_info: format!("{} (at 1,1)", parsed.command),
            }),
        };
        let sentinel = render_sentinel(&parsed.id, &output)
            .map_err(|err| HostError::Execution(err.to_string()))?;
        self.scripts.lock().unwrap().push(parsed);
        let stdout = {
            let mut transcript = self.transcript.lock().unwrap();
            transcript.push_str("VERBOSE: running command\n");
            transcript.push_str(&sentinel);
            transcript.push('\n');
            transcript.clone()
        };
        tokio::task::yield_now().await;
        Ok(HostOutput::stdout(stdout))
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Reads a numeric parameter.
pub fn number(parameters: &ParameterRecord, name: &str) -> f64 {
    parameters.get(name).and_then(Value::as_f64).unwrap()
}

/// Builds the exception a host raises for division by zero.
pub fn divide_by_zero(command: &str) -> RemoteException {
    RemoteException {
        exception: "Attempted to divide by zero.".to_string(),
        fully_qualified_error_id: "RuntimeException".to_string(),
        invocation_info: format!("{command} (at 1,1)"),
    }
}
