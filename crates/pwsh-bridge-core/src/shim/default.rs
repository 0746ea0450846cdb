// crates/pwsh-bridge-core/src/shim/default.rs
// ============================================================================
// Module: Default PowerShell Shim
// Description: Script wrapper that reports results through standard output.
// Purpose: Run arbitrary commands and always emit one tagged result sentinel.
// Dependencies: crate::shim
// ============================================================================

//! ## Overview
//! [`DefaultShim`] defines the command as a local function, runs it inside a
//! `try`/`catch`, and writes the base64 JSON envelope as a sentinel on
//! standard output. Its own bookkeeping is piped to `Out-Null`, so the only
//! shim-originated output is the sentinel line.
//!
//! Invariants:
//! - Parameters enter the script only as a base64 literal.
//! - The envelope depth is [`ShimOptions::envelope_depth`].
//! - Only standard output is required for parsing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use super::CapturedStreams;
use super::Shim;
use super::ShimError;
use super::ShimOptions;
use super::ShimParseResult;
use super::StreamKind;
use super::sentinel::parse_sentinel_output;
use crate::identifiers::ExecutionId;
use crate::parameters::ParameterRecord;

// ============================================================================
// SECTION: Script Fragments
// ============================================================================

/// Opens the outer function and defines the wrapped command.
const SCRIPT_OPEN: &str = "function __pwshBridgeInvoke {\n    . {\n        function __pwshBridgeCommand {\n";

/// Starts decoding the parameter block into `$params`.
const PARAMS_OPEN: &str = "        }\n        try {\n            $params = ([System.Text.Encoding]::UTF8.GetString([System.Convert]::FromBase64String(\"";
/// Ends the parameter decode after the block literal.
const PARAMS_CLOSE: &str = "\")) | ConvertFrom-Json)\n";

/// Exposes every parameter as its own variable.
const EXPAND_PARAMETERS: &str = "            $params.PSObject.Properties | ForEach-Object { Set-Variable -Name $_.Name -Value $_.Value }\n";

/// Captures the command outcome into `$__pwshBridgeResult`.
const CAPTURE: &str = concat!(
    "            $__pwshBridgeResult = @{\n",
    "                \"success\" = $true\n",
    "                \"data\"    = @(__pwshBridgeCommand)\n",
    "            }\n",
    "        }\n",
    "        catch {\n",
    "            $__pwshBridgeResult = @{\n",
    "                \"success\" = $false\n",
    "                \"data\"    = @(@{\n",
    "                    \"Exception\" = ($_.Exception.Message)\n",
    "                    \"FullyQualifiedErrorId\" = ($_.FullyQualifiedErrorId)\n",
    "                    \"InvocationInfo\" = (\"$($_.InvocationInfo.Line) (at $($_.InvocationInfo.ScriptLineNumber),$($_.InvocationInfo.OffsetInLine))\")\n",
    "                })\n",
    "            }\n",
    "        }\n",
    "    } | Out-Null\n",
);

// ============================================================================
// SECTION: Default Shim
// ============================================================================

/// PowerShell shim reporting through standard output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultShim;

impl DefaultShim {
    /// Creates the default shim.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Shim for DefaultShim {
    fn requires_stdout(&self) -> bool {
        true
    }

    fn requires_stderr(&self) -> bool {
        false
    }

    fn prepare(
        &self,
        id: &ExecutionId,
        command: &str,
        parameters: &ParameterRecord,
        options: &ShimOptions,
    ) -> Result<String, ShimError> {
        let block = parameters.encode().map_err(|err| ShimError::Encode(err.to_string()))?;
        let mut script = String::with_capacity(command.len() + block.len() + 1024);
        script.push_str(SCRIPT_OPEN);
        script.push_str(command);
        script.push('\n');
        script.push_str(PARAMS_OPEN);
        script.push_str(&block);
        script.push_str(PARAMS_CLOSE);
        if options.expand_parameters {
            script.push_str(EXPAND_PARAMETERS);
        }
        script.push_str(CAPTURE);
        let _ = writeln!(
            script,
            "    Write-Output \"{{{{{id}=$([System.Convert]::ToBase64String([System.Text.Encoding]::UTF8.GetBytes((ConvertTo-Json $__pwshBridgeResult -Depth {depth} -Compress))))}}}}\"",
            depth = options.envelope_depth(),
        );
        script.push_str("}; __pwshBridgeInvoke\n");
        Ok(script)
    }

    fn parse_result(
        &self,
        id: &ExecutionId,
        streams: CapturedStreams<'_>,
    ) -> Result<ShimParseResult, ShimError> {
        let stdout = streams.require(StreamKind::Stdout)?;
        parse_sentinel_output(id, stdout)
    }
}
