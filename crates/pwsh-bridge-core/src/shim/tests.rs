// crates/pwsh-bridge-core/src/shim/tests.rs
// ============================================================================
// Module: Shim Tests
// Description: Unit tests for the default shim and sentinel parsing.
// Purpose: Validate script generation and fail-closed result recovery.
// Dependencies: pwsh-bridge-core
// ============================================================================

//! ## Overview
//! Covers the generated PowerShell script, envelope depth clamping, sentinel
//! scanning against noisy and adversarial output, and every parse failure.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::json;

use super::CapturedStreams;
use super::DefaultShim;
use super::MAX_SERIALIZATION_DEPTH;
use super::Shim;
use super::ShimError;
use super::ShimOptions;
use super::ShimOutput;
use super::ShimParseResult;
use super::StreamKind;
use super::sentinel::MAX_SENTINEL_PAYLOAD_BYTES;
use super::sentinel::find_sentinel;
use super::sentinel::parse_sentinel_output;
use super::sentinel::render_sentinel;
use crate::capture::RawValue;
use crate::encoding::encode_text;
use crate::exception::RemoteException;
use crate::identifiers::ExecutionId;
use crate::parameters::ParameterRecord;
use crate::parameters::validate_parameters;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Success envelope holding `[{firstName: Peter, lastName: Parker}]`.
const PERSON_PAYLOAD: &str = "eyJzdWNjZXNzIjp0cnVlLCAiZGF0YSI6IFt7ICJmaXJzdE5hbWUiOiJQZXRlciIsICJsYXN0TmFtZSI6IlBhcmtlciIgfV19";

/// Failure envelope holding `dummyex` / `dummyid` / `dummyii`.
const EXCEPTION_PAYLOAD: &str = "eyJzdWNjZXNzIjpmYWxzZSwgImRhdGEiOiBbeyAiRXhjZXB0aW9uIjoiZHVtbXlleCIsICJGdWxseVF1YWxpZmllZEVycm9ySWQiOiJkdW1teWlkIiwgIkludm9jYXRpb25JbmZvIjogImR1bW15aWkiIH1dfQ==";

fn id(value: &str) -> ExecutionId {
    ExecutionId::parse(value).unwrap()
}

fn options(depth: u32) -> ShimOptions {
    ShimOptions {
        expand_parameters: true,
        result_serialization_depth: depth,
    }
}

fn stdout(text: &str) -> CapturedStreams<'_> {
    CapturedStreams {
        stdout: Some(text),
        stderr: None,
    }
}

fn parse(execution_id: &ExecutionId, text: &str) -> Result<ShimParseResult, ShimError> {
    DefaultShim::new().parse_result(execution_id, stdout(text))
}

// ============================================================================
// SECTION: Prepare
// ============================================================================

#[test]
fn default_shim_requests_stdout_only() {
    let shim = DefaultShim::new();
    assert!(shim.requires_stdout());
    assert!(!shim.requires_stderr());
}

#[test]
fn prepared_script_contains_command_and_sentinel() {
    let execution_id = id("abc123");
    let script = DefaultShim::new()
        .prepare(&execution_id, "Write-Host \"Hello, World!\"", &ParameterRecord::new(), &options(2))
        .unwrap();
    assert!(script.contains("Write-Host \"Hello, World!\""));
    assert!(script.contains("Write-Output \"{{abc123=$("));
    assert!(script.contains("-Depth 3 -Compress"));
    assert!(script.contains("} | Out-Null"));
    assert!(script.trim_end().ends_with("__pwshBridgeInvoke"));
}

#[test]
fn prepared_script_embeds_parameters_as_base64_only() {
    let record = validate_parameters([(
        "greeting",
        RawValue::String("say \"hi\"\n`$(evil)".to_string()),
    )])
    .unwrap();
    let block = record.encode().unwrap();
    let script = DefaultShim::new().prepare(&id("abc123"), "$greeting", &record, &options(2)).unwrap();
    assert!(script.contains(&format!("FromBase64String(\"{block}\")")));
    assert!(!script.contains("$(evil)"));
}

#[test]
fn expand_parameters_toggles_variable_expansion() {
    let shim = DefaultShim::new();
    let record = ParameterRecord::new();
    let expanded = shim.prepare(&id("abc123"), "1", &record, &options(2)).unwrap();
    assert!(expanded.contains("Set-Variable -Name $_.Name -Value $_.Value"));

    let plain = ShimOptions {
        expand_parameters: false,
        result_serialization_depth: 2,
    };
    let script = shim.prepare(&id("abc123"), "1", &record, &plain).unwrap();
    assert!(!script.contains("Set-Variable"));
    assert!(script.contains("$params = "));
}

#[test]
fn envelope_depth_adds_wrapper_level_and_clamps() {
    assert_eq!(options(0).envelope_depth(), 1);
    assert_eq!(options(2).envelope_depth(), 3);
    assert_eq!(options(99).envelope_depth(), MAX_SERIALIZATION_DEPTH);
    assert_eq!(options(100).envelope_depth(), MAX_SERIALIZATION_DEPTH);
    assert_eq!(options(u32::MAX).envelope_depth(), MAX_SERIALIZATION_DEPTH);

    let script =
        DefaultShim::new().prepare(&id("abc123"), "1", &ParameterRecord::new(), &options(100)).unwrap();
    assert!(script.contains("-Depth 100 -Compress"));
}

// ============================================================================
// SECTION: Parse Result
// ============================================================================

#[test]
fn parses_success_payload() {
    let execution_id = id("idid1");
    let result = parse(&execution_id, &format!("{{{{idid1={PERSON_PAYLOAD}}}}}")).unwrap();
    assert_eq!(
        result,
        ShimParseResult::Data(json!([{ "firstName": "Peter", "lastName": "Parker" }]))
    );
}

#[test]
fn parses_remote_exception_payload() {
    let execution_id = id("idid1");
    let result = parse(&execution_id, &format!("{{{{idid1={EXCEPTION_PAYLOAD}}}}}")).unwrap();
    assert_eq!(
        result,
        ShimParseResult::Error(RemoteException {
            exception: "dummyex".to_string(),
            fully_qualified_error_id: "dummyid".to_string(),
            invocation_info: "dummyii".to_string(),
        })
    );
}

#[test]
fn sentinel_is_found_among_surrounding_output() {
    let execution_id = id("abc123");
    let output = ShimOutput::success(vec![json!("hello")]);
    let text = format!(
        "WARNING: progress\n{{{{other9=AAAA}}}}\nnoise {}\ntrailer\n",
        render_sentinel(&execution_id, &output).unwrap()
    );
    assert_eq!(parse(&execution_id, &text).unwrap(), ShimParseResult::Data(json!(["hello"])));
}

#[test]
fn mismatched_id_is_not_found() {
    let err = parse(&id("aaaaa"), &format!("{{{{idid1={PERSON_PAYLOAD}}}}}")).unwrap_err();
    assert_eq!(err, ShimError::SentinelNotFound);
}

#[test]
fn id_prefix_and_suffix_do_not_match() {
    let output = ShimOutput::success(vec![json!(1)]);
    let longer = render_sentinel(&id("abc123"), &output).unwrap();
    let wrapped = render_sentinel(&id("xabc12"), &output).unwrap();
    let text = format!("{longer}\n{wrapped}");
    assert_eq!(find_sentinel(&id("abc12"), &text), None);
}

#[test]
fn first_well_formed_sentinel_wins() {
    let execution_id = id("abc123");
    let first = render_sentinel(&execution_id, &ShimOutput::success(vec![json!(1)])).unwrap();
    let second = render_sentinel(&execution_id, &ShimOutput::success(vec![json!(2)])).unwrap();
    let text = format!("{{{{abc123=not valid}}}} {first} {second}");
    assert_eq!(parse(&execution_id, &text).unwrap(), ShimParseResult::Data(json!([1])));
}

#[test]
fn excess_padding_is_not_a_sentinel() {
    assert_eq!(find_sentinel(&id("abc123"), "{{abc123=QQ====}}"), None);
    assert_eq!(find_sentinel(&id("abc123"), "{{abc123=QQ==}}"), Some("QQ=="));
}

#[test]
fn malformed_payload_is_reported() {
    let err = parse(&id("idid1"), "{{idid1=zIjp0zIjp0zIjp0}}").unwrap_err();
    assert!(matches!(err, ShimError::MalformedPayload(_)));
}

#[test]
fn truncated_payload_is_reported() {
    let truncated = &PERSON_PAYLOAD[.. PERSON_PAYLOAD.len() - 9];
    let err = parse(&id("idid1"), &format!("{{{{idid1={truncated}}}}}")).unwrap_err();
    assert!(matches!(err, ShimError::MalformedPayload(_)));
}

#[test]
fn missing_stdout_is_reported() {
    let err = DefaultShim::new()
        .parse_result(&id("idid1"), CapturedStreams::default())
        .unwrap_err();
    assert_eq!(err, ShimError::MissingStream(StreamKind::Stdout));
}

#[test]
fn envelope_shape_mismatch_is_reported() {
    for body in [r#"{"success":"yes","data":[]}"#, r#"{"success":true,"data":null}"#, "[1,2]"] {
        let text = format!("{{{{idid1={}}}}}", encode_text(body));
        let err = parse(&id("idid1"), &text).unwrap_err();
        assert!(matches!(err, ShimError::EnvelopeShape(_)), "{body}: {err}");
    }
}

#[test]
fn failure_without_exception_is_reported() {
    let empty = format!("{{{{idid1={}}}}}", encode_text(r#"{"success":false,"data":[]}"#));
    assert!(matches!(parse(&id("idid1"), &empty).unwrap_err(), ShimError::ExceptionShape(_)));

    let partial = encode_text(r#"{"success":false,"data":[{"Exception":"boom"}]}"#);
    let text = format!("{{{{idid1={partial}}}}}");
    assert!(matches!(parse(&id("idid1"), &text).unwrap_err(), ShimError::ExceptionShape(_)));
}

#[test]
fn success_with_empty_data_is_accepted() {
    let text = format!("{{{{idid1={}}}}}", encode_text(r#"{"success":true,"data":[]}"#));
    assert_eq!(parse(&id("idid1"), &text).unwrap(), ShimParseResult::Data(json!([])));
}

#[test]
fn oversized_payload_is_rejected_before_decoding() {
    let payload = "A".repeat(MAX_SENTINEL_PAYLOAD_BYTES + 4);
    let err = parse_sentinel_output(&id("idid1"), &format!("{{{{idid1={payload}}}}}")).unwrap_err();
    assert_eq!(
        err,
        ShimError::PayloadTooLarge {
            limit: MAX_SENTINEL_PAYLOAD_BYTES,
            actual: MAX_SENTINEL_PAYLOAD_BYTES + 4,
        }
    );
}

#[test]
fn rendered_failure_round_trips_through_parser() {
    let exception = RemoteException {
        exception: "Attempted to divide by zero.".to_string(),
        fully_qualified_error_id: "RuntimeException".to_string(),
        invocation_info: "$a / $b (at 3,5)".to_string(),
    };
    let execution_id = id("abc123");
    let text = render_sentinel(&execution_id, &ShimOutput::failure(&exception)).unwrap();
    assert_eq!(parse(&execution_id, &text).unwrap(), ShimParseResult::Error(exception));
}
