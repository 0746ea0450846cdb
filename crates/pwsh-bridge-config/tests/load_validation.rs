//! Config load validation tests for pwsh-bridge-config.
// crates/pwsh-bridge-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding, schema).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;

use pwsh_bridge_config::AuditSinkKind;
use pwsh_bridge_config::BridgeConfig;
use pwsh_bridge_config::ConfigError;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<BridgeConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

fn write_config(contents: &str) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(contents.as_bytes()).map_err(|err| err.to_string())?;
    Ok(file)
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    let path = Path::new(&long_path);
    assert_invalid(BridgeConfig::load(Some(path)), "config path exceeds max length")?;
    Ok(())
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(BridgeConfig::load(Some(path)), "config path component too long")?;
    Ok(())
}

#[test]
fn load_reports_missing_file_as_io_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    assert_invalid(BridgeConfig::load(Some(&path)), "config io error")?;
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'#'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(BridgeConfig::load(Some(file.path())), "config file exceeds size limit")?;
    Ok(())
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(BridgeConfig::load(Some(file.path())), "config file must be utf-8")?;
    Ok(())
}

#[test]
fn load_rejects_unknown_fields() -> TestResult {
    let file = write_config("[calls]\nexpand_parameter = false\n")?;
    assert_invalid(BridgeConfig::load(Some(file.path())), "config parse error")?;
    let file = write_config("[server]\nbind = \"127.0.0.1:0\"\n")?;
    assert_invalid(BridgeConfig::load(Some(file.path())), "config parse error")?;
    Ok(())
}

#[test]
fn load_rejects_depth_above_ceiling() -> TestResult {
    let file = write_config("[calls]\nserialization_depth = 101\n")?;
    assert_invalid(BridgeConfig::load(Some(file.path())), "calls.serialization_depth")?;
    Ok(())
}

#[test]
fn load_rejects_odd_execution_id_length() -> TestResult {
    let file = write_config("[calls]\nexecution_id_length = 17\n")?;
    assert_invalid(BridgeConfig::load(Some(file.path())), "must be even")?;
    Ok(())
}

#[test]
fn load_requires_path_for_file_sink() -> TestResult {
    let file = write_config("[audit]\nsink = \"file\"\n")?;
    assert_invalid(BridgeConfig::load(Some(file.path())), "audit.path is required")?;
    let file = write_config("[audit]\nsink = \"stderr\"\npath = \"audit.jsonl\"\n")?;
    assert_invalid(BridgeConfig::load(Some(file.path())), "only valid for the file sink")?;
    Ok(())
}

#[test]
fn load_accepts_full_config() -> TestResult {
    let file = write_config(
        r#"
[calls]
expand_parameters = false
serialization_depth = 5
execution_id_length = 24

[audit]
sink = "file"
path = "logs/pwsh-bridge.jsonl"
"#,
    )?;
    let config = BridgeConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.calls.expand_parameters
        || config.calls.serialization_depth != 5
        || config.calls.execution_id_length != 24
    {
        return Err("unexpected calls section".to_string());
    }
    if config.audit.sink != AuditSinkKind::File
        || config.audit.path.as_deref() != Some("logs/pwsh-bridge.jsonl")
    {
        return Err("unexpected audit section".to_string());
    }
    Ok(())
}
