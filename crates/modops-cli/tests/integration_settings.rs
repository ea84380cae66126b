//! Integration tests for layered settings loading through the binary.

mod common;

use anyhow::Result;
use common::{make_module, modops, write_tool_settings};
use tempfile::TempDir;

#[test]
fn test_missing_mandatory_layer_is_fatal() -> Result<()> {
    let temp = TempDir::new()?;
    make_module(temp.path(), "Alpha");

    let output = modops(temp.path()).args(["build", "-m", "Alpha"]).output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("configuration file not found"),
        "unexpected stderr: {stderr}"
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_tool_layer_overrides_repository_layer() -> Result<()> {
    use common::{fake_path, install_fake_tool, recorded_calls};
    use std::fs;

    let temp = TempDir::new()?;
    fs::write(temp.path().join(".env"), "OUTPUT_DIRECTORY=base-out\n")?;
    write_tool_settings(temp.path(), "OUTPUT_DIRECTORY=tool-out\n");
    fs::write(temp.path().join("App.sln"), "")?;
    let bin = install_fake_tool(temp.path(), "dotnet", 0);

    let output = modops(temp.path())
        .arg("pack")
        .env("PATH", fake_path(&bin))
        .output()?;

    assert!(output.status.success(), "pack should succeed");
    let calls = recorded_calls(temp.path(), "dotnet");
    assert!(calls.contains("pack"), "unexpected calls: {calls}");
    assert!(calls.contains("tool-out"), "override layer must win: {calls}");
    assert!(!calls.contains("base-out"), "base layer must lose: {calls}");
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_missing_required_setting_is_fatal() -> Result<()> {
    use common::{fake_path, install_fake_tool};
    use std::fs;

    let temp = TempDir::new()?;
    write_tool_settings(temp.path(), "UNRELATED=1\n");
    fs::write(temp.path().join("App.sln"), "")?;
    let bin = install_fake_tool(temp.path(), "dotnet", 0);

    let output = modops(temp.path())
        .arg("pack")
        .env("PATH", fake_path(&bin))
        .output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("OUTPUT_DIRECTORY"),
        "unexpected stderr: {stderr}"
    );
    Ok(())
}
