//! Shared helpers for the CLI integration tests.
//!
//! Tests run the real binary against a temporary repository, with the
//! external toolchain replaced by shell-script fakes that log their
//! arguments and exit with a chosen code.

// Each integration test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::process::Command;

/// Creates the minimal settings file pair in `root`.
pub fn write_tool_settings(root: &Path, content: &str) {
    fs::write(root.join("modops.env"), content).unwrap();
}

/// Creates `src/Modules/<name>` under `root`.
pub fn make_module(root: &Path, name: &str) {
    fs::create_dir_all(root.join("src").join("Modules").join(name)).unwrap();
}

/// A `Command` for the modops binary, isolated from the caller's
/// resolution environment variables.
pub fn modops(root: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_modops"));
    command
        .arg("--root")
        .arg(root)
        .env_remove("MODOPS_MODULE")
        .env_remove("MODOPS_DB_CONTEXT")
        .env_remove("MODOPS_RID");
    command
}

/// Installs a fake external tool under `<root>/fake-bin` that logs each
/// invocation's arguments and exits with `exit_code`. Returns the
/// directory to prepend to PATH.
#[cfg(unix)]
pub fn install_fake_tool(root: &Path, name: &str, exit_code: i32) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let bin_dir = root.join("fake-bin");
    fs::create_dir_all(&bin_dir).unwrap();
    let log = root.join(format!("{name}-calls.log"));
    let script = format!("#!/bin/sh\necho \"$@\" >> \"{}\"\nexit {exit_code}\n", log.display());
    let path = bin_dir.join(name);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    bin_dir
}

/// PATH value putting the fake tools ahead of the real ones.
#[cfg(unix)]
pub fn fake_path(bin_dir: &Path) -> String {
    format!(
        "{}:{}",
        bin_dir.display(),
        std::env::var("PATH").unwrap_or_default()
    )
}

/// Arguments the fake tool was called with, one line per invocation.
pub fn recorded_calls(root: &Path, name: &str) -> String {
    fs::read_to_string(root.join(format!("{name}-calls.log"))).unwrap_or_default()
}
