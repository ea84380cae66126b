//! The external-process invocation contract.
//!
//! Every task body talks to its external tools through [`ToolCommand`]: a
//! blocking, foreground invocation whose non-zero exit is mapped to a
//! caller-declared failure. Child output streams to the CLI's own stdio
//! unless a call site explicitly opts into discarding it. No retries, no
//! timeouts: a hung tool hangs the CLI.

use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

/// The failure a call site declares for a non-zero child exit.
#[derive(Debug, Clone)]
pub struct Failure {
    pub message: String,
    pub code: i32,
}

impl Failure {
    pub fn new(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

/// Errors raised while invoking an external tool.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The tool could not be started at all.
    #[error("failed to start '{program}' (is it installed and on PATH?): {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The tool ran and exited non-zero.
    #[error("{message}")]
    Step { message: String, code: i32 },
}

impl ProcessError {
    /// The exit code the CLI should propagate for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProcessError::Spawn { .. } => 1,
            ProcessError::Step { code, .. } => *code,
        }
    }
}

/// One external command: program, arguments, working directory, and output
/// handling. Constructed immediately before execution and discarded after.
#[derive(Debug)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    quiet: bool,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            quiet: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Discards the child's output. Only for existence probes where the
    /// output carries no diagnostic value; streaming is the default.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Human-readable rendering of the invocation, for logs.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        if self.quiet {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }
        command
    }

    /// Runs the tool and waits for it to exit.
    ///
    /// A non-zero exit yields `failure`'s message and code, not the
    /// child's own code.
    pub fn run(&self, failure: &Failure) -> Result<(), ProcessError> {
        let status = self.wait()?;
        if status_code(status) == 0 {
            return Ok(());
        }
        Err(ProcessError::Step {
            message: failure.message.clone(),
            code: failure.code,
        })
    }

    /// Runs the tool, propagating the child's own exit code on failure.
    pub fn run_passthrough(&self, message: impl Into<String>) -> Result<(), ProcessError> {
        let status = self.wait()?;
        let code = status_code(status);
        if code == 0 {
            return Ok(());
        }
        Err(ProcessError::Step {
            message: message.into(),
            code,
        })
    }

    /// Runs the tool and captures stdout, for the call sites that read a
    /// tool's structured output. Stderr still streams through.
    pub fn run_capture(&self, failure: &Failure) -> Result<String, ProcessError> {
        debug!("Running (captured): {}", self.display());
        let output = self
            .command()
            .stdout(Stdio::piped())
            .output()
            .map_err(|source| ProcessError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if status_code(output.status) != 0 {
            return Err(ProcessError::Step {
                message: failure.message.clone(),
                code: failure.code,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn wait(&self) -> Result<std::process::ExitStatus, ProcessError> {
        debug!("Running: {}", self.display());
        self.command()
            .status()
            .map_err(|source| ProcessError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

/// Exit code of a finished child; termination by signal counts as failure.
fn status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_failure_names_the_program() {
        let err = ToolCommand::new("modops-test-no-such-tool")
            .run(&Failure::new("should not matter", 9))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
        assert!(err.to_string().contains("modops-test-no-such-tool"));
        assert_eq!(err.exit_code(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_zero_exit_is_success() {
        ToolCommand::new("sh")
            .args(["-c", "exit 0"])
            .run(&Failure::new("unexpected", 3))
            .unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_carries_declared_failure_not_child_code() {
        let err = ToolCommand::new("sh")
            .args(["-c", "exit 7"])
            .quiet()
            .run(&Failure::new("tool blew up", 3))
            .unwrap_err();
        match err {
            ProcessError::Step { message, code } => {
                assert_eq!(message, "tool blew up");
                assert_eq!(code, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_passthrough_propagates_child_code() {
        let err = ToolCommand::new("sh")
            .args(["-c", "exit 7"])
            .quiet()
            .run_passthrough("tool failed")
            .unwrap_err();
        assert_eq!(err.exit_code(), 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_returns_stdout() {
        let out = ToolCommand::new("sh")
            .args(["-c", "echo captured"])
            .run_capture(&Failure::new("unexpected", 1))
            .unwrap();
        assert_eq!(out.trim(), "captured");
    }

    #[test]
    fn test_display_joins_program_and_args() {
        let command = ToolCommand::new("docker").args(["compose", "up", "-d"]);
        assert_eq!(command.display(), "docker compose up -d");
    }
}
