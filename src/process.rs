//! Centralized command execution with consistent error handling.
//!
//! Every external tool is invoked through a [`Cmd`] argument vector, never a
//! shell string. The machine itself sits behind the [`Host`] trait so the
//! provisioning engine can be driven against a scripted host in tests.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ProvisionError, Result};

/// Result of a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code, or -1 if terminated by signal.
    pub code: i32,
    /// Captured stdout as a string (empty when redirected).
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

impl CommandResult {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the command exited successfully.
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Get stdout, trimmed of whitespace.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// stdout followed by stderr, trimmed.
    pub fn combined_output(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, _) => stderr.to_string(),
            (false, true) => stdout.to_string(),
            (false, false) => format!("{stdout}\n{stderr}"),
        }
    }
}

/// Builder for configuring command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    /// Bytes fed to the child's stdin (interactive confirmations).
    stdin: Option<String>,
    /// Redirect stdout into this existing file or device.
    stdout_to: Option<PathBuf>,
    /// Exit codes treated as success.
    ok_codes: Vec<i32>,
    /// If true, don't fail on non-zero exit.
    allow_fail: bool,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
            stdin: None,
            stdout_to: None,
            ok_codes: vec![0],
            allow_fail: false,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Add a path as an argument.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Feed `input` to the command's stdin.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Write the command's stdout into `path` instead of capturing it.
    ///
    /// The target must already exist; block devices are never created.
    pub fn stdout_to(mut self, path: &Path) -> Self {
        self.stdout_to = Some(path.to_path_buf());
        self
    }

    /// Treat each of `codes` as a successful exit.
    pub fn ok_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.ok_codes = codes.into_iter().collect();
        self
    }

    /// Allow non-zero exit codes without failing.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn stdin_payload(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    pub fn stdout_target(&self) -> Option<&Path> {
        self.stdout_to.as_deref()
    }

    /// Run the command on `host`.
    ///
    /// A non-zero exit fails with [`ProvisionError::Command`] carrying the
    /// command line and its combined output, unless [`Cmd::allow_fail`] is set,
    /// in which case the failure is logged and the result returned.
    pub fn run(self, host: &dyn Host) -> Result<CommandResult> {
        let line = self.to_string();
        debug!(command = %line, "exec");

        let result = host.run(&self).map_err(|source| ProvisionError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !self.ok_codes.contains(&result.code) {
            if self.allow_fail {
                warn!(
                    command = %line,
                    code = result.code,
                    output = %result.combined_output(),
                    "command failed, continuing"
                );
            } else {
                return Err(ProvisionError::Command {
                    command: line,
                    code: result.code,
                    output: result.combined_output(),
                });
            }
        }

        Ok(result)
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        if let Some(target) = &self.stdout_to {
            write!(f, " > {}", target.display())?;
        }
        Ok(())
    }
}

/// The machine being provisioned.
///
/// Every blocking interaction the engine has with the host goes through
/// here: external commands, kernel/proc file reads and settle delays.
pub trait Host {
    /// Execute `cmd` and wait for it to finish.
    fn run(&self, cmd: &Cmd) -> io::Result<CommandResult>;

    /// Read a small text file such as `/proc/mounts`.
    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Block the current thread.
    fn sleep(&self, duration: Duration);
}

/// [`Host`] backed by the local system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl Host for SystemHost {
    fn run(&self, cmd: &Cmd) -> io::Result<CommandResult> {
        let mut command = Command::new(cmd.program());
        command.args(cmd.get_args());
        command.stderr(Stdio::piped());

        command.stdin(if cmd.stdin_payload().is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        match cmd.stdout_target() {
            Some(target) => {
                let file = OpenOptions::new().write(true).open(target)?;
                command.stdout(Stdio::from(file));
            }
            None => {
                command.stdout(Stdio::piped());
            }
        }

        let mut child = command.spawn()?;
        if let Some(input) = cmd.stdin_payload() {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes())?;
            }
        }

        let output = child.wait_with_output()?;
        Ok(CommandResult {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Check if a program exists in PATH.
///
/// Returns the full path if found, None otherwise.
pub fn which(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

// =============================================================================
// Tests
// =============================================================================
