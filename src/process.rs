//! Typed external command execution.
//!
//! Every collaborator call is described by a [`CommandSpec`] (program plus an
//! ordered argument list, never a shell string) and executed through a
//! [`ProcessRunner`]. The pipeline only ever talks to the trait, so tests can
//! substitute a runner that fakes the tools.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ToolError;

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code, or -1 if terminated by signal.
    pub code: i32,
    /// Captured stdout as a string.
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

impl CommandResult {
    /// A successful result with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed result with the given exit code and stderr.
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

    /// Get stderr, trimmed of whitespace.
    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }
}

/// Builder describing one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    /// If true, don't fail on non-zero exit.
    allow_fail: bool,
    /// Custom error message prefix.
    error_prefix: Option<String>,
}

impl CommandSpec {
    /// Create a new command builder.
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
            allow_fail: false,
            error_prefix: None,
        }
    }

    /// Create a command whose program is a filesystem path.
    pub fn for_path(program: &Path) -> Self {
        Self::new(program.to_string_lossy())
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

    /// Allow non-zero exit codes without failing.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    /// Set a custom error message prefix.
    pub fn error_msg(mut self, msg: impl AsRef<str>) -> Self {
        self.error_prefix = Some(msg.as_ref().to_string());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn allows_failure(&self) -> bool {
        self.allow_fail
    }

    /// Value following `flag` in the argument list, e.g. `-o <value>`.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Value of a `--flag=value` style argument.
    pub fn inline_value_of(&self, flag: &str) -> Option<&str> {
        let prefix = format!("{flag}=");
        self.args
            .iter()
            .find_map(|a| a.strip_prefix(prefix.as_str()))
    }

    /// Turn a finished result into an error unless failure is allowed.
    pub fn check(&self, result: CommandResult) -> Result<CommandResult, ToolError> {
        if self.allow_fail || result.success() {
            return Ok(result);
        }
        let prefix = self
            .error_prefix
            .clone()
            .unwrap_or_else(|| format!("'{}' failed", self.program));
        Err(ToolError::Exit {
            prefix,
            code: result.code,
            stderr: result.stderr_trimmed().to_string(),
        })
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Executes command specifications.
pub trait ProcessRunner {
    /// Run the command to completion, capturing its output.
    ///
    /// Implementations must honour [`CommandSpec::check`] so a non-zero exit
    /// becomes a [`ToolError`] unless the spec allows failure.
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult, ToolError>;
}

impl<T: ProcessRunner + ?Sized> ProcessRunner for &T {
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult, ToolError> {
        (**self).run(spec)
    }
}

/// Runs commands as real child processes, blocking until they exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult, ToolError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);

        let output = cmd.output().map_err(|source| ToolError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let result = CommandResult {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        spec.check(result)
    }
}

/// Check if a program exists in PATH.
///
/// Returns the full path if found, None otherwise.
pub fn which(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}
