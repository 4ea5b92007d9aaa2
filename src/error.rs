//! Error types for the bundle pipeline.
//!
//! Every stage reports a `(status, message)` pair ([`StageFailure`]); the
//! stage runner wraps it with the stage name into a [`PipelineError`].

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure of a staging filesystem primitive.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("{op} failed for {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{op} failed for {}: {source}", path.display())]
    Archive {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{op} failed for {}: {detail}", path.display())]
    Invalid {
        op: &'static str,
        path: PathBuf,
        detail: String,
    },
}

impl FsError {
    pub(crate) fn io(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn archive(op: &'static str, path: &Path, source: zip::result::ZipError) -> Self {
        Self::Archive {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn invalid(op: &'static str, path: &Path, detail: impl Into<String>) -> Self {
        Self::Invalid {
            op,
            path: path.to_path_buf(),
            detail: detail.into(),
        }
    }
}

/// Failure to read decoded package metadata.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{} not found", .0.display())]
    Missing(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {}: {detail}", path.display())]
    Malformed { path: PathBuf, detail: String },

    #[error("{}: missing field '{field}'", path.display())]
    MissingField { path: PathBuf, field: String },
}

impl ParseError {
    pub(crate) fn malformed(path: &Path, detail: impl ToString) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn missing_field(path: &Path, field: &str) -> Self {
        Self::MissingField {
            path: path.to_path_buf(),
            field: field.to_string(),
        }
    }
}

/// Failure of an external collaborator invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to execute '{program}'. Is it installed? ({source})")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{prefix} (exit code {code}){}", format_stderr(.stderr))]
    Exit {
        prefix: String,
        code: i32,
        stderr: String,
    },
}

fn format_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{stderr}")
    }
}

impl ToolError {
    /// Exit code of the failed tool, `-1` when it never started.
    pub fn code(&self) -> i32 {
        match self {
            Self::Spawn { .. } => -1,
            Self::Exit { code, .. } => *code,
        }
    }
}

/// Failure of the split-module planner.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("invalid split pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid split module name '{name}': {reason}")]
    ModuleName { name: String, reason: String },

    #[error(transparent)]
    Fs(#[from] FsError),
}

impl SplitError {
    pub(crate) fn module_name(name: &str, reason: impl Into<String>) -> Self {
        Self::ModuleName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// The `(status, message)` pair a stage yields when it fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub status: i32,
    pub message: String,
}

impl StageFailure {
    pub fn new(status: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<FsError> for StageFailure {
    fn from(e: FsError) -> Self {
        Self::new(-1, e.to_string())
    }
}

impl From<ParseError> for StageFailure {
    fn from(e: ParseError) -> Self {
        Self::new(-1, e.to_string())
    }
}

impl From<SplitError> for StageFailure {
    fn from(e: SplitError) -> Self {
        Self::new(-1, e.to_string())
    }
}

impl From<ToolError> for StageFailure {
    fn from(e: ToolError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

/// Preflight checks whose failure stops a run before staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalCheck {
    InputPackage,
    Keystore,
}

impl FatalCheck {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::InputPackage => 2,
            Self::Keystore => 3,
        }
    }
}

/// Run-level failure surfaced to the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("preflight failed: {message}")]
    Preflight { check: FatalCheck, message: String },

    #[error("task {stage} execution abnormal status:{status} msg:{message}")]
    Stage {
        stage: String,
        status: i32,
        message: String,
    },
}

impl PipelineError {
    pub fn stage(stage: impl Into<String>, failure: StageFailure) -> Self {
        Self::Stage {
            stage: stage.into(),
            status: failure.status,
            message: failure.message,
        }
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Preflight { check, .. } => check.exit_code(),
            Self::Stage { .. } => 1,
        }
    }

    /// Name of the failed stage, if a stage failed.
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            Self::Stage { stage, .. } => Some(stage),
            Self::Preflight { .. } => None,
        }
    }
}
