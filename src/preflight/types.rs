//! Preflight check types and report.

use crate::error::FatalCheck;
use crate::report::Reporter;

/// How much a failed check matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A failure stops the run before anything is staged.
    Fatal(FatalCheck),
    /// A failure is reported but the run continues.
    Advisory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Fatal check failed - the run will not start.
    Fail,
    /// Advisory check failed - the run may still fail later.
    Warn,
}

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub severity: Severity,
    pub status: CheckStatus,
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str, severity: Severity) -> Self {
        Self {
            name: name.to_string(),
            severity,
            status: CheckStatus::Pass,
            details: None,
        }
    }

    pub fn pass_with(name: &str, severity: Severity, details: &str) -> Self {
        Self {
            details: Some(details.to_string()),
            ..Self::pass(name, severity)
        }
    }

    /// A failed check; its status follows from the severity.
    pub fn failed(name: &str, severity: Severity, details: &str) -> Self {
        let status = match severity {
            Severity::Fatal(_) => CheckStatus::Fail,
            Severity::Advisory => CheckStatus::Warn,
        };
        Self {
            name: name.to_string(),
            severity,
            status,
            details: Some(details.to_string()),
        }
    }

    /// Shorthand for an advisory check from a probe outcome.
    pub fn advisory(name: &str, outcome: Result<String, String>) -> Self {
        match outcome {
            Ok(details) => Self::pass_with(name, Severity::Advisory, &details),
            Err(details) => Self::failed(name, Severity::Advisory, &details),
        }
    }
}

/// Results of all preflight checks.
#[derive(Debug, Clone, Default)]
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Returns true if no fatal check failed.
    pub fn all_passed(&self) -> bool {
        self.first_fatal().is_none()
    }

    /// The first failed fatal check, if any.
    pub fn first_fatal(&self) -> Option<(FatalCheck, &CheckResult)> {
        self.checks.iter().find_map(|c| match (c.severity, c.status) {
            (Severity::Fatal(check), CheckStatus::Fail) => Some((check, c)),
            _ => None,
        })
    }

    /// Count of failed fatal checks.
    pub fn fail_count(&self) -> usize {
        self.count(CheckStatus::Fail)
    }

    /// Count of warnings.
    pub fn warn_count(&self) -> usize {
        self.count(CheckStatus::Warn)
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    /// Write the report through a reporter.
    pub fn print(&self, reporter: &dyn Reporter) {
        reporter.info("=== Preflight Check Results ===");

        for check in &self.checks {
            let (icon, status_str) = match check.status {
                CheckStatus::Pass => ("✓", "PASS"),
                CheckStatus::Fail => ("✗", "FAIL"),
                CheckStatus::Warn => ("⚠", "WARN"),
            };

            let line = match &check.details {
                Some(details) => format!("  {icon} [{status_str}] {}: {details}", check.name),
                None => format!("  {icon} [{status_str}] {}", check.name),
            };
            match check.status {
                CheckStatus::Pass => reporter.info(&line),
                CheckStatus::Warn => reporter.warning(&line),
                CheckStatus::Fail => reporter.error(&line),
            }
        }

        let total = self.checks.len();
        let passed = self.count(CheckStatus::Pass);
        reporter.info(&format!("Summary: {passed}/{total} passed"));
        if self.fail_count() > 0 {
            reporter.error(&format!(
                "         {} FAILED - the run will not start",
                self.fail_count()
            ));
        }
        if self.warn_count() > 0 {
            reporter.warning(&format!("         {} warnings", self.warn_count()));
        }
    }
}
