//! Preflight checks run before a conversion starts.
//!
//! Missing input package or keystore stops the run; everything else (tool
//! probes, platform jar, work directory) is advisory.

mod environment;
mod host_tools;
mod types;

use std::path::Path;

use crate::process::ProcessRunner;
use crate::report::Reporter;
use crate::tools::{SigningConfig, Toolchain};

pub use types::{CheckResult, CheckStatus, PreflightReport, Severity};

/// Everything preflight looks at.
#[derive(Debug, Clone, Copy)]
pub struct PreflightInputs<'a> {
    pub apk: &'a Path,
    pub output: &'a Path,
    pub work_root: &'a Path,
    pub toolchain: &'a Toolchain,
    pub signing: &'a SigningConfig,
}

/// Run all preflight checks.
pub fn run_preflight(
    inputs: &PreflightInputs<'_>,
    runner: &dyn ProcessRunner,
    reporter: &dyn Reporter,
) -> PreflightReport {
    let mut checks = Vec::new();

    reporter.info(&format!("[Current system]: {}", std::env::consts::OS));
    reporter.info(&format!("[Input apk]: {}", inputs.apk.display()));
    reporter.info(&format!("[Output aab]: {}", inputs.output.display()));
    reporter.info(&format!(
        "[Sign]: {}, alias: {}",
        inputs.signing.keystore.display(),
        inputs.signing.key_alias
    ));

    reporter.info("Checking inputs...");
    checks.extend(environment::check_inputs(inputs));

    reporter.info("Checking host tools...");
    checks.extend(host_tools::check_host_tools(inputs, runner));

    reporter.info("Checking work directory...");
    checks.push(environment::check_work_root(inputs.work_root));

    PreflightReport { checks }
}
