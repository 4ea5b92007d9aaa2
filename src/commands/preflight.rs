//! Preflight command - runs preflight checks.

use anyhow::Result;
use std::path::PathBuf;

use apk2aab::config::Config;
use apk2aab::driver::{BuildRequest, Bundler};
use apk2aab::error::PipelineError;
use apk2aab::process::SystemRunner;
use apk2aab::report::TracingReporter;

/// Execute the preflight command.
pub fn cmd_preflight(config: &Config, apk: PathBuf, output: PathBuf) -> Result<()> {
    let request = BuildRequest {
        apk,
        output,
        split: None,
    };
    let reporter = TracingReporter;
    let report = Bundler::new(config, &SystemRunner, &reporter).preflight(&request);
    report.print(&reporter);

    if let Some((check, result)) = report.first_fatal() {
        return Err(PipelineError::Preflight {
            check,
            message: result.details.clone().unwrap_or_else(|| result.name.clone()),
        }
        .into());
    }
    if report.warn_count() > 0 {
        println!("Some advisory checks failed. The conversion may still fail later.");
    }
    Ok(())
}
