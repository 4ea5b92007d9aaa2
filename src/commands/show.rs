//! Show command - displays information.

use anyhow::Result;

use apk2aab::config::Config;
use apk2aab::report::TracingReporter;

/// Show target for the show command.
pub enum ShowTarget {
    /// Show configuration (passwords masked)
    Config,
}

/// Execute the show command.
pub fn cmd_show(target: ShowTarget, config: &Config) -> Result<()> {
    match target {
        ShowTarget::Config => config.print(&TracingReporter),
    }
    Ok(())
}
