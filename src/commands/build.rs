//! Build command - converts an APK into a signed AAB.

use anyhow::Result;
use std::path::PathBuf;

use apk2aab::config::Config;
use apk2aab::driver::{BuildRequest, Bundler, SplitRequest};
use apk2aab::process::SystemRunner;
use apk2aab::report::TracingReporter;
use apk2aab::timing::format_elapsed;

/// Execute the build command.
pub fn cmd_build(
    config: &Config,
    apk: PathBuf,
    output: PathBuf,
    split_pattern: Option<String>,
) -> Result<()> {
    let request = BuildRequest {
        apk,
        output,
        split: split_pattern.map(|pattern| SplitRequest {
            pattern,
            module_name: config.split_module.clone(),
        }),
    };

    let reporter = TracingReporter;
    let summary = Bundler::new(config, &SystemRunner, &reporter).run(&request)?;

    println!("\n=== Build Complete ===");
    println!("  Output:  {}", summary.output.display());
    println!("  Modules: {}", summary.modules.join(", "));
    if !summary.split_assets.is_empty() {
        println!("  Split:   {} asset(s)", summary.split_assets.len());
    }
    println!("  Size:    {} bytes", summary.size);
    println!("  SHA-256: {}", summary.sha256);
    println!("  Took:    {}", format_elapsed(summary.elapsed));
    Ok(())
}
