//! External tool probes.

use std::path::Path;

use crate::process::{self, CommandResult, CommandSpec, ProcessRunner};

use super::types::CheckResult;
use super::PreflightInputs;

/// Probe every external tool. All probes are advisory.
pub fn check_host_tools(inputs: &PreflightInputs<'_>, runner: &dyn ProcessRunner) -> Vec<CheckResult> {
    let tools = inputs.toolchain;
    let mut results = Vec::new();

    results.push(CheckResult::advisory(
        "java",
        probe(runner, &tools.probe_java()),
    ));
    results.push(CheckResult::advisory(
        "keystore entry",
        probe(runner, &tools.probe_keystore(inputs.signing)),
    ));
    results.push(CheckResult::advisory(
        "apktool",
        probe(runner, &tools.probe_apktool()),
    ));

    #[cfg(unix)]
    if tools.aapt2.is_file() {
        results.push(CheckResult::advisory(
            "aapt2 executable",
            ensure_executable(&tools.aapt2),
        ));
    }
    results.push(CheckResult::advisory(
        "aapt2",
        probe(runner, &tools.probe_aapt2()),
    ));

    results.push(CheckResult::advisory(
        "bundletool",
        probe(runner, &tools.probe_bundletool()),
    ));
    results.push(CheckResult::advisory(
        "jarsigner",
        locate(&tools.jarsigner),
    ));

    results
}

/// Run a version probe and keep the first line it printed.
fn probe(runner: &dyn ProcessRunner, spec: &CommandSpec) -> Result<String, String> {
    match runner.run(spec) {
        Ok(result) if result.success() => Ok(first_line(&result)),
        Ok(result) => Err(format!(
            "'{}' exited with {}: {}",
            spec,
            result.code,
            result.stderr_trimmed().lines().next().unwrap_or("no output")
        )),
        Err(e) => Err(e.to_string()),
    }
}

/// `java -version` prints to stderr, most others to stdout.
fn first_line(result: &CommandResult) -> String {
    let text = if result.stdout_trimmed().is_empty() {
        result.stderr_trimmed()
    } else {
        result.stdout_trimmed()
    };
    let line = text.lines().next().unwrap_or("ok");
    if line.len() > 60 {
        format!("{}...", line.chars().take(57).collect::<String>())
    } else {
        line.to_string()
    }
}

/// Resolve a tool given either as a path or as a name on `PATH`.
fn locate(tool: &Path) -> Result<String, String> {
    if tool.components().count() > 1 || tool.is_absolute() {
        return if tool.is_file() {
            Ok(tool.display().to_string())
        } else {
            Err(format!("Not found: {}", tool.display()))
        };
    }
    process::which(&tool.to_string_lossy())
        .map(|p| p.display().to_string())
        .ok_or_else(|| format!("'{}' not found on PATH", tool.display()))
}

/// Make sure the bundled aapt2 binary carries the executable bit.
#[cfg(unix)]
fn ensure_executable(path: &Path) -> Result<String, String> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path).map_err(|e| format!("Cannot stat: {e}"))?;
    let mode = metadata.permissions().mode();
    if mode & 0o111 != 0 {
        return Ok("executable".to_string());
    }

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode | 0o755))
        .map_err(|e| format!("Authorization failed: {e}"))?;
    Ok("made executable".to_string())
}
