//! Input file and work directory checks.

use std::path::Path;

use crate::error::FatalCheck;

use super::types::{CheckResult, Severity};
use super::PreflightInputs;

/// Check the input package, keystore and platform jar exist.
pub fn check_inputs(inputs: &PreflightInputs<'_>) -> Vec<CheckResult> {
    vec![
        check_file(
            "input package",
            inputs.apk,
            Severity::Fatal(FatalCheck::InputPackage),
            "The entered apk does not exist",
        ),
        check_file(
            "keystore",
            &inputs.signing.keystore,
            Severity::Fatal(FatalCheck::Keystore),
            "The entered keystore does not exist",
        ),
        check_file(
            "android.jar",
            &inputs.toolchain.android_jar,
            Severity::Advisory,
            "Platform resource container not found - linking will fail",
        ),
    ]
}

fn check_file(name: &str, path: &Path, severity: Severity, missing: &str) -> CheckResult {
    if path.is_file() {
        CheckResult::pass_with(name, severity, &path.display().to_string())
    } else {
        CheckResult::failed(name, severity, &format!("{missing}: {}", path.display()))
    }
}

/// Check the work root is writable, creating it if needed.
pub fn check_work_root(work_root: &Path) -> CheckResult {
    let name = "work directory writable";

    if let Err(e) = std::fs::create_dir_all(work_root) {
        return CheckResult::failed(
            name,
            Severity::Advisory,
            &format!("Cannot create {}: {}", work_root.display(), e),
        );
    }

    let test_file = work_root.join(".preflight-test");
    match std::fs::write(&test_file, "test") {
        Ok(()) => {
            let _ = std::fs::remove_file(&test_file);
            CheckResult::pass_with(name, Severity::Advisory, &work_root.display().to_string())
        }
        Err(e) => CheckResult::failed(
            name,
            Severity::Advisory,
            &format!("Cannot write to {}: {}", work_root.display(), e),
        ),
    }
}
