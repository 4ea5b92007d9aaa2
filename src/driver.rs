//! Bundle & sign driver: the end-to-end APK to AAB conversion.
//!
//! ```text
//! PREFLIGHT -> STAGE -> EXTRACT_METADATA -> RECORD_IDS -> [PLAN_SPLIT]
//!   -> ASSEMBLE_MODULES -> WRITE_COMPRESSION_CONFIG -> BUILD_BUNDLE
//!   -> SIGN -> DELIVER -> TEARDOWN
//! ```
//!
//! Every run owns one [`WorkTree`]; it is removed on every exit path once it
//! has been created.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::assembler::{ModuleAssembler, ModuleSet};
use crate::bundle_config::BundleConfig;
use crate::config::Config;
use crate::error::{FsError, PipelineError, StageFailure};
use crate::metadata::PackageDescriptor;
use crate::preflight::{self, PreflightInputs, PreflightReport};
use crate::process::ProcessRunner;
use crate::public_ids::record_public_ids;
use crate::report::Reporter;
use crate::split::{scaffold_split_module, SplitPlanner};
use crate::stage::{run_stage, run_tolerated};
use crate::staging::{self, WorkTree};
use crate::timing::{format_elapsed, Timer};

/// Carve matching assets into an on-demand module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRequest {
    /// Pattern matched against `/`-separated paths relative to `assets/`.
    pub pattern: String,
    pub module_name: String,
}

/// One conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub apk: PathBuf,
    pub output: PathBuf,
    pub split: Option<SplitRequest>,
}

impl BuildRequest {
    /// The split to perform. A blank pattern means no split module.
    pub fn active_split(&self) -> Option<&SplitRequest> {
        self.split
            .as_ref()
            .filter(|split| !split.pattern.trim().is_empty())
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output: PathBuf,
    /// Module names in assembly order, `base` first.
    pub modules: Vec<String>,
    /// Asset paths moved into the split module.
    pub split_assets: Vec<String>,
    pub size: u64,
    /// Lowercase hex SHA-256 of the delivered bundle.
    pub sha256: String,
    pub elapsed: Duration,
}

/// Drives one conversion through external tools.
pub struct Bundler<'a> {
    config: &'a Config,
    runner: &'a dyn ProcessRunner,
    reporter: &'a dyn Reporter,
}

impl<'a> Bundler<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn ProcessRunner, reporter: &'a dyn Reporter) -> Self {
        Self {
            config,
            runner,
            reporter,
        }
    }

    /// Run preflight only.
    pub fn preflight(&self, request: &BuildRequest) -> PreflightReport {
        let inputs = PreflightInputs {
            apk: &request.apk,
            output: &request.output,
            work_root: &self.config.work_root,
            toolchain: &self.config.toolchain,
            signing: &self.config.signing,
        };
        preflight::run_preflight(&inputs, self.runner, self.reporter)
    }

    /// Convert `request.apk` into a signed bundle at `request.output`.
    pub fn run(&self, request: &BuildRequest) -> Result<RunSummary, PipelineError> {
        let timer = Timer::start("apk2aab");

        let report = self.preflight(request);
        report.print(self.reporter);
        if let Some((check, result)) = report.first_fatal() {
            let message = match &result.details {
                Some(details) => format!("{}: {details}", result.name),
                None => result.name.clone(),
            };
            return Err(PipelineError::Preflight { check, message });
        }

        let work = run_stage(self.reporter, "create work tree", || {
            Ok(WorkTree::create_unique(&self.config.work_root)?)
        })?;
        self.reporter
            .info(&format!("work tree: {}", work.root().display()));

        let result = self.convert(&work, request);

        let root = work.root().to_path_buf();
        if let Err(e) = work.teardown() {
            self.reporter
                .warning(&format!("failed to remove {}: {e}", root.display()));
        }

        let (output, modules, split_assets) = result?;
        let (size, sha256) = run_stage(self.reporter, "digest output", || {
            Ok(file_digest(&output)?)
        })?;

        let elapsed = timer.finish();
        self.reporter.info(&format!(
            "{} output {} ({size} bytes, sha256 {sha256})",
            format_elapsed(elapsed),
            output.display()
        ));

        Ok(RunSummary {
            output,
            modules,
            split_assets,
            size,
            sha256,
            elapsed,
        })
    }

    /// Everything between staging and delivery. The caller owns teardown.
    fn convert(
        &self,
        work: &WorkTree,
        request: &BuildRequest,
    ) -> Result<(PathBuf, Vec<String>, Vec<String>), PipelineError> {
        let toolchain = &self.config.toolchain;
        let decoded = work.decoded_dir();

        run_stage(self.reporter, "decode apk", || {
            self.runner.run(&toolchain.decode(&request.apk, &decoded))?;
            Ok(())
        })?;

        let package = run_stage(self.reporter, "extract metadata", || {
            Ok(PackageDescriptor::from_decoded(&decoded)?)
        })?;
        self.reporter.info(&format!(
            "package {} version {} ({}) sdk {}..{}",
            package.package_name,
            package.version_name,
            package.version_code,
            package.min_sdk,
            package.target_sdk
        ));

        // Linking without stable ids still works, only IDs may drift.
        let public_ids = work.public_ids();
        let stable_ids = run_tolerated(self.reporter, "record public ids", || {
            record_public_ids(&public_ids, &decoded, &package.package_name)
        })
        .map(|table| {
            self.reporter
                .info(&format!("recorded {} public resource ids", table.len()));
            public_ids.clone()
        });

        let mut modules = ModuleSet::new(&decoded);
        let mut split_assets = Vec::new();
        if request.split.is_some() && request.active_split().is_none() {
            self.reporter
                .info("split pattern is empty, all assets stay in base");
        }
        if let Some(split) = request.active_split() {
            let split_dir = work.join(&split.module_name);
            split_assets = run_stage(self.reporter, "plan split module", || {
                let planner = SplitPlanner::new(&split.pattern)?;
                modules.add_split(&split.module_name, &split_dir)?;
                scaffold_split_module(
                    &split_dir,
                    &split.module_name,
                    &package.package_name,
                    self.config.split_template.as_deref(),
                )?;
                Ok(planner.relocate(&decoded, &split_dir)?)
            })?;
            self.reporter.info(&format!(
                "moved {} asset(s) matching '{}' into {}",
                split_assets.len(),
                split.pattern,
                split.module_name
            ));
        }

        let assembler = ModuleAssembler::new(toolchain, &package, self.runner, self.reporter);
        let mut archives = Vec::with_capacity(modules.len());
        for module in modules.iter() {
            let archive = assembler.assemble(
                module,
                &work.module_work_dir(&module.name),
                stable_ids.as_deref(),
                &work.module_archive(&module.name),
            )?;
            archives.push(archive);
        }

        let bundle_config = work.bundle_config();
        run_stage(self.reporter, "write compression config", || {
            BundleConfig::new(&package.do_not_compress).write(&bundle_config)?;
            Ok(())
        })?;

        let bundle = work.bundle();
        run_stage(self.reporter, "build bundle", || {
            let spec = toolchain.build_bundle(&archives, &bundle, Some(&bundle_config));
            self.runner.run(&spec)?;
            Ok(())
        })?;

        run_stage(self.reporter, "sign bundle", || {
            self.runner.run(&toolchain.sign(&bundle, &self.config.signing))?;
            Ok(())
        })?;

        run_stage(self.reporter, "deliver bundle", || {
            if !bundle.is_file() {
                return Err(StageFailure::new(
                    -1,
                    format!("bundle builder produced no {}", bundle.display()),
                ));
            }
            staging::copy(&bundle, &request.output)?;
            Ok(())
        })?;

        Ok((request.output.clone(), modules.names(), split_assets))
    }
}

/// Size and lowercase hex SHA-256 of a file.
pub fn file_digest(path: &Path) -> Result<(u64, String), FsError> {
    let mut file = fs::File::open(path).map_err(|e| FsError::io("digest", path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = file.read(&mut buf).map_err(|e| FsError::io("digest", path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok((size, format!("{:x}", hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(pattern: &str) -> BuildRequest {
        BuildRequest {
            apk: PathBuf::from("app.apk"),
            output: PathBuf::from("app.aab"),
            split: Some(SplitRequest {
                pattern: pattern.to_string(),
                module_name: "pad_assets".to_string(),
            }),
        }
    }

    #[test]
    fn blank_split_pattern_means_no_split() {
        assert!(request("").active_split().is_none());
        assert!(request("  ").active_split().is_none());
        assert!(request("^videos/").active_split().is_some());
    }

    #[test]
    fn digest_of_known_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f");
        fs::write(&path, "abc").unwrap();

        let (size, sha) = file_digest(&path).unwrap();
        assert_eq!(size, 3);
        assert_eq!(
            sha,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_of_missing_file_is_fs_error() {
        let tmp = TempDir::new().unwrap();
        assert!(file_digest(&tmp.path().join("nope")).is_err());
    }
}
