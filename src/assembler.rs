//! Module assembly: turn one module source tree into a bundle module
//! archive.
//!
//! A module source tree looks like a decoded package (`res/`,
//! `AndroidManifest.xml`, `assets/`, `lib/`, `unknown/`, `kotlin/`,
//! `original/META-INF/`, `*.dex`). The archive it becomes follows the bundle
//! module layout:
//!
//! ```text
//! manifest/AndroidManifest.xml   (proto, from the linker)
//! resources.pb, res/...          (from the linker)
//! assets/  lib/  dex/
//! root/    root/kotlin/  root/META-INF/
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FsError, PipelineError, SplitError, StageFailure};
use crate::metadata::{PackageDescriptor, MANIFEST_FILE};
use crate::process::ProcessRunner;
use crate::report::Reporter;
use crate::staging::{self, MODULE_WORK_SUFFIX, RESERVED_ENTRIES};
use crate::stage::{run_stage, run_tolerated};
use crate::tools::{LinkParams, Toolchain};

/// Name of the module built from the decoded package itself.
pub const BASE_MODULE: &str = "base";

/// Signature files of the original package that must not reach the bundle.
const SIGNATURE_SUFFIXES: [&str; 3] = [".RSA", ".SF", ".MF"];

/// One logical module and the tree it is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub name: String,
    pub source: PathBuf,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn res_dir(&self) -> PathBuf {
        self.source.join("res")
    }

    pub fn manifest(&self) -> PathBuf {
        self.source.join(MANIFEST_FILE)
    }

    pub fn meta_inf(&self) -> PathBuf {
        self.source.join("original").join("META-INF")
    }
}

/// Modules of one run, in assembly order: `base` first, then at most one
/// split module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSet {
    modules: Vec<ModuleDescriptor>,
}

impl ModuleSet {
    pub fn new(base_source: impl Into<PathBuf>) -> Self {
        Self {
            modules: vec![ModuleDescriptor::new(BASE_MODULE, base_source)],
        }
    }

    /// Add the split module. Rejects a second split module or a name that
    /// cannot live next to the other work-tree entries.
    pub fn add_split(&mut self, name: &str, source: impl Into<PathBuf>) -> Result<(), SplitError> {
        validate_module_name(name)?;
        if self.modules.len() > 1 {
            return Err(SplitError::module_name(
                name,
                format!("only one split module is supported (already have '{}')", self.modules[1].name),
            ));
        }
        self.modules.push(ModuleDescriptor::new(name, source));
        Ok(())
    }

    pub fn base(&self) -> &ModuleDescriptor {
        &self.modules[0]
    }

    pub fn split(&self) -> Option<&ModuleDescriptor> {
        self.modules.get(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Builds module archives with the external resource tools.
pub struct ModuleAssembler<'a> {
    toolchain: &'a Toolchain,
    package: &'a PackageDescriptor,
    runner: &'a dyn ProcessRunner,
    reporter: &'a dyn Reporter,
}

impl<'a> ModuleAssembler<'a> {
    pub fn new(
        toolchain: &'a Toolchain,
        package: &'a PackageDescriptor,
        runner: &'a dyn ProcessRunner,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            toolchain,
            package,
            runner,
            reporter,
        }
    }

    /// Assemble `module` inside `work_dir` and write its archive to
    /// `out_archive`.
    ///
    /// `stable_ids` is passed to the linker when the file exists.
    pub fn assemble(
        &self,
        module: &ModuleDescriptor,
        work_dir: &Path,
        stable_ids: Option<&Path>,
        out_archive: &Path,
    ) -> Result<PathBuf, PipelineError> {
        let name = module.name.as_str();
        let stage = |step: &str| format!("[{name}] {step}");

        let compiled_resources = work_dir.join("compiled_resources.zip");
        let linked = work_dir.join("base.apk");
        let module_dir = work_dir.join(name);

        run_stage(self.reporter, &stage("prepare work directory"), || {
            fs::create_dir_all(work_dir)
                .map_err(|e| FsError::io("create module work dir", work_dir, e))?;
            Ok(())
        })?;

        // 1. Compile (best effort)
        if module.res_dir().is_dir() {
            run_tolerated(self.reporter, &stage("compile resources"), || {
                let spec = self.toolchain.compile(&module.res_dir(), &compiled_resources);
                self.runner.run(&spec)?;
                Ok(())
            });
        }

        // 2. Link
        let manifest = module.manifest();
        run_stage(self.reporter, &stage("link resources"), || {
            let params = LinkParams {
                output: &linked,
                manifest: &manifest,
                min_sdk: self.package.min_sdk,
                target_sdk: self.package.target_sdk,
                version_code: self.package.version_code,
                version_name: &self.package.version_name,
                compiled_resources: Some(compiled_resources.as_path()).filter(|p| p.is_file()),
                stable_ids: stable_ids.filter(|p| p.is_file()),
            };
            self.runner.run(&self.toolchain.link(&params))?;
            Ok(())
        })?;

        // 3. Unpack
        run_stage(self.reporter, &stage("unzip linked resources"), || {
            staging::unzip_archive(&linked, &module_dir)?;
            Ok(())
        })?;

        // 4. Manifest
        run_stage(self.reporter, &stage("relocate manifest"), || {
            staging::move_path(
                &module_dir.join(MANIFEST_FILE),
                &module_dir.join("manifest").join(MANIFEST_FILE),
            )?;
            Ok(())
        })?;

        // 5. Passthrough subtrees
        let passthrough = [
            ("copy assets", module.source.join("assets"), module_dir.join("assets")),
            ("copy lib", module.source.join("lib"), module_dir.join("lib")),
            ("copy unknown", module.source.join("unknown"), module_dir.join("root")),
            ("copy kotlin", module.source.join("kotlin"), module_dir.join("root/kotlin")),
        ];
        for (step, src, dst) in &passthrough {
            if src.exists() {
                run_stage(self.reporter, &stage(*step), || {
                    staging::copy(src, dst)?;
                    Ok(())
                })?;
            }
        }

        let meta_inf = module.meta_inf();
        if meta_inf.is_dir() {
            run_stage(self.reporter, &stage("strip original signature"), || {
                let removed = strip_signature_files(&meta_inf)?;
                if !removed.is_empty() {
                    self.reporter
                        .info(&format!("[{name}] removed {}", removed.join(", ")));
                }
                Ok(())
            })?;
            run_stage(self.reporter, &stage("copy META-INF"), || {
                staging::copy(&meta_inf, &module_dir.join("root/META-INF"))?;
                Ok(())
            })?;
        }

        // 6. Dex
        if module.source.is_dir() {
            run_stage(self.reporter, &stage("copy dex"), || {
                copy_dex(&module.source, &module_dir.join("dex"))?;
                Ok(())
            })?;
        }

        // 7. Package
        run_stage(self.reporter, &stage("compress module zip"), || {
            staging::zip_directory(&module_dir, out_archive)?;
            Ok(())
        })?;

        Ok(out_archive.to_path_buf())
    }
}

/// A split module name becomes a directory directly under the work tree, so
/// it must be a plain identifier that shadows no reserved entry.
pub fn validate_module_name(name: &str) -> Result<(), SplitError> {
    if name.is_empty() {
        return Err(SplitError::module_name(name, "name is empty"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SplitError::module_name(
            name,
            "only ASCII letters, digits and '_' are allowed",
        ));
    }
    if name == BASE_MODULE || RESERVED_ENTRIES.contains(&name) {
        return Err(SplitError::module_name(name, "name is reserved"));
    }
    if name.ends_with(MODULE_WORK_SUFFIX) {
        return Err(SplitError::module_name(
            name,
            format!("names ending in '{MODULE_WORK_SUFFIX}' are reserved"),
        ));
    }
    Ok(())
}

/// Delete `*.RSA`, `*.SF` and `*.MF` files directly inside `meta_inf`.
///
/// Returns the names of the deleted files, sorted.
pub fn strip_signature_files(meta_inf: &Path) -> Result<Vec<String>, FsError> {
    let mut removed = Vec::new();
    let entries = fs::read_dir(meta_inf).map_err(|e| FsError::io("strip signature", meta_inf, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| FsError::io("strip signature", meta_inf, e))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !is_signature_file(&file_name) || !entry.path().is_file() {
            continue;
        }
        staging::delete(&entry.path())?;
        removed.push(file_name);
    }

    removed.sort();
    Ok(removed)
}

fn is_signature_file(file_name: &str) -> bool {
    SIGNATURE_SUFFIXES
        .iter()
        .any(|suffix| file_name.ends_with(suffix))
}

/// Copy every top-level `*dex` file of `source` into `dex_dir`.
pub fn copy_dex(source: &Path, dex_dir: &Path) -> Result<Vec<String>, StageFailure> {
    let entries = fs::read_dir(source).map_err(|e| FsError::io("copy dex", source, e))?;

    let mut dex_files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| FsError::io("copy dex", source, e))?;
        let path = entry.path();
        if path.is_file() && entry.file_name().to_string_lossy().ends_with("dex") {
            dex_files.push(path);
        }
    }
    dex_files.sort();

    let mut copied = Vec::new();
    for dex in dex_files {
        let Some(file_name) = dex.file_name() else {
            continue;
        };
        staging::copy(&dex, &dex_dir.join(file_name))?;
        copied.push(file_name.to_string_lossy().into_owned());
    }
    Ok(copied)
}
