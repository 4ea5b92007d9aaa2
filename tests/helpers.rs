//! Shared test utilities for apk2aab tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use apk2aab::config::Config;
use apk2aab::driver::{BuildRequest, SplitRequest};
use apk2aab::error::ToolError;
use apk2aab::process::{CommandResult, CommandSpec, ProcessRunner};
use apk2aab::report::{Reporter, StageOutcome};
use apk2aab::staging;
use tempfile::TempDir;

pub const PACKAGE: &str = "com.example.game";

/// Test environment: a libs dir with keystore and platform jar, an input
/// package and a work root, all inside one temp dir.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    pub root: PathBuf,
    pub libs: PathBuf,
    pub work_root: PathBuf,
    pub apk: PathBuf,
    pub output: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let libs = root.join("libs");
        let work_root = root.join("work");
        let apk = root.join("app-release.apk");
        let output = root.join("out/app-release.aab");

        fs::create_dir_all(&libs).expect("Failed to create libs dir");
        fs::write(libs.join("android.keystore"), b"keystore").expect("Failed to create keystore");
        fs::write(libs.join("android_sdk.jar"), b"jar").expect("Failed to create android.jar");
        fs::write(&apk, b"PK\x03\x04 not really").expect("Failed to create apk");

        Self {
            _temp_dir: temp_dir,
            root,
            libs,
            work_root,
            apk,
            output,
        }
    }

    /// Configuration pointing at this environment. Tools keep bare names so
    /// the fake runner can recognise them.
    pub fn config(&self) -> Config {
        let vars: HashMap<String, String> = [
            ("APK2AAB_LIBS_DIR", self.libs.display().to_string()),
            ("APK2AAB_WORK_DIR", self.work_root.display().to_string()),
            ("APK2AAB_AAPT2", "aapt2".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Config::from_vars(&vars)
    }

    pub fn request(&self, split: Option<(&str, &str)>) -> BuildRequest {
        BuildRequest {
            apk: self.apk.clone(),
            output: self.output.clone(),
            split: split.map(|(pattern, name)| SplitRequest {
                pattern: pattern.to_string(),
                module_name: name.to_string(),
            }),
        }
    }

    /// Work trees left under the work root.
    pub fn work_trees(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.work_root) else {
            return Vec::new();
        };
        entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().starts_with("temp_"))
                    .unwrap_or(false)
            })
            .collect()
    }
}

/// Shape of the decoded package the fake decoder produces.
#[derive(Debug, Clone)]
pub struct DecodedFixture {
    pub with_res: bool,
    pub with_public_xml: bool,
    pub assets: Vec<&'static str>,
}

impl Default for DecodedFixture {
    fn default() -> Self {
        Self {
            with_res: true,
            with_public_xml: true,
            assets: vec!["videos/a.mp4", "images/b.png"],
        }
    }
}

pub const APKTOOL_YML: &str = r#"!!brut.androlib.meta.MetaInfo
apkFileName: app-release.apk
doNotCompress:
- resources.arsc
- META-INF/com/android/build/gradle/app-metadata.properties
- png
sdkInfo:
  minSdkVersion: '21'
  targetSdkVersion: '30'
version: 2.5.2
versionInfo:
  versionCode: '42'
  versionName: 2.3.1
"#;

pub const PUBLIC_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <public type="drawable" name="ic_launcher" id="0x7f020000" />
    <public type="string" name="app_name" id="0x7f0b0000" />
</resources>
"#;

/// Write a decoded package tree at `dir`, as apktool would.
pub fn write_decoded_package(dir: &Path, fixture: &DecodedFixture) {
    write(&dir.join("apktool.yml"), APKTOOL_YML);
    write(
        &dir.join("AndroidManifest.xml"),
        &format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="{PACKAGE}">
    <application android:label="@string/app_name" />
</manifest>
"#
        ),
    );

    if fixture.with_res {
        write(
            &dir.join("res/values/strings.xml"),
            r#"<resources><string name="app_name">Game</string></resources>"#,
        );
        if fixture.with_public_xml {
            write(&dir.join("res/values/public.xml"), PUBLIC_XML);
        }
    }

    for asset in &fixture.assets {
        write(&dir.join("assets").join(asset), asset);
    }

    write(&dir.join("lib/arm64-v8a/libgame.so"), "ELF");
    write(&dir.join("unknown/stamp.txt"), "stamp");
    write(&dir.join("kotlin/kotlin.kotlin_builtins"), "kt");
    write(&dir.join("original/META-INF/CERT.RSA"), "rsa");
    write(&dir.join("original/META-INF/CERT.SF"), "sf");
    write(&dir.join("original/META-INF/MANIFEST.MF"), "mf");
    write(&dir.join("original/META-INF/services/com.example.Plugin"), "impl");
    write(&dir.join("classes.dex"), "dex1");
    write(&dir.join("classes2.dex"), "dex2");
}

pub fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, content).expect("Failed to write fixture file");
}

/// Collaborator invocation kinds the fake runner recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Decode,
    Compile,
    Link,
    BuildBundle,
    Sign,
    Probe,
}

fn classify(spec: &CommandSpec) -> Call {
    let args = spec.get_args();
    let has = |a: &str| args.iter().any(|x| x == a);
    match args.first().map(String::as_str) {
        Some("compile") => Call::Compile,
        Some("link") => Call::Link,
        _ if has("build-bundle") => Call::BuildBundle,
        _ if has("-sigalg") => Call::Sign,
        _ if has("d") && has("-s") => Call::Decode,
        _ => Call::Probe,
    }
}

/// Simulates the external tools on the filesystem and records every call.
pub struct FakeRunner {
    pub fixture: DecodedFixture,
    failures: HashMap<Call, i32>,
    calls: RefCell<Vec<(Call, CommandSpec)>>,
    /// Entries of every module archive handed to the bundle builder.
    pub bundled: RefCell<Vec<(PathBuf, Vec<String>)>>,
    /// Compression config handed to the bundle builder.
    pub bundle_config: RefCell<Option<String>>,
    /// Manifest text of every link call, in call order.
    pub linked_manifests: RefCell<Vec<String>>,
}

impl FakeRunner {
    pub fn new(fixture: DecodedFixture) -> Self {
        Self {
            fixture,
            failures: HashMap::new(),
            calls: RefCell::new(Vec::new()),
            bundled: RefCell::new(Vec::new()),
            bundle_config: RefCell::new(None),
            linked_manifests: RefCell::new(Vec::new()),
        }
    }

    /// Make every call of `kind` exit with `code`.
    pub fn failing(mut self, kind: Call, code: i32) -> Self {
        self.failures.insert(kind, code);
        self
    }

    /// Archive entries of the module whose archive is named `<module>.zip`.
    pub fn module_entries(&self, module: &str) -> Option<Vec<String>> {
        let file_name = format!("{module}.zip");
        self.bundled
            .borrow()
            .iter()
            .find(|(path, _)| path.file_name().map(|n| n == file_name.as_str()).unwrap_or(false))
            .map(|(_, entries)| entries.clone())
    }

    pub fn calls(&self, kind: Call) -> Vec<CommandSpec> {
        self.calls
            .borrow()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, spec)| spec.clone())
            .collect()
    }

    fn simulate(&self, kind: Call, spec: &CommandSpec) -> std::io::Result<()> {
        match kind {
            Call::Decode => {
                let out = PathBuf::from(spec.value_of("-o").unwrap_or_default());
                write_decoded_package(&out, &self.fixture);
            }
            Call::Compile => {
                let out = PathBuf::from(spec.value_of("-o").unwrap_or_default());
                write(&out, "compiled");
            }
            Call::Link => {
                let out = PathBuf::from(spec.value_of("-o").unwrap_or_default());
                let manifest = fs::read_to_string(spec.value_of("--manifest").unwrap_or_default())?;
                self.linked_manifests.borrow_mut().push(manifest.clone());
                let staged = out.with_extension("linked");
                write(&staged.join("AndroidManifest.xml"), &manifest);
                write(&staged.join("resources.pb"), "pb");
                if spec.value_of("-R").is_some() {
                    write(&staged.join("res/values/strings.pb"), "res");
                }
                staging::zip_directory(&staged, &out)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
                fs::remove_dir_all(&staged)?;
            }
            Call::BuildBundle => {
                let out = PathBuf::from(spec.inline_value_of("--output").unwrap_or_default());
                let modules = spec.inline_value_of("--modules").unwrap_or_default();
                for module in modules.split(',') {
                    if !Path::new(module).is_file() {
                        return Err(std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            format!("module archive {module} missing"),
                        ));
                    }
                    self.bundled
                        .borrow_mut()
                        .push((PathBuf::from(module), archive_entries(Path::new(module))));
                }
                if let Some(config) = spec.inline_value_of("--config") {
                    *self.bundle_config.borrow_mut() = Some(fs::read_to_string(config)?);
                }
                write(&out, &format!("AAB[{modules}]"));
            }
            Call::Sign | Call::Probe => {}
        }
        Ok(())
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult, ToolError> {
        let kind = classify(spec);
        self.calls.borrow_mut().push((kind, spec.clone()));

        if let Some(&code) = self.failures.get(&kind) {
            return spec.check(CommandResult::failed(code, format!("{kind:?} failed")));
        }

        let result = match self.simulate(kind, spec) {
            Ok(()) => CommandResult::ok("ok"),
            Err(e) => CommandResult::failed(1, e.to_string()),
        };
        spec.check(result)
    }
}

/// Captures everything reported, for assertions.
#[derive(Default)]
pub struct RecordingReporter {
    pub lines: RefCell<Vec<String>>,
    pub stages: RefCell<Vec<(String, StageOutcome)>>,
}

impl RecordingReporter {
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|l| l.contains(needle))
    }

    pub fn outcome_of(&self, stage: &str) -> Option<StageOutcome> {
        self.stages
            .borrow()
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, outcome)| *outcome)
    }
}

impl Reporter for RecordingReporter {
    fn stage_started(&self, _: &str) {}

    fn stage_finished(&self, stage: &str, _: Duration, outcome: StageOutcome, status: i32, message: &str) {
        self.stages.borrow_mut().push((stage.to_string(), outcome));
        self.lines
            .borrow_mut()
            .push(format!("{stage} status:{status} msg:{message}"));
    }

    fn info(&self, msg: &str) {
        self.lines.borrow_mut().push(format!("INFO {msg}"));
    }

    fn warning(&self, msg: &str) {
        self.lines.borrow_mut().push(format!("WARN {msg}"));
    }

    fn error(&self, msg: &str) {
        self.lines.borrow_mut().push(format!("ERROR {msg}"));
    }
}

/// Names of the entries inside a zip archive, sorted.
pub fn archive_entries(archive: &Path) -> Vec<String> {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let out = tmp.path().join("x");
    staging::unzip_archive(archive, &out).expect("Failed to unzip");
    let mut names: Vec<String> = staging::list_files(&out)
        .expect("Failed to list")
        .iter()
        .map(|p| staging::relative_slash_path(p))
        .collect();
    names.sort();
    names
}

/// Assert that a file exists.
pub fn assert_file_exists(path: &Path) {
    assert!(path.is_file(), "Expected file at {}", path.display());
}
