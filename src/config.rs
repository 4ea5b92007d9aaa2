//! Configuration management for apk2aab.
//!
//! Reads configuration from environment variables (after `main` has loaded
//! `.env` through dotenvy). Command-line flags override both.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::report::Reporter;
use crate::tools::{SigningConfig, Toolchain};

/// Default directory holding the bundled tools and keystore.
pub const DEFAULT_LIBS_DIR: &str = "libs";
/// Default name of the split asset-pack module.
pub const DEFAULT_SPLIT_MODULE: &str = "pad_assets";

pub const DEFAULT_STORE_PASSWORD: &str = "android";
pub const DEFAULT_KEY_ALIAS: &str = "androidkey";
pub const DEFAULT_KEY_PASSWORD: &str = "android";
pub const DEFAULT_DIGEST_ALG: &str = "SHA-256";
pub const DEFAULT_SIG_ALG: &str = "SHA256withRSA";

/// apk2aab configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory the default tool paths are resolved against.
    pub libs_dir: PathBuf,
    pub toolchain: Toolchain,
    pub signing: SigningConfig,
    /// Directory the per-run work tree is created in.
    pub work_root: PathBuf,
    /// Optional template directory for the split module.
    pub split_template: Option<PathBuf>,
    /// Name given to the split module.
    pub split_module: String,
}

/// Values given on the command line; `None` keeps the loaded value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub apktool: Option<PathBuf>,
    pub aapt2: Option<PathBuf>,
    pub android_jar: Option<PathBuf>,
    pub bundletool: Option<PathBuf>,
    pub keystore: Option<PathBuf>,
    pub store_password: Option<String>,
    pub key_alias: Option<String>,
    pub key_password: Option<String>,
    pub work_root: Option<PathBuf>,
    pub split_module: Option<String>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Self {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build configuration from a variable map, falling back to defaults
    /// rooted at `APK2AAB_LIBS_DIR` (default `libs/`).
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let libs_dir = get("APK2AAB_LIBS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LIBS_DIR));
        let path_or = |key: &str, default: PathBuf| get(key).map(PathBuf::from).unwrap_or(default);

        let toolchain = Toolchain {
            java: path_or("APK2AAB_JAVA", PathBuf::from("java")),
            apktool: path_or("APK2AAB_APKTOOL", libs_dir.join("apktool-2.5.2-fixed.jar")),
            aapt2: path_or(
                "APK2AAB_AAPT2",
                libs_dir.join("aapt2").join(host_system()).join("aapt2"),
            ),
            android_jar: path_or("APK2AAB_ANDROID_JAR", libs_dir.join("android_sdk.jar")),
            bundletool: path_or(
                "APK2AAB_BUNDLETOOL",
                libs_dir.join("bundletool-all-1.8_fix.jar"),
            ),
            jarsigner: path_or("APK2AAB_JARSIGNER", PathBuf::from("jarsigner")),
            keytool: path_or("APK2AAB_KEYTOOL", PathBuf::from("keytool")),
        };

        let signing = SigningConfig {
            keystore: path_or("APK2AAB_KEYSTORE", libs_dir.join("android.keystore")),
            store_password: get("APK2AAB_STORE_PASSWORD")
                .unwrap_or_else(|| DEFAULT_STORE_PASSWORD.to_string()),
            key_alias: get("APK2AAB_KEY_ALIAS").unwrap_or_else(|| DEFAULT_KEY_ALIAS.to_string()),
            key_password: get("APK2AAB_KEY_PASSWORD")
                .unwrap_or_else(|| DEFAULT_KEY_PASSWORD.to_string()),
            digest_alg: get("APK2AAB_DIGEST_ALG").unwrap_or_else(|| DEFAULT_DIGEST_ALG.to_string()),
            sig_alg: get("APK2AAB_SIG_ALG").unwrap_or_else(|| DEFAULT_SIG_ALG.to_string()),
        };

        Self {
            toolchain,
            signing,
            work_root: path_or("APK2AAB_WORK_DIR", PathBuf::from(".")),
            split_template: get("APK2AAB_SPLIT_TEMPLATE").map(PathBuf::from),
            split_module: get("APK2AAB_SPLIT_MODULE")
                .unwrap_or_else(|| DEFAULT_SPLIT_MODULE.to_string()),
            libs_dir,
        }
    }

    /// Apply command-line overrides.
    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        set(&mut self.toolchain.apktool, overrides.apktool);
        set(&mut self.toolchain.aapt2, overrides.aapt2);
        set(&mut self.toolchain.android_jar, overrides.android_jar);
        set(&mut self.toolchain.bundletool, overrides.bundletool);
        set(&mut self.signing.keystore, overrides.keystore);
        set(&mut self.signing.store_password, overrides.store_password);
        set(&mut self.signing.key_alias, overrides.key_alias);
        set(&mut self.signing.key_password, overrides.key_password);
        set(&mut self.work_root, overrides.work_root);
        set(&mut self.split_module, overrides.split_module);
        self
    }

    /// Resolve every relative path against `base`.
    pub fn absolutize(mut self, base: &Path) -> Self {
        let abs = |p: &mut PathBuf| {
            // bare program names stay PATH lookups
            if p.is_relative() && p.components().count() > 1 {
                *p = base.join(&*p);
            }
        };
        abs(&mut self.toolchain.apktool);
        abs(&mut self.toolchain.aapt2);
        abs(&mut self.toolchain.android_jar);
        abs(&mut self.toolchain.bundletool);
        abs(&mut self.signing.keystore);
        if self.work_root.is_relative() {
            self.work_root = base.join(&self.work_root);
        }
        if let Some(template) = self.split_template.as_mut() {
            if template.is_relative() {
                *template = base.join(&*template);
            }
        }
        self
    }

    /// Print configuration for debugging. Passwords are masked.
    pub fn print(&self, reporter: &dyn Reporter) {
        let t = &self.toolchain;
        let s = &self.signing;
        reporter.info("Configuration:");
        reporter.info(&format!("  LIBS_DIR: {}", self.libs_dir.display()));
        reporter.info(&format!("  JAVA: {}", t.java.display()));
        reporter.info(&format!("  APKTOOL: {}", t.apktool.display()));
        reporter.info(&format!("  AAPT2: {}", t.aapt2.display()));
        reporter.info(&format!("  ANDROID_JAR: {}", t.android_jar.display()));
        reporter.info(&format!("  BUNDLETOOL: {}", t.bundletool.display()));
        reporter.info(&format!("  JARSIGNER: {}", t.jarsigner.display()));
        reporter.info(&format!("  KEYTOOL: {}", t.keytool.display()));
        reporter.info(&format!("  KEYSTORE: {}", s.keystore.display()));
        reporter.info(&format!("  STORE_PASSWORD: {}", mask(&s.store_password)));
        reporter.info(&format!("  KEY_ALIAS: {}", s.key_alias));
        reporter.info(&format!("  KEY_PASSWORD: {}", mask(&s.key_password)));
        reporter.info(&format!("  DIGEST_ALG: {}", s.digest_alg));
        reporter.info(&format!("  SIG_ALG: {}", s.sig_alg));
        reporter.info(&format!("  WORK_DIR: {}", self.work_root.display()));
        reporter.info(&format!("  SPLIT_MODULE: {}", self.split_module));
        match &self.split_template {
            Some(template) => reporter.info(&format!("  SPLIT_TEMPLATE: {}", template.display())),
            None => reporter.info("  SPLIT_TEMPLATE: (built-in asset-pack manifest)"),
        }
    }
}

fn mask(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(empty)"
    } else {
        "********"
    }
}

/// Platform directory name of the bundled aapt2 binary.
fn host_system() -> &'static str {
    match std::env::consts::OS {
        "macos" => "macos",
        "windows" => "windows",
        _ => "linux",
    }
}
