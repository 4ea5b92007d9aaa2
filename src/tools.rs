//! Command specifications for the external collaborators: the decoder
//! (apktool), the resource compiler/linker (aapt2), the bundle builder
//! (bundletool) and the signer (jarsigner).

use std::path::{Path, PathBuf};

use crate::process::CommandSpec;

/// Locations of every external tool a run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Java launcher used for the jar-based tools.
    pub java: PathBuf,
    pub apktool: PathBuf,
    pub aapt2: PathBuf,
    /// Platform resource container (`android.jar`) to link against.
    pub android_jar: PathBuf,
    pub bundletool: PathBuf,
    pub jarsigner: PathBuf,
    pub keytool: PathBuf,
}

/// Parameters of an `aapt2 link` invocation.
#[derive(Debug, Clone)]
pub struct LinkParams<'a> {
    pub output: &'a Path,
    pub manifest: &'a Path,
    pub min_sdk: u32,
    pub target_sdk: u32,
    pub version_code: u64,
    pub version_name: &'a str,
    pub compiled_resources: Option<&'a Path>,
    pub stable_ids: Option<&'a Path>,
}

/// Signing credentials and algorithms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningConfig {
    pub keystore: PathBuf,
    pub store_password: String,
    pub key_alias: String,
    pub key_password: String,
    pub digest_alg: String,
    pub sig_alg: String,
}

impl Toolchain {
    fn java_jar(&self, jar: &Path) -> CommandSpec {
        CommandSpec::for_path(&self.java).arg("-jar").arg_path(jar)
    }

    /// Decode `apk` into `out_dir`, leaving dex payloads undecoded.
    pub fn decode(&self, apk: &Path, out_dir: &Path) -> CommandSpec {
        self.java_jar(&self.apktool)
            .arg("d")
            .arg_path(apk)
            .arg("-s")
            .arg("-o")
            .arg_path(out_dir)
            .error_msg("apktool decode failed")
    }

    /// Compile a resource directory into a single container.
    pub fn compile(&self, res_dir: &Path, out: &Path) -> CommandSpec {
        CommandSpec::for_path(&self.aapt2)
            .args(["compile", "--legacy", "--dir"])
            .arg_path(res_dir)
            .arg("-o")
            .arg_path(out)
            .error_msg("aapt2 compile failed")
    }

    /// Link a module into the bundle's proto format.
    pub fn link(&self, params: &LinkParams<'_>) -> CommandSpec {
        let mut spec = CommandSpec::for_path(&self.aapt2)
            .args(["link", "--proto-format", "-o"])
            .arg_path(params.output)
            .arg("-I")
            .arg_path(&self.android_jar)
            .arg("--min-sdk-version")
            .arg(params.min_sdk.to_string())
            .arg("--target-sdk-version")
            .arg(params.target_sdk.to_string())
            .arg("--version-code")
            .arg(params.version_code.to_string())
            .arg("--version-name")
            .arg(params.version_name)
            .arg("--manifest")
            .arg_path(params.manifest)
            .arg("--auto-add-overlay");

        if let Some(compiled) = params.compiled_resources {
            spec = spec.arg("-R").arg_path(compiled);
        }
        if let Some(stable_ids) = params.stable_ids {
            spec = spec.arg("--stable-ids").arg_path(stable_ids);
        }
        spec.error_msg("aapt2 link failed")
    }

    /// Build a bundle from module archives.
    pub fn build_bundle(&self, modules: &[PathBuf], out: &Path, config: Option<&Path>) -> CommandSpec {
        let modules = modules
            .iter()
            .map(|m| m.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(",");

        let mut spec = self
            .java_jar(&self.bundletool)
            .arg("build-bundle")
            .arg(format!("--modules={modules}"))
            .arg(format!("--output={}", out.display()));
        if let Some(config) = config {
            spec = spec.arg(format!("--config={}", config.display()));
        }
        spec.error_msg("bundletool build-bundle failed")
    }

    /// Sign `artifact` in place.
    pub fn sign(&self, artifact: &Path, signing: &SigningConfig) -> CommandSpec {
        CommandSpec::for_path(&self.jarsigner)
            .arg("-digestalg")
            .arg(&signing.digest_alg)
            .arg("-sigalg")
            .arg(&signing.sig_alg)
            .arg("-keystore")
            .arg_path(&signing.keystore)
            .arg("-storepass")
            .arg(&signing.store_password)
            .arg("-keypass")
            .arg(&signing.key_password)
            .arg_path(artifact)
            .arg(&signing.key_alias)
            .error_msg("jarsigner failed")
    }

    // Version / identity probes used by preflight. They never fail the
    // command itself; the caller grades the result.

    pub fn probe_java(&self) -> CommandSpec {
        CommandSpec::for_path(&self.java).arg("-version").allow_fail()
    }

    pub fn probe_apktool(&self) -> CommandSpec {
        self.java_jar(&self.apktool).arg("--version").allow_fail()
    }

    pub fn probe_aapt2(&self) -> CommandSpec {
        CommandSpec::for_path(&self.aapt2).arg("version").allow_fail()
    }

    pub fn probe_bundletool(&self) -> CommandSpec {
        self.java_jar(&self.bundletool).arg("version").allow_fail()
    }

    pub fn probe_keystore(&self, signing: &SigningConfig) -> CommandSpec {
        CommandSpec::for_path(&self.keytool)
            .args(["-list", "-v", "-keystore"])
            .arg_path(&signing.keystore)
            .arg("-storepass")
            .arg(&signing.store_password)
            .arg("-alias")
            .arg(&signing.key_alias)
            .allow_fail()
    }
}
