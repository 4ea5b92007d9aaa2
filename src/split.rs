//! Split-module planning: carve assets out of the base module into an
//! on-demand asset-pack module.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{FsError, SplitError};
use crate::staging::{self, list_files, relative_slash_path};

/// Manifest of a generated asset-pack module. `$padName` and
/// `$applicationId` are substituted when the module is scaffolded.
pub const ASSET_PACK_MANIFEST_TEMPLATE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    xmlns:dist="http://schemas.android.com/apk/distribution"
    package="$applicationId"
    split="$padName">
    <dist:module dist:type="asset-pack">
        <dist:fusing dist:include="true" />
        <dist:delivery>
            <dist:on-demand />
        </dist:delivery>
    </dist:module>
</manifest>
"#;

/// Selects asset paths that belong in the split module.
#[derive(Debug, Clone)]
pub struct SplitPlanner {
    regex: Regex,
}

impl SplitPlanner {
    /// Compile `pattern`. It must match a relative asset path from its start.
    pub fn new(pattern: &str) -> Result<Self, SplitError> {
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| SplitError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex })
    }

    /// Whether a `/`-separated relative asset path belongs in the split module.
    pub fn matches(&self, rel: &str) -> bool {
        let rel = rel.trim_start_matches(['/', '\\']);
        self.regex.is_match(rel)
    }

    /// Relative paths under `assets_dir` selected for relocation, sorted.
    pub fn plan(&self, assets_dir: &Path) -> Result<Vec<String>, FsError> {
        Ok(list_files(assets_dir)?
            .iter()
            .map(|p| relative_slash_path(p))
            .filter(|rel| self.matches(rel))
            .collect())
    }

    /// Move every planned file from `base_module/assets` to
    /// `split_module/assets`, keeping its relative path.
    ///
    /// Returns the moved paths. Nothing to move is not an error.
    pub fn relocate(&self, base_module: &Path, split_module: &Path) -> Result<Vec<String>, FsError> {
        let base_assets = base_module.join("assets");
        let split_assets = split_module.join("assets");

        let planned = self.plan(&base_assets)?;
        for rel in &planned {
            staging::move_path(&base_assets.join(rel), &split_assets.join(rel))?;
        }
        prune_empty_dirs(&base_assets)?;
        Ok(planned)
    }
}

/// Create the source tree of a split module at `dir`.
///
/// With a template directory, its contents are copied; otherwise the
/// built-in asset-pack manifest is written. Placeholders in the manifest are
/// replaced with the module name and application id.
pub fn scaffold_split_module(
    dir: &Path,
    module_name: &str,
    package: &str,
    template: Option<&Path>,
) -> Result<PathBuf, FsError> {
    let manifest = dir.join(crate::metadata::MANIFEST_FILE);

    match template {
        Some(template) => staging::copy(template, dir)?,
        None => {
            fs::create_dir_all(dir).map_err(|e| FsError::io("scaffold split module", dir, e))?;
            fs::write(&manifest, ASSET_PACK_MANIFEST_TEMPLATE)
                .map_err(|e| FsError::io("scaffold split module", &manifest, e))?;
        }
    }

    let text = fs::read_to_string(&manifest)
        .map_err(|e| FsError::io("scaffold split module", &manifest, e))?;
    let text = text
        .replace("$padName", module_name)
        .replace("$applicationId", package);
    fs::write(&manifest, text).map_err(|e| FsError::io("scaffold split module", &manifest, e))?;

    Ok(dir.to_path_buf())
}

/// Remove directories left empty by relocation, keeping `root` itself.
fn prune_empty_dirs(root: &Path) -> Result<(), FsError> {
    if !root.is_dir() {
        return Ok(());
    }
    let dirs: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();

    for dir in dirs {
        let is_empty = fs::read_dir(&dir)
            .map_err(|e| FsError::io("prune", &dir, e))?
            .next()
            .is_none();
        if is_empty {
            fs::remove_dir(&dir).map_err(|e| FsError::io("prune", &dir, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, path.to_string_lossy().as_bytes()).unwrap();
    }

    #[test]
    fn matches_from_start_only() {
        let planner = SplitPlanner::new("videos/").unwrap();
        assert!(planner.matches("videos/a.mp4"));
        assert!(planner.matches("/videos/a.mp4"));
        assert!(!planner.matches("old/videos/a.mp4"));
    }

    #[test]
    fn alternation_is_anchored_as_a_whole() {
        let planner = SplitPlanner::new("a|b").unwrap();
        assert!(planner.matches("b/x"));
        assert!(!planner.matches("xb"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = SplitPlanner::new("(unclosed").unwrap_err();
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn relocates_matching_assets_only() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("base");
        let split = tmp.path().join("pad");
        touch(&base.join("assets/videos/a.mp4"));
        touch(&base.join("assets/images/b.png"));

        let planner = SplitPlanner::new("^videos/.*").unwrap();
        let moved = planner.relocate(&base, &split).unwrap();

        assert_eq!(moved, vec!["videos/a.mp4"]);
        assert!(split.join("assets/videos/a.mp4").is_file());
        assert!(!base.join("assets/videos").exists());
        assert!(base.join("assets/images/b.png").is_file());
    }

    #[test]
    fn second_relocation_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("base");
        let split = tmp.path().join("pad");
        touch(&base.join("assets/videos/a.mp4"));
        touch(&base.join("assets/videos/deep/c.mp4"));

        let planner = SplitPlanner::new("videos/").unwrap();
        assert_eq!(planner.relocate(&base, &split).unwrap().len(), 2);
        assert!(planner.relocate(&base, &split).unwrap().is_empty());
        assert!(split.join("assets/videos/deep/c.mp4").is_file());
    }

    #[test]
    fn missing_assets_dir_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let planner = SplitPlanner::new(".*").unwrap();
        assert!(planner
            .relocate(&tmp.path().join("base"), &tmp.path().join("pad"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn scaffold_substitutes_placeholders() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("pad");
        scaffold_split_module(&dir, "pad_assets", "com.example.game", None).unwrap();

        let manifest = fs::read_to_string(dir.join("AndroidManifest.xml")).unwrap();
        assert!(manifest.contains(r#"package="com.example.game""#));
        assert!(manifest.contains(r#"split="pad_assets""#));
        assert!(!manifest.contains('$'));
    }

    #[test]
    fn scaffold_copies_template_dir() {
        let tmp = TempDir::new().unwrap();
        let template = tmp.path().join("template");
        fs::create_dir_all(template.join("assets")).unwrap();
        fs::write(
            template.join("AndroidManifest.xml"),
            r#"<manifest package="$applicationId" split="$padName"/>"#,
        )
        .unwrap();
        fs::write(template.join("assets/readme.txt"), "hi").unwrap();

        let dir = tmp.path().join("pad");
        scaffold_split_module(&dir, "extra", "com.x", Some(&template)).unwrap();

        assert_eq!(
            fs::read_to_string(dir.join("AndroidManifest.xml")).unwrap(),
            r#"<manifest package="com.x" split="extra"/>"#
        );
        assert!(dir.join("assets/readme.txt").is_file());
        // the template itself is untouched
        assert!(fs::read_to_string(template.join("AndroidManifest.xml"))
            .unwrap()
            .contains("$padName"));
    }
}
