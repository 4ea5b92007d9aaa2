//! The per-run staging work tree.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;

use crate::error::FsError;

/// Subdirectory holding the decoded package (the base module source).
pub const DECODED_DIR: &str = "decode_apk_dir";
/// Subdirectory holding the per-module output archives.
pub const MODULES_DIR: &str = "modules";
/// Stable-ID table written for the linker.
pub const PUBLIC_IDS_FILE: &str = "public.txt";
/// Compression config handed to the bundle builder.
pub const BUNDLE_CONFIG_FILE: &str = "BundleConfig.pb.json";
/// Unsigned, then signed, bundle inside the work tree.
pub const BUNDLE_FILE: &str = "base.aab";
/// Suffix of the scratch directory each module is assembled in.
pub const MODULE_WORK_SUFFIX: &str = "_temp";

/// Fixed entries directly under the work tree root.
pub const RESERVED_ENTRIES: [&str; 5] = [
    DECODED_DIR,
    MODULES_DIR,
    PUBLIC_IDS_FILE,
    BUNDLE_CONFIG_FILE,
    BUNDLE_FILE,
];

/// Distinguishes trees created by one process within the same second.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A uniquely named scratch directory owned by one run.
///
/// The tree is removed by [`WorkTree::teardown`], or when the value is
/// dropped, so it never outlives the run that created it.
#[derive(Debug)]
pub struct WorkTree {
    root: PathBuf,
    removed: bool,
}

impl WorkTree {
    /// Create a fresh tree named after the current local time, process id
    /// and a per-process sequence number.
    ///
    /// Fails when the name is already taken. A live tree of another run is
    /// never removed.
    pub fn create_unique(parent: &Path) -> Result<Self, FsError> {
        Self::create(parent, &unique_name())
    }

    /// Create `parent/name`. The directory must not exist yet.
    pub fn create(parent: &Path, name: &str) -> Result<Self, FsError> {
        let root = parent.join(name);
        fs::create_dir_all(parent).map_err(|e| FsError::io("create work tree", parent, e))?;

        match fs::create_dir(&root) {
            Ok(()) => Ok(Self {
                root,
                removed: false,
            }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // not ours to remove
                Err(FsError::invalid("create work tree", &root, "already exists"))
            }
            Err(e) => Err(FsError::io("create work tree", &root, e)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    pub fn decoded_dir(&self) -> PathBuf {
        self.join(DECODED_DIR)
    }

    pub fn modules_dir(&self) -> PathBuf {
        self.join(MODULES_DIR)
    }

    /// Output archive path for a module.
    pub fn module_archive(&self, module: &str) -> PathBuf {
        self.modules_dir().join(format!("{module}.zip"))
    }

    /// Scratch directory a module is assembled in.
    pub fn module_work_dir(&self, module: &str) -> PathBuf {
        self.join(format!("{module}{MODULE_WORK_SUFFIX}"))
    }

    pub fn public_ids(&self) -> PathBuf {
        self.join(PUBLIC_IDS_FILE)
    }

    pub fn bundle_config(&self) -> PathBuf {
        self.join(BUNDLE_CONFIG_FILE)
    }

    pub fn bundle(&self) -> PathBuf {
        self.join(BUNDLE_FILE)
    }

    /// Remove the tree. A partially built or already missing tree is fine.
    pub fn teardown(mut self) -> Result<(), FsError> {
        self.removed = true;
        super::files::delete(&self.root)
    }
}

impl Drop for WorkTree {
    fn drop(&mut self) {
        if !self.removed {
            let _ = fs::remove_dir_all(&self.root);
        }
    }
}

fn unique_name() -> String {
    format!(
        "temp_{}_{}_{}",
        Local::now().format("%Y%m%d%H%M%S"),
        std::process::id(),
        SEQUENCE.fetch_add(1, Ordering::Relaxed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn unique_name_is_timestamped() {
        let name = unique_name();
        let parts: Vec<&str> = name.strip_prefix("temp_").unwrap().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 14);
        assert!(parts[0].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[1], std::process::id().to_string());
        assert!(parts[2].parse::<u64>().is_ok());
    }

    #[test]
    fn back_to_back_trees_do_not_collide() {
        let parent = TempDir::new().unwrap();
        let first = WorkTree::create_unique(parent.path()).unwrap();
        fs::write(first.public_ids(), "ids").unwrap();

        let second = WorkTree::create_unique(parent.path()).unwrap();
        assert_ne!(first.root(), second.root());
        assert_eq!(fs::read_to_string(first.public_ids()).unwrap(), "ids");
    }

    #[test]
    fn create_refuses_existing_tree() {
        let parent = TempDir::new().unwrap();
        let live = parent.path().join("taken");
        fs::create_dir_all(&live).unwrap();
        fs::write(live.join("state"), "live").unwrap();

        let err = WorkTree::create(parent.path(), "taken").unwrap_err();
        assert!(matches!(err, FsError::Invalid { .. }));
        assert_eq!(fs::read_to_string(live.join("state")).unwrap(), "live");
    }

    #[test]
    fn teardown_removes_tree() {
        let parent = TempDir::new().unwrap();
        let tree = WorkTree::create_unique(parent.path()).unwrap();
        let root = tree.root().to_path_buf();
        fs::create_dir_all(tree.modules_dir()).unwrap();
        fs::write(tree.module_archive("base"), "zip").unwrap();

        tree.teardown().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn teardown_tolerates_missing_tree() {
        let parent = TempDir::new().unwrap();
        let tree = WorkTree::create(parent.path(), "gone").unwrap();
        fs::remove_dir_all(tree.root()).unwrap();
        tree.teardown().unwrap();
    }

    #[test]
    fn drop_removes_tree() {
        let parent = TempDir::new().unwrap();
        let root = {
            let tree = WorkTree::create(parent.path(), "dropped").unwrap();
            fs::write(tree.join("a"), "a").unwrap();
            tree.root().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn layout_paths() {
        let parent = TempDir::new().unwrap();
        let tree = WorkTree::create(parent.path(), "t").unwrap();
        assert!(tree.module_archive("pad").ends_with("modules/pad.zip"));
        assert!(tree.module_work_dir("base").ends_with("base_temp"));
        assert!(tree.decoded_dir().ends_with(DECODED_DIR));
    }
}
