//! Copy, move, delete and listing primitives.

use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::FsError;

/// Copy a file or a directory tree to `dst`, creating parent directories.
///
/// Directories are merged into an existing destination; files already at
/// the destination are overwritten.
pub fn copy(src: &Path, dst: &Path) -> Result<(), FsError> {
    let meta = fs::metadata(src).map_err(|e| FsError::io("copy", src, e))?;

    if meta.is_file() {
        ensure_parent(dst, "copy")?;
        fs::copy(src, dst).map_err(|e| FsError::io("copy", src, e))?;
        return Ok(());
    }

    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            FsError::io("copy", &path, e.into())
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| FsError::invalid("copy", entry.path(), e.to_string()))?;
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| FsError::io("copy", &target, e))?;
        } else {
            ensure_parent(&target, "copy")?;
            fs::copy(entry.path(), &target).map_err(|e| FsError::io("copy", entry.path(), e))?;
        }
    }
    Ok(())
}

/// Move a file or directory to `dst`, creating parent directories.
///
/// Falls back to copy-then-delete when a rename is not possible (e.g. across
/// filesystems).
pub fn move_path(src: &Path, dst: &Path) -> Result<(), FsError> {
    if !src.exists() {
        return Err(FsError::invalid("move", src, "source does not exist"));
    }
    ensure_parent(dst, "move")?;

    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    copy(src, dst)?;
    delete(src)
}

/// Delete a file or directory tree. A missing path is not an error.
pub fn delete(path: &Path) -> Result<(), FsError> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(FsError::io("delete", path, e)),
    };

    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FsError::io("delete", path, e)),
    }
}

/// List every file under `dir` as a path relative to `dir`, sorted.
///
/// A missing directory yields an empty list.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>, FsError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            FsError::io("list", &path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| FsError::invalid("list", entry.path(), e.to_string()))?;
        files.push(rel.to_path_buf());
    }
    files.sort();
    Ok(files)
}

/// Render a relative path with `/` separators and no leading separator.
pub fn relative_slash_path(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn ensure_parent(path: &Path, op: &'static str) -> Result<(), FsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| FsError::io(op, parent, e))?;
    }
    Ok(())
}
