//! Zip packaging of module directories and unpacking of linked containers.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::files::{list_files, relative_slash_path};
use crate::error::FsError;

/// Zip every file under `dir` into `out`.
///
/// Entry names are `/`-separated paths relative to `dir`, written in sorted
/// order so the archive does not depend on directory iteration order.
pub fn zip_directory(dir: &Path, out: &Path) -> Result<(), FsError> {
    if !dir.is_dir() {
        return Err(FsError::invalid("zip", dir, "not a directory"));
    }
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).map_err(|e| FsError::io("zip", parent, e))?;
    }

    let file = File::create(out).map_err(|e| FsError::io("zip", out, e))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for rel in list_files(dir)? {
        let name = relative_slash_path(&rel);
        let src = dir.join(&rel);

        writer
            .start_file(name, options)
            .map_err(|e| FsError::archive("zip", out, e))?;
        let mut input = File::open(&src).map_err(|e| FsError::io("zip", &src, e))?;
        io::copy(&mut input, &mut writer).map_err(|e| FsError::io("zip", &src, e))?;
    }

    writer
        .finish()
        .map_err(|e| FsError::archive("zip", out, e))?;
    Ok(())
}

/// Extract every entry of `archive` under `out_dir`.
///
/// Entries whose names would escape `out_dir` are rejected. Returns the
/// extracted files relative to `out_dir`.
pub fn unzip_archive(archive: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, FsError> {
    let file = File::open(archive).map_err(|e| FsError::io("unzip", archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| FsError::archive("unzip", archive, e))?;

    fs::create_dir_all(out_dir).map_err(|e| FsError::io("unzip", out_dir, e))?;
    let mut extracted = Vec::new();

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| FsError::archive("unzip", archive, e))?;
        let relative_path = match entry.enclosed_name() {
            Some(path) => path,
            None => {
                return Err(FsError::invalid(
                    "unzip",
                    archive,
                    format!("entry '{}' escapes the output directory", entry.name()),
                ))
            }
        };

        let target = out_dir.join(&relative_path);
        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| FsError::io("unzip", &target, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::io("unzip", parent, e))?;
        }
        let mut outfile = File::create(&target).map_err(|e| FsError::io("unzip", &target, e))?;
        io::copy(&mut entry, &mut outfile).map_err(|e| FsError::io("unzip", &target, e))?;

        extracted.push(relative_path);
    }

    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn zip_then_unzip_reproduces_tree() {
        let tmp = TempDir::new().unwrap();
        let module = tmp.path().join("base");
        write(&module.join("manifest/AndroidManifest.xml"), b"<manifest/>");
        write(&module.join("dex/classes.dex"), &[0x64, 0x65, 0x78, 0x0a, 0x00, 0xff]);
        write(&module.join("assets/videos/a.mp4"), &vec![7u8; 4096]);
        write(&module.join("resources.pb"), b"pb");

        let archive = tmp.path().join("out/base.zip");
        zip_directory(&module, &archive).unwrap();

        let restored = tmp.path().join("restored");
        let mut extracted = unzip_archive(&archive, &restored).unwrap();
        extracted.sort();

        let original = list_files(&module).unwrap();
        assert_eq!(extracted, original);
        for rel in original {
            assert_eq!(
                fs::read(module.join(&rel)).unwrap(),
                fs::read(restored.join(&rel)).unwrap(),
                "content differs for {}",
                rel.display()
            );
        }
    }

    #[test]
    fn zip_entries_are_sorted_slash_paths() {
        let tmp = TempDir::new().unwrap();
        let module = tmp.path().join("m");
        write(&module.join("z.txt"), b"z");
        write(&module.join("a/b.txt"), b"b");

        let archive = tmp.path().join("m.zip");
        zip_directory(&module, &archive).unwrap();

        let mut zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["a/b.txt", "z.txt"]);
    }

    #[test]
    fn zip_rejects_missing_directory() {
        let tmp = TempDir::new().unwrap();
        assert!(zip_directory(&tmp.path().join("missing"), &tmp.path().join("o.zip")).is_err());
    }

    #[test]
    fn unzip_rejects_escaping_entries() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("evil.zip");
        let mut writer = ZipWriter::new(File::create(&archive).unwrap());
        writer
            .start_file("../outside.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"x").unwrap();
        writer.finish().unwrap();

        let err = unzip_archive(&archive, &tmp.path().join("out")).unwrap_err();
        assert!(err.to_string().contains("escapes"));
        assert!(!tmp.path().join("outside.txt").exists());
    }

    #[test]
    fn unzip_rejects_non_archive() {
        let tmp = TempDir::new().unwrap();
        let bogus = tmp.path().join("bogus.apk");
        fs::write(&bogus, "not a zip").unwrap();
        assert!(unzip_archive(&bogus, &tmp.path().join("out")).is_err());
    }
}
