//! Filesystem staging: the per-run work tree and the copy/move/delete/zip
//! primitives every other stage is built on.
//!
//! Each primitive returns `Result<_, FsError>` so callers can log and turn
//! the failure into a stage failure.

pub mod archive;
pub mod files;
pub mod temp;

pub use archive::{unzip_archive, zip_directory};
pub use files::{copy, delete, list_files, move_path, relative_slash_path};
pub use temp::{WorkTree, MODULE_WORK_SUFFIX, RESERVED_ENTRIES};
