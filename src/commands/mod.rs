//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `build` - Convert an APK into a signed AAB
//! - `preflight` - Run preflight checks
//! - `show` - Display information

pub mod build;
mod preflight;
pub mod show;

pub use build::cmd_build;
pub use preflight::cmd_preflight;
pub use show::cmd_show;
