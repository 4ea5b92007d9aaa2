//! apk2aab library exports.
//!
//! The binary is a thin CLI over these modules; integration tests drive the
//! same API with a fake process runner.

pub mod assembler;
pub mod bundle_config;
pub mod config;
pub mod driver;
pub mod error;
pub mod metadata;
pub mod preflight;
pub mod process;
pub mod public_ids;
pub mod report;
pub mod split;
pub mod stage;
pub mod staging;
pub mod timing;
pub mod tools;

pub use config::Config;
pub use driver::{BuildRequest, Bundler, RunSummary, SplitRequest};
pub use error::PipelineError;
