//! Compression-exemption set and the bundle builder's config file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FsError;

/// Version recorded in the generated bundle config.
pub const BUNDLETOOL_CONFIG_VERSION: &str = "1.2.3";

/// Prefix of legacy signing metadata that must stay compressible.
const LEGACY_METADATA_PREFIX: &str = "META-INF";

/// Media and byte-code files always stored uncompressed.
pub const BUILTIN_UNCOMPRESSED_GLOBS: &[&str] = &[
    "**.3[gG]2",
    "**.3[gG][pP]",
    "**.3[gG][pP][pP]",
    "**.3[gG][pP][pP]2",
    "**.[aA][aA][cC]",
    "**.[aA][mM][rR]",
    "**.[aA][wW][bB]",
    "**.[gG][iI][fF]",
    "**.[iI][mM][yY]",
    "**.[jJ][eE][tT]",
    "**.[jJ][pP][eE][gG]",
    "**.[jJ][pP][gG]",
    "**.[mM]4[aA]",
    "**.[mM]4[vV]",
    "**.[mM][iI][dD]",
    "**.[mM][iI][dD][iI]",
    "**.[mM][kK][vV]",
    "**.[mM][pP]2",
    "**.[mM][pP]3",
    "**.[mM][pP]4",
    "**.[mM][pP][eE][gG]",
    "**.[mM][pP][gG]",
    "**.[oO][gG][gG]",
    "**.[oO][pP][uU][sS]",
    "**.[pP][nN][gG]",
    "**.[rR][tT][tT][tT][lL]",
    "**.[sS][mM][fF]",
    "**.[tT][fF][lL][iI][tT][eE]",
    "**.[wW][aA][vV]",
    "**.[wW][eE][bB][mM]",
    "**.[wW][eE][bB][pP]",
    "**.[wW][mM][aA]",
    "**.[wW][mM][vV]",
    "**.[xX][mM][fF]",
];

/// `BundleConfig.pb.json` as understood by the bundle builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleConfig {
    pub bundletool: BundletoolSection,
    pub compression: CompressionSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundletoolSection {
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionSection {
    #[serde(rename = "uncompressedGlob")]
    pub uncompressed_glob: Vec<String>,
}

/// Package-declared exemptions, minus legacy signing metadata, followed by
/// the built-in list. Duplicates are kept.
pub fn compression_exemptions(do_not_compress: &[String]) -> Vec<String> {
    do_not_compress
        .iter()
        .filter(|glob| !glob.starts_with(LEGACY_METADATA_PREFIX))
        .cloned()
        .chain(BUILTIN_UNCOMPRESSED_GLOBS.iter().map(|g| g.to_string()))
        .collect()
}

impl BundleConfig {
    pub fn new(do_not_compress: &[String]) -> Self {
        Self {
            bundletool: BundletoolSection {
                version: BUNDLETOOL_CONFIG_VERSION.to_string(),
            },
            compression: CompressionSection {
                uncompressed_glob: compression_exemptions(do_not_compress),
            },
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), FsError> {
        let json = serde_json::to_string(self)
            .map_err(|e| FsError::invalid("write bundle config", path, e.to_string()))?;
        fs::write(path, json).map_err(|e| FsError::io("write bundle config", path, e))
    }
}
