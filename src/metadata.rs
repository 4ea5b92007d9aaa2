//! Package identity recovered from a decoded package.
//!
//! The decoder leaves two files behind that matter here: `apktool.yml`
//! (SDK bounds, version, compression exemptions) and `AndroidManifest.xml`
//! (package name).

use std::fs;
use std::path::Path;

use serde_yaml::Value;

use crate::error::ParseError;

/// Build-metadata file written by the decoder.
pub const METADATA_FILE: &str = "apktool.yml";
/// Manifest of the decoded package.
pub const MANIFEST_FILE: &str = "AndroidManifest.xml";

/// Decoder-specific YAML type tag that generic YAML parsers reject.
const METADATA_TYPE_TAG: &str = "!!brut.androlib.meta.MetaInfo";

/// Identity and build parameters of the package being converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub package_name: String,
    pub min_sdk: u32,
    pub target_sdk: u32,
    pub version_code: u64,
    pub version_name: String,
    /// Globs the original package stored uncompressed, in declared order.
    pub do_not_compress: Vec<String>,
}

/// Build metadata portion of the descriptor, from `apktool.yml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadata {
    pub min_sdk: u32,
    pub target_sdk: u32,
    pub version_code: u64,
    pub version_name: String,
    pub do_not_compress: Vec<String>,
}

impl PackageDescriptor {
    /// Read the descriptor from a decoded package directory.
    pub fn from_decoded(dir: &Path) -> Result<Self, ParseError> {
        let meta = BuildMetadata::from_file(&dir.join(METADATA_FILE))?;
        let package_name = read_package_name(&dir.join(MANIFEST_FILE))?;

        Ok(Self {
            package_name,
            min_sdk: meta.min_sdk,
            target_sdk: meta.target_sdk,
            version_code: meta.version_code,
            version_name: meta.version_name,
            do_not_compress: meta.do_not_compress,
        })
    }
}

impl BuildMetadata {
    pub fn from_file(path: &Path) -> Result<Self, ParseError> {
        let content = read_text(path)?;
        Self::parse(&content, path)
    }

    /// Parse `apktool.yml` content. `path` is only used in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ParseError> {
        let content = content.replace(METADATA_TYPE_TAG, "");
        let data: Value =
            serde_yaml::from_str(&content).map_err(|e| ParseError::malformed(path, e))?;

        let sdk_info = data
            .get("sdkInfo")
            .ok_or_else(|| ParseError::missing_field(path, "sdkInfo"))?;
        let min_sdk = number_field(sdk_info, "minSdkVersion", path)?;
        // apktool omits targetSdkVersion when the manifest does not declare it
        let target_sdk = match sdk_info.get("targetSdkVersion") {
            Some(v) if !v.is_null() => parse_number(v, "targetSdkVersion", path)?,
            _ => min_sdk,
        };

        let version_info = data
            .get("versionInfo")
            .ok_or_else(|| ParseError::missing_field(path, "versionInfo"))?;
        let version_code = number_field(version_info, "versionCode", path)?;
        let version_name = version_info
            .get("versionName")
            .and_then(scalar_text)
            .ok_or_else(|| ParseError::missing_field(path, "versionInfo.versionName"))?;

        let do_not_compress = match data.get("doNotCompress") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| {
                    scalar_text(item).ok_or_else(|| {
                        ParseError::malformed(path, "doNotCompress entries must be scalars")
                    })
                })
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(ParseError::malformed(path, "doNotCompress must be a list"));
            }
        };

        Ok(Self {
            min_sdk: sdk_level(min_sdk, "minSdkVersion", path)?,
            target_sdk: sdk_level(target_sdk, "targetSdkVersion", path)?,
            version_code,
            version_name,
            do_not_compress,
        })
    }
}

/// Read the `package` attribute of the manifest's root element.
pub fn read_package_name(manifest: &Path) -> Result<String, ParseError> {
    let content = read_text(manifest)?;
    let doc = roxmltree::Document::parse(&content).map_err(|e| ParseError::malformed(manifest, e))?;

    doc.root_element()
        .attribute("package")
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ParseError::missing_field(manifest, "manifest@package"))
}

pub(crate) fn read_text(path: &Path) -> Result<String, ParseError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ParseError::Missing(path.to_path_buf()))
        }
        Err(source) => Err(ParseError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn number_field(parent: &Value, field: &str, path: &Path) -> Result<u64, ParseError> {
    let value = parent
        .get(field)
        .filter(|v| !v.is_null())
        .ok_or_else(|| ParseError::missing_field(path, field))?;
    parse_number(value, field, path)
}

/// apktool quotes some numbers ('21'), so accept both forms.
fn parse_number(value: &Value, field: &str, path: &Path) -> Result<u64, ParseError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ParseError::malformed(path, format!("{field} is not a number")))
}

fn sdk_level(value: u64, field: &str, path: &Path) -> Result<u32, ParseError> {
    u32::try_from(value)
        .map_err(|_| ParseError::malformed(path, format!("{field} {value} is out of range")))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
