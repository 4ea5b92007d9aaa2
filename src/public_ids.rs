//! Stable resource-ID table.
//!
//! Every module links against the same `public.txt` so resource IDs stay
//! identical to the original package across modules.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::{FsError, ParseError};
use crate::metadata::read_text;

/// Public resource declarations inside a decoded package.
pub const PUBLIC_XML: &str = "res/values/public.xml";

/// One `(type, name, id)` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub resource_type: String,
    pub name: String,
    pub id: u32,
}

/// Resource IDs of one package, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdTable {
    pub package: String,
    pub entries: Vec<ResourceId>,
}

impl ResourceIdTable {
    /// Read a `public.xml` declaration file.
    pub fn from_public_xml(path: &Path, package: &str) -> Result<Self, ParseError> {
        let content = read_text(path)?;
        let doc = roxmltree::Document::parse(&content).map_err(|e| ParseError::malformed(path, e))?;

        let mut entries = Vec::new();
        for node in doc.root_element().children().filter(|n| n.is_element()) {
            let attr = |name: &str| {
                node.attribute(name).ok_or_else(|| {
                    ParseError::malformed(
                        path,
                        format!(
                            "<{}> at byte {} has no '{name}' attribute",
                            node.tag_name().name(),
                            node.range().start
                        ),
                    )
                })
            };
            let resource_type = attr("type")?;
            let name = attr("name")?;
            let raw_id = attr("id")?;
            let id = parse_id(raw_id)
                .ok_or_else(|| ParseError::malformed(path, format!("invalid id '{raw_id}'")))?;

            entries.push(ResourceId {
                resource_type: resource_type.to_string(),
                name: name.to_string(),
                id,
            });
        }

        Ok(Self {
            package: package.to_string(),
            entries,
        })
    }

    /// Parse a stable-ID file previously written by [`ResourceIdTable::write`].
    ///
    /// Lines for other packages are rejected; blank lines are skipped. `path`
    /// is only used in error messages.
    pub fn parse_stable_ids(text: &str, package: &str, path: &Path) -> Result<Self, ParseError> {
        let mut entries = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let bad = || ParseError::malformed(path, format!("line {}: '{line}'", idx + 1));
            let (key, id) = line.split_once(" = ").ok_or_else(bad)?;
            let (pkg, rest) = key.split_once(':').ok_or_else(bad)?;
            if pkg != package {
                return Err(ParseError::malformed(
                    path,
                    format!("line {}: package '{pkg}' != '{package}'", idx + 1),
                ));
            }
            let (resource_type, name) = rest.split_once('/').ok_or_else(bad)?;
            let id = parse_id(id.trim()).ok_or_else(bad)?;
            entries.push(ResourceId {
                resource_type: resource_type.to_string(),
                name: name.to_string(),
                id,
            });
        }
        Ok(Self {
            package: package.to_string(),
            entries,
        })
    }

    /// Render the table as `<package>:<type>/<name> = 0x<id>` lines.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(
                out,
                "{}:{}/{} = 0x{:08x}",
                self.package, entry.resource_type, entry.name, entry.id
            );
        }
        out
    }

    pub fn write(&self, path: &Path) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::io("write stable ids", parent, e))?;
        }
        fs::write(path, self.render()).map_err(|e| FsError::io("write stable ids", path, e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Record the stable-ID table of a decoded package at `out`.
pub fn record_public_ids(
    out: &Path,
    decoded_dir: &Path,
    package: &str,
) -> Result<ResourceIdTable, crate::error::StageFailure> {
    let table = ResourceIdTable::from_public_xml(&decoded_dir.join(PUBLIC_XML), package)?;
    table.write(out)?;
    Ok(table)
}

fn parse_id(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}
