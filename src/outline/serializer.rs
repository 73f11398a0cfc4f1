//! Textual persistence for outlines (YAML or JSON)
//!
//! The persisted shape nests sections under `children`. Older flat outlines
//! (`chapters` with integer indices) and the `subsections` spelling are
//! accepted when reading.

use crate::config::OutlineFormat;
use crate::error::OutlineError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::tree::Outline;

/// Serialized form of a whole outline
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutlineDocument {
    #[serde(default)]
    pub title: String,

    #[serde(alias = "chapters")]
    pub sections: Vec<SectionNode>,
}

/// Serialized form of one section and its subtree
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SectionNode {
    #[serde(deserialize_with = "index_from_any")]
    pub index: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, alias = "subsections", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SectionNode>,
}

// Generated and hand-written outlines use `index: 2` as often as `index: "2"`.
// A bare `2.10` parses as the number 2.1, so dotted indices must be quoted.
fn index_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawIndex {
        Text(String),
        Integer(u64),
        Float(f64),
    }

    match RawIndex::deserialize(deserializer)? {
        RawIndex::Text(s) => Ok(s.trim().to_string()),
        RawIndex::Integer(n) => Ok(n.to_string()),
        RawIndex::Float(f) => Err(serde::de::Error::custom(format!(
            "Malformed section index {}: dotted indices must be quoted strings",
            f
        ))),
    }
}

impl OutlineFormat {
    /// Pick a format from the file extension, falling back to content sniffing
    pub fn detect(path: &Path, text: &str) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("json") => OutlineFormat::Json,
            Some("yaml") | Some("yml") => OutlineFormat::Yaml,
            _ => {
                if text.trim_start().starts_with('{') {
                    OutlineFormat::Json
                } else {
                    OutlineFormat::Yaml
                }
            }
        }
    }
}

pub fn serialize(outline: &Outline, format: OutlineFormat) -> Result<String, OutlineError> {
    let document = outline.to_document();
    let text = match format {
        OutlineFormat::Yaml => serde_yaml::to_string(&document)?,
        OutlineFormat::Json => serde_json::to_string_pretty(&document)?,
    };
    Ok(text)
}

/// Parse and validate an outline
pub fn deserialize(text: &str, format: OutlineFormat) -> Result<Outline, OutlineError> {
    let document: OutlineDocument = match format {
        OutlineFormat::Yaml => serde_yaml::from_str(text)?,
        OutlineFormat::Json => serde_json::from_str(text)?,
    };
    Ok(Outline::from_document(document)?)
}

pub fn load_outline(path: &Path) -> Result<Outline, OutlineError> {
    let text = fs::read_to_string(path).map_err(|e| OutlineError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let format = OutlineFormat::detect(path, &text);
    let outline = deserialize(&text, format)?;
    info!(
        "Loaded outline '{}' with {} sections from {}",
        outline.title(),
        outline.len(),
        path.display()
    );
    Ok(outline)
}

/// Write an outline, replacing any previous file at `path`
pub fn save_outline(
    outline: &Outline,
    path: &Path,
    format: OutlineFormat,
) -> Result<PathBuf, OutlineError> {
    let text = serialize(outline, format)?;
    let write_err = |e| OutlineError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, text).map_err(write_err)?;
    Ok(path.to_path_buf())
}
