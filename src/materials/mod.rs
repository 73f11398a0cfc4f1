//! Source material ingestion
//!
//! Walks the materials directory, reads markdown and plain text directly,
//! and hands other supported documents to an external converter. A file that
//! cannot be read or converted is recorded in the manifest and skipped; it
//! never aborts the scan.

mod cache;
mod convert;

pub use cache::{file_hash, ConversionCache};

use crate::config::MaterialsConfig;
use crate::error::MaterialsError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const MARKDOWN_EXTENSIONS: &[&str] = &[
    "md", "markdown", "mdown", "mkd", "mkdn", "mdwn", "mdt", "mdtext",
];

const TEXT_EXTENSIONS: &[&str] = &["txt"];

const CONVERTIBLE_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "doc", "pptx", "ppt", "xlsx", "xls", "html", "htm", "csv", "json", "xml",
    "epub", "jpg", "jpeg", "png", "gif", "bmp", "tiff", "mp3", "wav", "m4a", "flac", "zip",
];

const SEPARATOR_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Markdown,
    Text,
    Convertible,
    Unsupported,
}

impl MaterialKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) {
            MaterialKind::Markdown
        } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            MaterialKind::Text
        } else if CONVERTIBLE_EXTENSIONS.contains(&ext.as_str()) {
            MaterialKind::Convertible
        } else {
            MaterialKind::Unsupported
        }
    }
}

impl std::fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaterialKind::Markdown => write!(f, "markdown"),
            MaterialKind::Text => write!(f, "text"),
            MaterialKind::Convertible => write!(f, "convertible"),
            MaterialKind::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// A file found under the materials directory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialFile {
    /// Relative to the materials directory
    pub path: PathBuf,
    pub kind: MaterialKind,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EntryStatus {
    Read,
    Converted,
    Cached,
    Unsupported,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    #[serde(flatten)]
    pub file: MaterialFile,
    #[serde(flatten)]
    pub status: EntryStatus,
}

impl ManifestEntry {
    pub fn is_loaded(&self) -> bool {
        matches!(
            self.status,
            EntryStatus::Read | EntryStatus::Converted | EntryStatus::Cached
        )
    }
}

/// Concatenated material text plus what went into it
#[derive(Debug, Clone, Default)]
pub struct Materials {
    pub dir: PathBuf,
    pub raw_content: String,
    pub manifest: Vec<ManifestEntry>,
}

impl Materials {
    pub fn loaded_count(&self) -> usize {
        self.manifest.iter().filter(|e| e.is_loaded()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.manifest
            .iter()
            .filter(|e| matches!(e.status, EntryStatus::Failed { .. }))
    }
}

fn build_globset(patterns: &[String], label: &str) -> Result<GlobSet, MaterialsError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| MaterialsError::GlobPattern {
            pattern: pattern.clone(),
            source: e,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| MaterialsError::GlobPattern {
        pattern: label.to_string(),
        source: e,
    })
}

fn check_dir(dir: &Path) -> Result<(), MaterialsError> {
    if !dir.exists() {
        return Err(MaterialsError::NotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(MaterialsError::NotADirectory(dir.to_path_buf()));
    }
    Ok(())
}

/// List material files in path order without reading them
pub fn scan(dir: &Path, config: &MaterialsConfig) -> Result<Vec<MaterialFile>, MaterialsError> {
    check_dir(dir)?;
    let include_set = build_globset(&config.include, "include set")?;
    let exclude_set = build_globset(&config.exclude, "exclude set")?;

    let walker = WalkBuilder::new(dir)
        .hidden(true)
        .git_ignore(true)
        .git_exclude(true)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let rel_path = path.strip_prefix(dir).unwrap_or(path);
        if !config.include.is_empty() && !include_set.is_match(rel_path) {
            continue;
        }
        if exclude_set.is_match(rel_path) {
            continue;
        }

        let bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
        files.push(MaterialFile {
            path: rel_path.to_path_buf(),
            kind: MaterialKind::from_path(rel_path),
            bytes,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Name for a converted copy that cannot collide across subdirectories
fn converted_name(rel_path: &Path) -> String {
    let flat = rel_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("__");
    format!("{}.md", flat)
}

/// Load every supported file under `dir` into one text block
///
/// Converted documents are written to `converted_dir` and, when caching is
/// enabled, reused on later runs while the source bytes are unchanged.
pub async fn load_materials(
    dir: &Path,
    config: &MaterialsConfig,
    converted_dir: &Path,
) -> Result<Materials, MaterialsError> {
    let files = scan(dir, config)?;
    info!("Found {} files in {}", files.len(), dir.display());

    let mut cache = if config.cache {
        ConversionCache::load(converted_dir)
    } else {
        ConversionCache::default()
    };

    let mut blocks = Vec::new();
    let mut manifest = Vec::with_capacity(files.len());

    for file in files {
        let rel = file.path.display().to_string();
        let source = dir.join(&file.path);

        let loaded: Result<(String, EntryStatus), String> = match file.kind {
            MaterialKind::Unsupported => {
                warn!("Unsupported file type for {}", rel);
                manifest.push(ManifestEntry {
                    file,
                    status: EntryStatus::Unsupported,
                });
                continue;
            }
            MaterialKind::Markdown | MaterialKind::Text => fs::read_to_string(&source)
                .map(|text| (text, EntryStatus::Read))
                .map_err(|e| e.to_string()),
            MaterialKind::Convertible => {
                let converted = convert_cached(&source, &rel, config, converted_dir, &mut cache).await;
                // Persist each new conversion so an interrupted scan keeps its progress
                if config.cache && matches!(converted, Ok((_, EntryStatus::Converted))) {
                    if let Err(e) = cache.save(converted_dir) {
                        warn!("Could not save conversion cache: {}", e);
                    }
                }
                converted
            }
        };

        match loaded {
            Ok((text, status)) => {
                let header = if file.kind == MaterialKind::Convertible {
                    let ext = file
                        .path
                        .extension()
                        .map(|e| e.to_string_lossy().to_lowercase())
                        .unwrap_or_default();
                    format!("# File: {} (converted from .{})\n", rel, ext)
                } else {
                    format!("# File: {}\n", rel)
                };
                blocks.push(header);
                blocks.push(text);
                blocks.push(format!("\n{}\n", "=".repeat(SEPARATOR_WIDTH)));
                manifest.push(ManifestEntry { file, status });
            }
            Err(error) => {
                warn!("Could not load {}: {}", rel, error);
                manifest.push(ManifestEntry {
                    file,
                    status: EntryStatus::Failed { error },
                });
            }
        }
    }

    let materials = Materials {
        dir: dir.to_path_buf(),
        raw_content: blocks.join("\n"),
        manifest,
    };

    if materials.loaded_count() == 0 {
        return Err(MaterialsError::NoMaterials(dir.to_path_buf()));
    }

    info!(
        "Loaded {} files ({} chars), {} failed",
        materials.loaded_count(),
        materials.raw_content.len(),
        materials.failures().count()
    );
    Ok(materials)
}

async fn convert_cached(
    source: &Path,
    rel: &str,
    config: &MaterialsConfig,
    converted_dir: &Path,
    cache: &mut ConversionCache,
) -> Result<(String, EntryStatus), String> {
    let bytes = fs::read(source).map_err(|e| e.to_string())?;
    let hash = file_hash(&bytes);

    if config.cache {
        if let Some(text) = cache.lookup(rel, &hash) {
            info!("Using cached conversion: {}", rel);
            return Ok((text, EntryStatus::Cached));
        }
    }

    let markdown = convert::convert_to_markdown(&config.converter, source).await?;

    let target = converted_dir.join(converted_name(Path::new(rel)));
    fs::create_dir_all(converted_dir).map_err(|e| e.to_string())?;
    fs::write(&target, &markdown).map_err(|e| e.to_string())?;
    cache.record(rel, hash, target);

    Ok((markdown, EntryStatus::Converted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConverterConfig;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn config_with(command: &str) -> MaterialsConfig {
        MaterialsConfig {
            converter: ConverterConfig {
                command: command.to_string(),
                ..ConverterConfig::default()
            },
            ..MaterialsConfig::default()
        }
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(MaterialKind::from_path(Path::new("a.MD")), MaterialKind::Markdown);
        assert_eq!(MaterialKind::from_path(Path::new("a.txt")), MaterialKind::Text);
        assert_eq!(MaterialKind::from_path(Path::new("a.pdf")), MaterialKind::Convertible);
        assert_eq!(MaterialKind::from_path(Path::new("a.rs")), MaterialKind::Unsupported);
        assert_eq!(MaterialKind::from_path(Path::new("noext")), MaterialKind::Unsupported);
    }

    #[test]
    fn test_scan_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.md", "B");
        write(dir.path(), "a/notes.txt", "A");
        write(dir.path(), "drafts/old.md", "old");

        let mut config = MaterialsConfig::default();
        config.exclude = vec!["drafts/**".into()];
        let files = scan(dir.path(), &config).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("a/notes.txt"), PathBuf::from("b.md")]);
        assert_eq!(files[1].bytes, 1);
    }

    #[test]
    fn test_scan_missing_dir() {
        let err = scan(Path::new("/definitely/not/here"), &MaterialsConfig::default()).unwrap_err();
        assert!(matches!(err, MaterialsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_load_concatenates_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(dir.path(), "one.md", "First");
        write(dir.path(), "two.txt", "Second");
        write(dir.path(), "skip.bin", "ignored");

        let materials = load_materials(dir.path(), &config_with("cat"), out.path())
            .await
            .unwrap();

        let separator = "=".repeat(80);
        assert_eq!(
            materials.raw_content,
            format!(
                "# File: one.md\n\nFirst\n\n{sep}\n\n# File: two.txt\n\nSecond\n\n{sep}\n",
                sep = separator
            )
        );
        assert_eq!(materials.loaded_count(), 2);
        assert_eq!(materials.manifest.len(), 3);
        assert_eq!(materials.manifest[1].status, EntryStatus::Unsupported);
    }

    #[tokio::test]
    async fn test_conversion_failure_is_recorded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(dir.path(), "notes.md", "Notes");
        write(dir.path(), "paper.pdf", "%PDF");

        let materials = load_materials(dir.path(), &config_with("false"), out.path())
            .await
            .unwrap();

        assert_eq!(materials.loaded_count(), 1);
        let failed: Vec<_> = materials.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].file.path, PathBuf::from("paper.pdf"));
        assert!(!materials.raw_content.contains("paper.pdf"));
    }

    #[tokio::test]
    async fn test_slow_conversion_fails_only_that_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(dir.path(), "a.md", "Alpha");
        write(dir.path(), "page.html", "<p>Hi</p>");
        write(dir.path(), "slow.pdf", "%PDF");

        // The source path arrives as $0
        let config = MaterialsConfig {
            converter: ConverterConfig {
                command: "sh".into(),
                args: vec![
                    "-c".into(),
                    r#"case "$0" in *.pdf) sleep 5 ;; esac; cat "$0""#.into(),
                ],
                timeout_sec: 1,
            },
            ..MaterialsConfig::default()
        };
        let materials = load_materials(dir.path(), &config, out.path())
            .await
            .unwrap();

        assert_eq!(materials.loaded_count(), 2);
        assert!(materials.raw_content.starts_with("# File: a.md\n"));
        match &materials.manifest[2].status {
            EntryStatus::Failed { error } => assert!(error.contains("timed out after 1s"), "{}", error),
            other => panic!("expected failure, got {:?}", other),
        }

        let cache = ConversionCache::load(out.path());
        let hash = file_hash(b"<p>Hi</p>");
        assert_eq!(cache.lookup("page.html", &hash).as_deref(), Some("<p>Hi</p>"));
    }

    #[tokio::test]
    async fn test_conversion_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(dir.path(), "page.html", "<p>Hi</p>");

        let first = load_materials(dir.path(), &config_with("cat"), out.path())
            .await
            .unwrap();
        assert_eq!(first.manifest[0].status, EntryStatus::Converted);
        assert!(first
            .raw_content
            .starts_with("# File: page.html (converted from .html)\n"));
        assert!(out.path().join("page.html.md").exists());

        // A broken converter proves the second run never invokes it
        let second = load_materials(dir.path(), &config_with("false"), out.path())
            .await
            .unwrap();
        assert_eq!(second.manifest[0].status, EntryStatus::Cached);
        assert_eq!(second.raw_content, first.raw_content);
    }

    #[tokio::test]
    async fn test_nothing_loadable_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(dir.path(), "code.rs", "fn main() {}");

        let err = load_materials(dir.path(), &config_with("cat"), out.path())
            .await
            .unwrap_err();
        assert!(matches!(err, MaterialsError::NoMaterials(_)));
    }
}
