mod summary;

pub use summary::{write_summary, RunSummary};

use crate::config::OutlineFormat;
use crate::error::OutputError;
use crate::outline::{save_outline, Outline};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Local time stamp used in generated file names
pub fn timestamp_now() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Filesystem-safe name derived from a title
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_sep = false;
    for c in title.to_lowercase().chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_sep = true;
        }
    }
    let slug = slug.trim_matches('_').to_string();
    if slug.is_empty() {
        "report".to_string()
    } else {
        slug
    }
}

fn stamped(stem: &str, stamp: Option<&str>, extension: &str) -> String {
    match stamp {
        Some(stamp) => format!("{}_{}.{}", stem, stamp, extension),
        None => format!("{}.{}", stem, extension),
    }
}

pub fn report_path(dir: &Path, title: &str, stamp: Option<&str>) -> PathBuf {
    dir.join(stamped(&slugify(title), stamp, "md"))
}

/// Write `text` to `path`, replacing any earlier file
pub fn persist(text: &str, path: &Path) -> Result<PathBuf, OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| OutputError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }
    fs::write(path, text).map_err(|e| OutputError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(path.to_path_buf())
}

pub fn intermediate_dir(output_dir: &Path, category: &str) -> PathBuf {
    output_dir.join("intermediate").join(category)
}

pub fn save_analysis(
    output_dir: &Path,
    analysis: &str,
    stamp: Option<&str>,
) -> Result<PathBuf, OutputError> {
    let path = intermediate_dir(output_dir, "analysis").join(stamped("analysis", stamp, "md"));
    persist(analysis, &path)
}

pub fn save_outline_artifact(
    output_dir: &Path,
    outline: &Outline,
    format: OutlineFormat,
    stamp: Option<&str>,
) -> Result<PathBuf, OutputError> {
    let path = intermediate_dir(output_dir, "outline").join(stamped("outline", stamp, format.extension()));
    Ok(save_outline(outline, &path, format)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Machine Learning in Healthcare"), "machine_learning_in_healthcare");
        assert_eq!(slugify("  GPU-Accelerated   Ray Tracing: A Survey! "), "gpu_accelerated_ray_tracing_a_survey");
        assert_eq!(slugify("???"), "report");
    }

    #[test]
    fn test_report_path() {
        let dir = Path::new("output");
        assert_eq!(
            report_path(dir, "My Report", Some("20250101_120000")),
            PathBuf::from("output/my_report_20250101_120000.md")
        );
        assert_eq!(report_path(dir, "My Report", None), PathBuf::from("output/my_report.md"));
    }

    #[test]
    fn test_persist_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/report.md");
        persist("first version, longer", &path).unwrap();
        persist("second", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_intermediate_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_analysis(dir.path(), "summary", None).unwrap();
        assert_eq!(path, dir.path().join("intermediate/analysis/analysis.md"));
    }
}
