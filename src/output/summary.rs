use crate::engine::{Context, ItemFailure};
use crate::error::OutputError;
use chrono::Utc;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::persist;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub timestamp: String,
    pub topic: String,
    pub materials_dir: PathBuf,
    pub files_loaded: usize,
    pub files_failed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline_title: Option<String>,
    pub sections_total: usize,
    pub leaves_total: usize,
    pub sections_written: usize,
    pub sections_failed: Vec<ItemFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub document_chars: usize,
    pub artifacts: Vec<PathBuf>,
}

impl RunSummary {
    pub fn from_context(ctx: &Context) -> Self {
        let (files_loaded, files_failed) = match &ctx.materials {
            Some(materials) => (
                materials.loaded_count(),
                materials
                    .failures()
                    .map(|e| e.file.path.display().to_string())
                    .collect(),
            ),
            None => (0, Vec::new()),
        };

        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            topic: ctx.input.topic.clone(),
            materials_dir: ctx.input.materials_dir.clone(),
            files_loaded,
            files_failed,
            outline_title: ctx.outline.as_ref().map(|o| o.title().to_string()),
            sections_total: ctx.outline.as_ref().map(|o| o.len()).unwrap_or(0),
            leaves_total: ctx.outline.as_ref().map(|o| o.leaves().len()).unwrap_or(0),
            sections_written: ctx.writing.results.len(),
            sections_failed: ctx.writing.failures.clone(),
            output_path: ctx.output.as_ref().map(|o| o.path.clone()),
            document_chars: ctx.output.as_ref().map(|o| o.document.chars().count()).unwrap_or(0),
            artifacts: ctx.artifacts.clone(),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Report Summary ===");
        if !self.topic.is_empty() {
            let _ = writeln!(out, "Topic: {}", self.topic);
        }
        let _ = writeln!(
            out,
            "Materials: {} files loaded from {}",
            self.files_loaded,
            self.materials_dir.display()
        );
        for failed in &self.files_failed {
            let _ = writeln!(out, "  failed: {}", failed);
        }
        if let Some(title) = &self.outline_title {
            let _ = writeln!(
                out,
                "Outline: '{}' ({} sections, {} leaves)",
                title, self.sections_total, self.leaves_total
            );
        }
        if self.sections_written > 0 || !self.sections_failed.is_empty() {
            let _ = writeln!(
                out,
                "Sections written: {}, failed: {}",
                self.sections_written,
                self.sections_failed.len()
            );
        }
        for failure in &self.sections_failed {
            let _ = writeln!(
                out,
                "  section {} failed after {} attempts: {}",
                failure.key, failure.attempts, failure.error
            );
        }
        if let Some(path) = &self.output_path {
            let _ = writeln!(
                out,
                "Report: {} ({} chars)",
                path.display(),
                self.document_chars
            );
        }
        for artifact in &self.artifacts {
            let _ = writeln!(out, "Artifact: {}", artifact.display());
        }
        out
    }
}

/// Write `summary.json` into `dir`
pub fn write_summary(dir: &Path, summary: &RunSummary) -> Result<PathBuf, OutputError> {
    let json = serde_json::to_string_pretty(summary)?;
    persist(&json, &dir.join("summary.json"))
}
