use crate::config::{OutlineFormat, RetryConfig};
use crate::engine::{Attempt, AttemptInfo, Context, Node, DEFAULT_SIGNAL};
use crate::error::{ExecutionError, NodeError, OutputError};
use crate::outline::Outline;
use crate::output::{save_analysis, save_outline_artifact};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct SaveInput {
    pub outline: Outline,
    pub analysis: Option<String>,
}

/// Writes the analysis summary and outline under `<dir>/intermediate/`
pub struct SaveOutline {
    pub output_dir: PathBuf,
    pub format: OutlineFormat,
    pub stamp: Option<String>,
    pub retry: RetryConfig,
}

impl SaveOutline {
    fn write_artifacts(&self, input: &SaveInput) -> Result<Vec<PathBuf>, OutputError> {
        let stamp = self.stamp.as_deref();
        let mut written = Vec::with_capacity(2);
        if let Some(analysis) = &input.analysis {
            written.push(save_analysis(&self.output_dir, analysis, stamp)?);
        }
        written.push(save_outline_artifact(
            &self.output_dir,
            &input.outline,
            self.format,
            stamp,
        )?);
        Ok(written)
    }
}

#[async_trait]
impl Node for SaveOutline {
    type Input = SaveInput;
    type Output = Vec<PathBuf>;

    fn name(&self) -> &str {
        "save_outline"
    }

    fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    fn prepare(&self, ctx: &Context) -> Result<SaveInput, NodeError> {
        let outline = ctx
            .outline
            .clone()
            .ok_or_else(|| NodeError::MissingContext("outline.tree".into()))?;
        Ok(SaveInput {
            outline,
            analysis: ctx.analysis.clone(),
        })
    }

    async fn execute(&self, input: &SaveInput, _attempt: AttemptInfo) -> Attempt<Vec<PathBuf>> {
        self.write_artifacts(input)
            .map_err(ExecutionError::from)
            .into()
    }

    fn finalize(
        &self,
        ctx: &mut Context,
        _input: SaveInput,
        written: Vec<PathBuf>,
    ) -> Result<String, NodeError> {
        for path in &written {
            info!("Saved {}", path.display());
        }
        ctx.artifacts.extend(written);
        Ok(DEFAULT_SIGNAL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Stage, Step};
    use crate::outline::{load_outline, test_node as node};
    use crate::stages::fixtures::context_with_materials;

    #[tokio::test]
    async fn test_saves_analysis_and_outline() {
        let dir = tempfile::tempdir().unwrap();
        let step = Step(SaveOutline {
            output_dir: dir.path().to_path_buf(),
            format: OutlineFormat::Json,
            stamp: Some("20250102_030405".into()),
            retry: RetryConfig::once(),
        });

        let mut ctx = context_with_materials("t", "raw");
        ctx.analysis = Some("knowledge".into());
        ctx.outline = Some(
            Outline::new("T", vec![node("1", "A", vec![node("1.1", "B", vec![])])]).unwrap(),
        );
        step.run(&mut ctx).await.unwrap();

        let analysis = dir
            .path()
            .join("intermediate/analysis/analysis_20250102_030405.md");
        let outline = dir
            .path()
            .join("intermediate/outline/outline_20250102_030405.json");
        assert_eq!(ctx.artifacts, vec![analysis.clone(), outline.clone()]);
        assert_eq!(std::fs::read_to_string(analysis).unwrap(), "knowledge");
        assert_eq!(load_outline(&outline).unwrap().len(), 2);
    }
}
