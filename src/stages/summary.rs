use crate::config::RetryConfig;
use crate::engine::{Attempt, AttemptInfo, Context, Node, DEFAULT_SIGNAL};
use crate::error::{ExecutionError, NodeError};
use crate::output::{write_summary, RunSummary};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

/// Composes the run summary, optionally writing `summary.json`
pub struct Summarize {
    pub json_dir: Option<PathBuf>,
    pub retry: RetryConfig,
}

#[async_trait]
impl Node for Summarize {
    type Input = RunSummary;
    type Output = (String, Option<PathBuf>);

    fn name(&self) -> &str {
        "summary"
    }

    fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    fn prepare(&self, ctx: &Context) -> Result<RunSummary, NodeError> {
        Ok(RunSummary::from_context(ctx))
    }

    async fn execute(&self, summary: &RunSummary, _attempt: AttemptInfo) -> Attempt<Self::Output> {
        let text = summary.render_text();
        let written = match &self.json_dir {
            Some(dir) => write_summary(dir, summary).map(Some),
            None => Ok(None),
        };
        written
            .map(|path| (text, path))
            .map_err(ExecutionError::from)
            .into()
    }

    fn finalize(
        &self,
        ctx: &mut Context,
        _summary: RunSummary,
        (text, written): Self::Output,
    ) -> Result<String, NodeError> {
        if let Some(path) = written {
            info!("Wrote run summary to {}", path.display());
            ctx.artifacts.push(path);
        }
        ctx.summary = Some(text);
        Ok(DEFAULT_SIGNAL.to_string())
    }
}
