use crate::assemble::assemble;
use crate::config::{AssemblyConfig, RetryConfig};
use crate::engine::{Attempt, AttemptInfo, Context, Node, OutputRecord, DEFAULT_SIGNAL};
use crate::error::{ExecutionError, NodeError};
use crate::outline::Outline;
use crate::output::{persist, report_path};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct AssembleInput {
    pub outline: Outline,
    pub path: PathBuf,
}

/// Linearizes the written outline and saves the report
pub struct AssembleReport {
    pub config: AssemblyConfig,
    pub output_dir: PathBuf,
    pub stamp: Option<String>,
    pub retry: RetryConfig,
}

#[async_trait]
impl Node for AssembleReport {
    type Input = AssembleInput;
    type Output = OutputRecord;

    fn name(&self) -> &str {
        "assemble"
    }

    fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    fn prepare(&self, ctx: &Context) -> Result<AssembleInput, NodeError> {
        let outline = ctx
            .outline
            .clone()
            .ok_or_else(|| NodeError::MissingContext("outline.tree".into()))?;
        let path = report_path(&self.output_dir, outline.title(), self.stamp.as_deref());
        Ok(AssembleInput { outline, path })
    }

    async fn execute(&self, input: &AssembleInput, _attempt: AttemptInfo) -> Attempt<OutputRecord> {
        let document = match assemble(&input.outline, &self.config) {
            Ok(document) => document,
            Err(e) => return Attempt::Fatal(e.into()),
        };
        persist(&document, &input.path)
            .map(|path| OutputRecord { document, path })
            .map_err(ExecutionError::from)
            .into()
    }

    fn finalize(
        &self,
        ctx: &mut Context,
        _input: AssembleInput,
        record: OutputRecord,
    ) -> Result<String, NodeError> {
        if record.document.trim().is_empty() {
            warn!("Assembled report is empty; no section has content");
        }
        info!(
            "Saved report to {} ({} chars)",
            record.path.display(),
            record.document.chars().count()
        );
        ctx.output = Some(record);
        Ok(DEFAULT_SIGNAL.to_string())
    }
}
