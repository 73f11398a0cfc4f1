use crate::config::{BatchConfig, RetryConfig};
use crate::engine::{
    Attempt, AttemptInfo, BatchNode, Context, ItemOutcome, DEFAULT_SIGNAL,
};
use crate::error::NodeError;
use crate::prompts::{render, truncate_chars, PromptSet};
use crate::provider::{Inference, InferenceRequest};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use super::infer_attempt;

const NO_PREVIOUS_SECTION: &str = "(none, this is the first section)";

/// Text every section prompt carries
pub struct SharedInputs {
    pub report_title: String,
    pub analysis: String,
    pub materials: String,
}

impl fmt::Debug for SharedInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedInputs")
            .field("report_title", &self.report_title)
            .field("analysis_chars", &self.analysis.len())
            .field("materials_chars", &self.materials.len())
            .finish()
    }
}

/// One leaf section to write
#[derive(Debug, Clone)]
pub struct SectionJob {
    pub index: String,
    pub title: String,
    pub description: String,
    /// Ancestry from the top-level section down to this one
    pub path: String,
    pub previous: String,
    pub shared: Arc<SharedInputs>,
}

/// Writes every leaf section that has no content yet
pub struct WriteSections {
    pub inference: Arc<dyn Inference>,
    pub prompts: Arc<PromptSet>,
    pub retry: RetryConfig,
    pub policy: BatchConfig,
    pub writing_chars: usize,
}

impl WriteSections {
    fn request_for(&self, job: &SectionJob) -> InferenceRequest {
        let user = render(
            &self.prompts.writer_user,
            &[
                ("REPORT_TITLE", job.shared.report_title.as_str()),
                ("SECTION_PATH", job.path.as_str()),
                ("SECTION_TITLE", job.title.as_str()),
                ("SECTION_DESCRIPTION", job.description.as_str()),
                ("PREVIOUS_SECTION", job.previous.as_str()),
                ("ANALYSIS", job.shared.analysis.as_str()),
                ("MATERIALS", job.shared.materials.as_str()),
            ],
        );
        InferenceRequest::text(self.prompts.writer_system.clone(), user)
            .with_timeout(self.retry.timeout())
    }
}

#[async_trait]
impl BatchNode for WriteSections {
    type Item = SectionJob;
    type Output = String;

    fn name(&self) -> &str {
        "write"
    }

    fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    fn policy(&self) -> &BatchConfig {
        &self.policy
    }

    fn prepare(&self, ctx: &Context) -> Result<Vec<SectionJob>, NodeError> {
        let outline = ctx
            .outline
            .as_ref()
            .ok_or_else(|| NodeError::MissingContext("outline.tree".into()))?;

        let materials = ctx
            .materials
            .as_ref()
            .map(|m| truncate_chars(&m.raw_content, self.writing_chars).to_string())
            .unwrap_or_default();
        let shared = Arc::new(SharedInputs {
            report_title: outline.title().to_string(),
            analysis: ctx.analysis.clone().unwrap_or_default(),
            materials,
        });

        // Previous-section context comes from the outline, not from other
        // jobs' results, so it is the same whatever order jobs finish in
        let leaves = outline.leaves();
        let mut jobs = Vec::with_capacity(leaves.len());
        for (position, leaf) in leaves.iter().enumerate() {
            if leaf.written_content().is_some() {
                continue;
            }
            let previous = match position.checked_sub(1).map(|p| leaves[p]) {
                Some(prev) if prev.description.is_empty() => prev.title.clone(),
                Some(prev) => format!("{}: {}", prev.title, prev.description),
                None => NO_PREVIOUS_SECTION.to_string(),
            };
            let path = outline
                .ancestors(leaf.index.as_str())
                .into_iter()
                .chain(std::iter::once(*leaf))
                .map(|s| format!("{} {}", s.index.as_str(), s.title))
                .collect::<Vec<_>>()
                .join(" > ");

            jobs.push(SectionJob {
                index: leaf.index.as_str().to_string(),
                title: leaf.title.clone(),
                description: leaf.description.clone(),
                path,
                previous,
                shared: Arc::clone(&shared),
            });
        }
        Ok(jobs)
    }

    fn item_key(&self, job: &SectionJob) -> String {
        job.index.clone()
    }

    async fn execute_item(&self, job: &SectionJob, _attempt: AttemptInfo) -> Attempt<String> {
        let request = self.request_for(job);
        match infer_attempt(self.inference.as_ref(), &request).await {
            Attempt::Success(reply) => Attempt::Success(reply.into_text()),
            Attempt::Retryable(e) => Attempt::Retryable(e),
            Attempt::Fatal(e) => Attempt::Fatal(e),
        }
    }

    fn finalize(
        &self,
        ctx: &mut Context,
        outcomes: Vec<ItemOutcome<String>>,
    ) -> Result<String, NodeError> {
        let outline = ctx
            .outline
            .as_mut()
            .ok_or_else(|| NodeError::MissingContext("outline.tree".into()))?;

        for outcome in outcomes {
            match outcome.result {
                Ok(content) => {
                    info!(
                        "Written section {} ({} chars)",
                        outcome.key,
                        content.chars().count()
                    );
                    if !outline.set_content(&outcome.key, content.clone()) {
                        return Err(NodeError::Finalize(format!(
                            "section {} is not in the outline",
                            outcome.key
                        )));
                    }
                    ctx.writing.results.insert(outcome.key, content);
                }
                Err(failure) => {
                    warn!("Section {} left empty: {}", failure.key, failure.error);
                    ctx.writing.failures.push(failure);
                }
            }
        }
        Ok(DEFAULT_SIGNAL.to_string())
    }
}
