use crate::config::RetryConfig;
use crate::engine::{Attempt, AttemptInfo, Context, Node, DEFAULT_SIGNAL};
use crate::error::NodeError;
use crate::prompts::{render, truncate_chars, PromptSet};
use crate::provider::{Inference, InferenceRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::infer_attempt;

/// Signal sent when the run already has an outline, so planning is skipped
pub const OUTLINE_SUPPLIED: &str = "outline_supplied";

/// Condenses the raw materials into a knowledge summary
pub struct Analyze {
    pub inference: Arc<dyn Inference>,
    pub prompts: Arc<PromptSet>,
    pub retry: RetryConfig,
    pub analysis_chars: usize,
}

#[async_trait]
impl Node for Analyze {
    type Input = InferenceRequest;
    type Output = String;

    fn name(&self) -> &str {
        "analyze"
    }

    fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    fn prepare(&self, ctx: &Context) -> Result<InferenceRequest, NodeError> {
        let materials = ctx
            .materials
            .as_ref()
            .filter(|m| !m.raw_content.is_empty())
            .ok_or_else(|| NodeError::MissingContext("materials.raw_content".into()))?;

        let user = render(
            &self.prompts.analyst_user,
            &[
                ("TOPIC", ctx.input.topic.as_str()),
                (
                    "MATERIALS",
                    truncate_chars(&materials.raw_content, self.analysis_chars),
                ),
            ],
        );
        Ok(InferenceRequest::text(self.prompts.analyst_system.clone(), user)
            .with_timeout(self.retry.timeout()))
    }

    async fn execute(&self, request: &InferenceRequest, _attempt: AttemptInfo) -> Attempt<String> {
        match infer_attempt(self.inference.as_ref(), request).await {
            Attempt::Success(reply) => Attempt::Success(reply.into_text()),
            Attempt::Retryable(e) => Attempt::Retryable(e),
            Attempt::Fatal(e) => Attempt::Fatal(e),
        }
    }

    fn finalize(
        &self,
        ctx: &mut Context,
        _input: InferenceRequest,
        summary: String,
    ) -> Result<String, NodeError> {
        info!("Generated analysis summary ({} chars)", summary.chars().count());
        ctx.analysis = Some(summary);

        if ctx.outline.is_some() {
            return Ok(OUTLINE_SUPPLIED.to_string());
        }
        Ok(DEFAULT_SIGNAL.to_string())
    }
}
