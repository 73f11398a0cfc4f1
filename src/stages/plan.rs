use crate::config::RetryConfig;
use crate::engine::{Attempt, AttemptInfo, Context, Node, DEFAULT_SIGNAL};
use crate::error::{ExecutionError, NodeError};
use crate::outline::{Outline, OutlineDocument};
use crate::prompts::{render, PromptSet};
use crate::provider::{Inference, InferenceRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::infer_attempt;

#[derive(Debug, Clone)]
pub struct PlanInput {
    pub topic: String,
    pub request: InferenceRequest,
}

/// Asks the model for a section tree and validates it
///
/// A reply that does not parse into a valid outline is retried; each retry
/// carries the previous rejection so the model can correct it.
pub struct Plan {
    pub inference: Arc<dyn Inference>,
    pub prompts: Arc<PromptSet>,
    pub retry: RetryConfig,
}

impl Plan {
    fn request_for(&self, input: &PlanInput, attempt: &AttemptInfo) -> InferenceRequest {
        let mut request = input.request.clone();
        if let Some(error) = &attempt.previous_error {
            request.user.push_str("\n\n");
            request.user.push_str(&render(
                &self.prompts.architect_correction,
                &[("ERROR", error.as_str())],
            ));
        }
        request
    }
}

/// Parse a structured reply into a validated outline
fn outline_from_reply(value: serde_json::Value, topic: &str) -> Result<Outline, ExecutionError> {
    let mut document: OutlineDocument = serde_json::from_value(value)
        .map_err(|e| ExecutionError::MalformedStructure(format!("not an outline: {}", e)))?;
    if document.title.trim().is_empty() {
        document.title = topic.to_string();
    }
    Outline::from_document(document).map_err(|e| ExecutionError::MalformedStructure(e.to_string()))
}

#[async_trait]
impl Node for Plan {
    type Input = PlanInput;
    type Output = Outline;

    fn name(&self) -> &str {
        "plan"
    }

    fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    fn prepare(&self, ctx: &Context) -> Result<PlanInput, NodeError> {
        let topic = ctx.input.topic.trim();
        if topic.is_empty() {
            return Err(NodeError::MissingContext("input.topic".into()));
        }
        let analysis = ctx
            .analysis
            .as_deref()
            .ok_or_else(|| NodeError::MissingContext("analysis.summary".into()))?;

        let user = render(
            &self.prompts.architect_user,
            &[("TOPIC", topic), ("ANALYSIS", analysis)],
        );
        Ok(PlanInput {
            topic: topic.to_string(),
            request: InferenceRequest::structured(self.prompts.architect_system.clone(), user)
                .with_timeout(self.retry.timeout()),
        })
    }

    async fn execute(&self, input: &PlanInput, attempt: AttemptInfo) -> Attempt<Outline> {
        if attempt.is_retry() {
            debug!("plan attempt {} with correction prompt", attempt.number);
        }
        let request = self.request_for(input, &attempt);
        let reply = match infer_attempt(self.inference.as_ref(), &request).await {
            Attempt::Success(reply) => reply,
            Attempt::Retryable(e) => return Attempt::Retryable(e),
            Attempt::Fatal(e) => return Attempt::Fatal(e),
        };

        reply
            .into_structured()
            .map_err(ExecutionError::from)
            .and_then(|value| outline_from_reply(value, &input.topic))
            .into()
    }

    fn finalize(
        &self,
        ctx: &mut Context,
        _input: PlanInput,
        outline: Outline,
    ) -> Result<String, NodeError> {
        info!(
            "Generated outline '{}' with {} sections ({} to write)",
            outline.title(),
            outline.len(),
            outline.leaves().len()
        );
        for section in outline.preorder() {
            debug!("  {} {}", section.index.as_str(), section.title);
        }
        ctx.outline = Some(outline);
        Ok(DEFAULT_SIGNAL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Stage, Step};
    use crate::provider::Inferred;
    use crate::provider::testing::FakeInference;
    use crate::stages::fixtures::context_with_materials;
    use serde_json::json;

    fn plan(fake: Arc<FakeInference>, max_retries: u32) -> Step<Plan> {
        let mut retry = RetryConfig::once();
        retry.max_retries = max_retries;
        Step(Plan {
            inference: fake,
            prompts: Arc::new(PromptSet::default()),
            retry,
        })
    }

    fn ctx() -> Context {
        let mut ctx = context_with_materials("Rust async", "text");
        ctx.analysis = Some("analysis".into());
        ctx
    }

    #[tokio::test]
    async fn test_invalid_tree_retried_with_correction() {
        let fake = Arc::new(FakeInference::new(|_, call| {
            Ok(Inferred::Structured(if call == 0 {
                json!({"title": "T", "sections": [
                    {"index": "1", "title": "A", "children": [{"index": "2.1", "title": "B"}]}
                ]})
            } else {
                json!({"title": "T", "sections": [
                    {"index": "1", "title": "A", "children": [{"index": "1.1", "title": "B"}]}
                ]})
            }))
        }));
        let mut ctx = ctx();

        plan(fake.clone(), 2).run(&mut ctx).await.unwrap();
        let outline = ctx.outline.unwrap();
        assert_eq!(outline.len(), 2);

        let requests = fake.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].structured);
        assert!(!requests[0].user.contains("previous outline was rejected"));
        assert!(requests[1].user.contains("previous outline was rejected"));
        assert!(requests[1].user.contains("'2.1'"));
    }

    #[tokio::test]
    async fn test_malformed_outline_exhausts_retries() {
        let fake = Arc::new(FakeInference::new(|_, _| {
            Ok(Inferred::Structured(json!({"title": "T", "sections": []})))
        }));
        let mut ctx = ctx();

        let failure = plan(fake.clone(), 3).run(&mut ctx).await.unwrap_err();
        assert!(matches!(failure.error, NodeError::Exhausted { attempts: 4, .. }));
        assert_eq!(fake.requests().len(), 4);
        assert!(ctx.outline.is_none());
    }

    #[tokio::test]
    async fn test_missing_title_falls_back_to_topic() {
        let fake = Arc::new(FakeInference::new(|_, _| {
            Ok(Inferred::Text(
                "Here you go:\n```json\n{\"chapters\": [{\"index\": 1, \"title\": \"Intro\"}]}\n```"
                    .into(),
            ))
        }));
        let mut ctx = ctx();

        plan(fake, 0).run(&mut ctx).await.unwrap();
        let outline = ctx.outline.unwrap();
        assert_eq!(outline.title(), "Rust async");
        assert_eq!(outline.get("1").unwrap().title, "Intro");
    }

    #[tokio::test]
    async fn test_requires_topic() {
        let fake = Arc::new(FakeInference::new(|_, _| Ok(Inferred::Text("{}".into()))));
        let mut ctx = ctx();
        ctx.input.topic = "  ".into();

        let failure = plan(fake, 0).run(&mut ctx).await.unwrap_err();
        assert!(matches!(failure.error, NodeError::MissingContext(_)));
    }
}
