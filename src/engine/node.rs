use crate::config::RetryConfig;
use crate::error::{ExecutionError, NodeError};
use async_trait::async_trait;
use std::fmt::Debug;
use tracing::{debug, warn};

use super::context::Context;
use super::retry::{retry_with_backoff, Attempt, AttemptInfo, RetryFailure};

/// Signal a stage returns when it has no reason to branch
pub const DEFAULT_SIGNAL: &str = "default";

const INPUT_PREVIEW_CHARS: usize = 200;

/// One unit of work in a flow
///
/// `prepare` reads what it needs from the context, `execute` does the work
/// (and is retried), `finalize` writes results back and returns the signal
/// that picks the next stage. Only `finalize` can mutate the context.
#[async_trait]
pub trait Node: Send + Sync {
    type Input: Send + Sync + Debug;
    type Output: Send;

    fn name(&self) -> &str;

    fn retry(&self) -> &RetryConfig;

    fn prepare(&self, ctx: &Context) -> Result<Self::Input, NodeError>;

    async fn execute(&self, input: &Self::Input, attempt: AttemptInfo) -> Attempt<Self::Output>;

    /// Called once retries are exhausted; the default gives up
    fn fallback(
        &self,
        _input: &Self::Input,
        error: ExecutionError,
    ) -> Result<Self::Output, ExecutionError> {
        Err(error)
    }

    fn finalize(
        &self,
        ctx: &mut Context,
        input: Self::Input,
        output: Self::Output,
    ) -> Result<String, NodeError>;
}

/// Why a stage stopped the flow, with a description of what it was given
#[derive(Debug)]
pub struct StageFailure {
    pub input: String,
    pub error: NodeError,
}

impl StageFailure {
    pub fn new(input: impl Into<String>, error: NodeError) -> Self {
        Self {
            input: input.into(),
            error,
        }
    }
}

/// Type-erased stage the flow can drive
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &mut Context) -> Result<String, StageFailure>;
}

/// Short Debug rendering for error messages
pub fn describe_input<T: Debug + ?Sized>(input: &T) -> String {
    let full = format!("{:?}", input);
    if full.chars().count() <= INPUT_PREVIEW_CHARS {
        return full;
    }
    let mut short: String = full.chars().take(INPUT_PREVIEW_CHARS).collect();
    short.push_str("...");
    short
}

/// Adapts a `Node` to the `Stage` interface
pub struct Step<N>(pub N);

#[async_trait]
impl<N: Node> Stage for Step<N> {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn run(&self, ctx: &mut Context) -> Result<String, StageFailure> {
        let node = &self.0;
        let input = node
            .prepare(ctx)
            .map_err(|e| StageFailure::new("<prepare>", e))?;
        let described = describe_input(&input);
        debug!("{} prepared: {}", node.name(), described);

        let outcome =
            retry_with_backoff(node.retry(), node.name(), |info| node.execute(&input, info)).await;

        let output = match outcome {
            Ok((output, _)) => output,
            Err(RetryFailure::Fatal { attempts, error }) => {
                return Err(StageFailure::new(
                    described,
                    NodeError::Fatal {
                        attempts,
                        source: error,
                    },
                ));
            }
            Err(RetryFailure::Exhausted { attempts, error }) => {
                match node.fallback(&input, error) {
                    Ok(output) => {
                        warn!("{} using fallback after {} attempts", node.name(), attempts);
                        output
                    }
                    Err(error) => {
                        return Err(StageFailure::new(
                            described,
                            NodeError::Exhausted {
                                attempts,
                                source: error,
                            },
                        ));
                    }
                }
            }
        };

        node.finalize(ctx, input, output)
            .map_err(|e| StageFailure::new(described, e))
    }
}
