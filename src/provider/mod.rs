mod claude;
mod codex;
mod openai;
pub mod response;

pub use claude::ClaudeInference;
pub use codex::CodexInference;
pub use openai::OpenAiInference;

use crate::config::{Config, Provider};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// One prompt pair sent to a model
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub system: String,
    pub user: String,
    /// Ask for a JSON reply and parse it
    pub structured: bool,
    pub timeout: Option<Duration>,
}

impl InferenceRequest {
    pub fn text(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            structured: false,
            timeout: None,
        }
    }

    pub fn structured(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            structured: true,
            ..Self::text(system, user)
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inferred {
    Text(String),
    Structured(Value),
}

impl Inferred {
    pub fn into_text(self) -> String {
        match self {
            Inferred::Text(text) => text,
            Inferred::Structured(value) => value.to_string(),
        }
    }

    pub fn into_structured(self) -> Result<Value, ProviderError> {
        match self {
            Inferred::Structured(value) => Ok(value),
            Inferred::Text(text) => response::extract_json(&text).ok_or_else(|| {
                ProviderError::MalformedResponse("expected a JSON object".to_string())
            }),
        }
    }
}

#[async_trait]
pub trait Inference: Send + Sync {
    fn name(&self) -> &'static str;

    async fn infer(&self, request: &InferenceRequest) -> Result<Inferred, ProviderError>;
}

/// Turn raw model text into the requested shape
pub fn finish(raw: &str, structured: bool) -> Result<Inferred, ProviderError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::MalformedResponse("empty response".to_string()));
    }
    if !structured {
        return Ok(Inferred::Text(trimmed.to_string()));
    }
    response::extract_json(trimmed)
        .map(Inferred::Structured)
        .ok_or_else(|| {
            ProviderError::MalformedResponse(format!(
                "no JSON found in reply: {}...",
                trimmed.chars().take(200).collect::<String>()
            ))
        })
}

/// Build a command, letting plain names resolve through PATH
pub(crate) fn command_for(binary: &Path) -> Command {
    let binary_str = binary.to_string_lossy();
    let mut cmd = if binary_str.contains('/') || binary_str.contains('\\') {
        Command::new(binary)
    } else {
        Command::new(binary_str.as_ref())
    };
    cmd.kill_on_drop(true);
    cmd
}

/// Classify a failed CLI invocation
pub(crate) fn exit_error(code: i32, stderr: &str) -> ProviderError {
    let lower = stderr.to_lowercase();
    if lower.contains("rate limit") || lower.contains("429") || lower.contains("overloaded") {
        ProviderError::RateLimited(stderr.trim().to_string())
    } else {
        ProviderError::NonZeroExit {
            code,
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Create the configured inference backend
pub fn create_inference(config: &Config) -> Result<Arc<dyn Inference>, ProviderError> {
    Ok(match config.provider {
        Provider::ClaudeCli => Arc::new(ClaudeInference {
            binary: config.providers.claude_cli.binary.clone(),
            model: config.providers.claude_cli.model.clone(),
        }),
        Provider::CodexCli => Arc::new(CodexInference {
            binary: config.providers.codex_cli.binary.clone(),
            model: config.providers.codex_cli.model.clone(),
        }),
        Provider::OpenAi => Arc::new(OpenAiInference::from_config(&config.providers.openai)?),
    })
}
