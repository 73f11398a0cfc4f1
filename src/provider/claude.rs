use super::response::ClaudeOutput;
use super::{command_for, exit_error, finish, Inference, InferenceRequest, Inferred};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::time::timeout as tokio_timeout;
use tracing::debug;

pub struct ClaudeInference {
    pub binary: PathBuf,
    pub model: Option<String>,
}

#[async_trait]
impl Inference for ClaudeInference {
    fn name(&self) -> &'static str {
        "claude_cli"
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<Inferred, ProviderError> {
        let mut cmd = command_for(&self.binary);

        // Use the CLI login rather than an API key from the environment
        cmd.env_remove("ANTHROPIC_API_KEY");

        cmd.arg("-p")
            .arg(&request.user)
            .arg("--system-prompt")
            .arg(&request.system)
            .arg("--output-format")
            .arg("json");
        if let Some(model) = &self.model {
            cmd.arg("--model").arg(model);
        }

        let start = std::time::Instant::now();
        let output = match request.timeout {
            Some(limit) => tokio_timeout(limit, cmd.output())
                .await
                .map_err(|_| ProviderError::Timeout(limit))??,
            None => cmd.output().await?,
        };
        debug!("claude_cli finished in {:?}", start.elapsed());

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(exit_error(output.status.code().unwrap_or(-1), &stderr));
        }

        let reply = match serde_json::from_str::<ClaudeOutput>(&stdout) {
            Ok(wrapped) if wrapped.is_error => return Err(exit_error(0, &wrapped.result)),
            Ok(wrapped) => wrapped.result,
            Err(_) => stdout,
        };

        finish(&reply, request.structured)
    }
}
