use super::{command_for, exit_error, finish, Inference, InferenceRequest, Inferred};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout as tokio_timeout;

pub struct CodexInference {
    pub binary: PathBuf,
    pub model: String,
}

#[async_trait]
impl Inference for CodexInference {
    fn name(&self) -> &'static str {
        "codex_cli"
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<Inferred, ProviderError> {
        let mut prompt = format!("{}\n\n{}", request.system, request.user);
        if request.structured {
            prompt.push_str("\n\nRespond with a single JSON object and nothing else.");
        }

        // Final assistant message lands here; stdout carries the event stream
        let out_file = NamedTempFile::new()?;

        let mut cmd = command_for(&self.binary);
        cmd.arg("exec")
            .arg("--model")
            .arg(&self.model)
            .arg("--output-last-message")
            .arg(out_file.path())
            .arg("-");
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let output = match request.timeout {
            Some(limit) => tokio_timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ProviderError::Timeout(limit))??,
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(exit_error(output.status.code().unwrap_or(-1), &stderr));
        }

        let reply = std::fs::read_to_string(out_file.path())?;
        finish(&reply, request.structured)
    }
}
