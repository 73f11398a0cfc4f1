use super::{finish, Inference, InferenceRequest, Inferred};
use crate::config::OpenAiConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenAI-compatible chat completions endpoint
pub struct OpenAiInference {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

fn map_http_error(error: reqwest::Error, limit: Option<Duration>) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(limit.unwrap_or_default())
    } else {
        ProviderError::Transport(error.to_string())
    }
}

fn status_error(status: u16, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited(body),
        500..=599 => ProviderError::Transport(format!("server error {}: {}", status, body)),
        _ => ProviderError::Rejected { status, body },
    }
}

impl OpenAiInference {
    pub fn from_config(config: &OpenAiConfig) -> Result<Self, ProviderError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingCredentials(config.api_key_env.clone()))?;

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl Inference for OpenAiInference {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<Inferred, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: request.structured.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self.client.post(&url).bearer_auth(&self.api_key).json(&body);
        if let Some(limit) = request.timeout {
            builder = builder.timeout(limit);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_http_error(e, request.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status.as_u16(), text));
        }

        let completion: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("failed to parse completion: {}", e))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::MalformedResponse("no choices in response".into()))?;

        finish(&content, request.structured)
    }
}
