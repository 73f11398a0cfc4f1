use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::*;

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct Config {
    /// Report topic handed to the planning stage
    #[serde(default)]
    pub topic: Option<String>,

    #[serde(default = "default_materials_dir")]
    pub materials_dir: PathBuf,

    /// Pre-built outline; planning is skipped when set
    #[serde(default)]
    pub outline: Option<PathBuf>,

    #[serde(default)]
    pub materials: MaterialsConfig,

    #[serde(default)]
    pub provider: Provider,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Per-stage retry overrides keyed by stage name
    #[serde(default)]
    pub stage_retry: HashMap<String, RetryConfig>,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub assembly: AssemblyConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct MaterialsConfig {
    /// Glob patterns a material must match (all files when empty)
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub converter: ConverterConfig,

    /// Reuse earlier conversions of unchanged files
    #[serde(default = "default_true")]
    pub cache: bool,
}

impl Default for MaterialsConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            converter: ConverterConfig::default(),
            cache: default_true(),
        }
    }
}

/// External command that prints markdown for a document passed as last argument
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ConverterConfig {
    #[serde(default = "default_converter_command")]
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Seconds one file may take before it is recorded as failed
    #[serde(default = "default_converter_timeout_sec")]
    pub timeout_sec: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            command: default_converter_command(),
            args: Vec::new(),
            timeout_sec: default_converter_timeout_sec(),
        }
    }
}

impl ConverterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    ClaudeCli,
    CodexCli,
    #[serde(rename = "openai")]
    OpenAi,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::ClaudeCli => write!(f, "claude_cli"),
            Provider::CodexCli => write!(f, "codex_cli"),
            Provider::OpenAi => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "claude_cli" | "claude" => Ok(Provider::ClaudeCli),
            "codex_cli" | "codex" => Ok(Provider::CodexCli),
            "openai" => Ok(Provider::OpenAi),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub claude_cli: ClaudeCliConfig,

    #[serde(default)]
    pub codex_cli: CodexCliConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ClaudeCliConfig {
    #[serde(default = "default_claude_binary")]
    pub binary: PathBuf,

    #[serde(default)]
    pub model: Option<String>,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            binary: default_claude_binary(),
            model: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CodexCliConfig {
    #[serde(default = "default_codex_binary")]
    pub binary: PathBuf,

    #[serde(default = "default_codex_model")]
    pub model: String,
}

impl Default for CodexCliConfig {
    fn default() -> Self {
        Self {
            binary: default_codex_binary(),
            model: default_codex_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    Fixed,
    #[default]
    Exponential,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RetryConfig {
    /// Extra attempts after the first one
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,

    #[serde(default)]
    pub backoff: Backoff,

    /// Time budget for a single attempt
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            wait_ms: default_wait_ms(),
            backoff: Backoff::default(),
            timeout_sec: default_timeout_sec(),
        }
    }
}

impl RetryConfig {
    /// A single attempt, no waiting, no time budget
    #[cfg(test)]
    pub fn once() -> Self {
        Self {
            max_retries: 0,
            wait_ms: 0,
            backoff: Backoff::Fixed,
            timeout_sec: None,
        }
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_sec.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct BatchConfig {
    /// Maximum number of items executing at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Abort the whole batch on the first item that exhausts its retries
    #[serde(default)]
    pub fail_fast: bool,

    #[serde(default)]
    pub launch_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            fail_fast: false,
            launch_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MissingContentPolicy {
    /// Leave the section out of the document
    #[default]
    Skip,
    /// Refuse to assemble
    Fail,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct AssemblyConfig {
    #[serde(default)]
    pub missing_content: MissingContentPolicy,

    /// Emit headings for content-less sections whose descendants produce output.
    /// With `false` such a section contributes nothing and its children
    /// follow directly.
    #[serde(default = "default_true")]
    pub parent_headings: bool,

    /// Prefix the document with a YAML front matter block carrying the title
    #[serde(default)]
    pub front_matter: bool,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            missing_content: MissingContentPolicy::default(),
            parent_headings: default_true(),
            front_matter: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct LimitsConfig {
    /// Characters of raw material sent to the analysis stage
    #[serde(default = "default_analysis_chars")]
    pub analysis_chars: usize,

    /// Characters of raw material sent with each section
    #[serde(default = "default_writing_chars")]
    pub writing_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            analysis_chars: default_analysis_chars(),
            writing_chars: default_writing_chars(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutlineFormat {
    #[default]
    Yaml,
    Json,
}

impl OutlineFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutlineFormat::Yaml => "yaml",
            OutlineFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Save analysis and outline under `<dir>/intermediate/`
    #[serde(default = "default_true")]
    pub intermediates: bool,

    /// Append a timestamp to the report file name
    #[serde(default = "default_true")]
    pub timestamp: bool,

    #[serde(default)]
    pub outline_format: OutlineFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            intermediates: default_true(),
            timestamp: default_true(),
            outline_format: OutlineFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct PromptsConfig {
    /// Directory whose `<name>.md` files replace the embedded templates
    #[serde(default)]
    pub dir: Option<PathBuf>,
}
