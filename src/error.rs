use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Failed to read prompt template '{path}': {source}")]
    ReadPrompt {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Batch concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("A topic is required when no outline is supplied")]
    MissingTopic,
}

#[derive(Error, Debug)]
pub enum MaterialsError {
    #[error("Materials directory not found: {0}")]
    NotFound(PathBuf),

    #[error("Materials path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to build glob pattern '{pattern}': {source}")]
    GlobPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    #[error("No supported materials could be loaded from {0}")]
    NoMaterials(PathBuf),

    #[error("Conversion cache error: {0}")]
    Cache(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Inference timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Process failed with exit code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited(_)
                | ProviderError::Timeout(_)
                | ProviderError::MalformedResponse(_)
                | ProviderError::Transport(_)
                | ProviderError::NonZeroExit { .. }
        )
    }
}

/// Structural problems in a section tree. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Malformed section index '{0}'")]
    MalformedIndex(String),

    #[error("Duplicate section index '{0}'")]
    DuplicateIndex(String),

    #[error("Section '{child}' is not a direct child of '{parent}'")]
    OrphanedChild { child: String, parent: String },

    #[error("Top-level section '{0}' must have a single-segment index")]
    NestedRoot(String),

    #[error("Outline has no sections")]
    Empty,
}

#[derive(Error, Debug)]
pub enum OutlineError {
    #[error("Failed to read outline '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write outline '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid YAML outline: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON outline: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid outline: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("Section '{0}' has no content")]
    MissingContent(String),

    #[error("Failed to render front matter: {0}")]
    FrontMatter(String),
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to create output directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Outline error: {0}")]
    Outline(#[from] OutlineError),
}

/// Failure of a single execute attempt
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Malformed structure: {0}")]
    MalformedStructure(String),

    #[error("Attempt exceeded time budget of {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Materials(#[from] MaterialsError),

    #[error(transparent)]
    Outline(#[from] OutlineError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl ExecutionError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ExecutionError::Provider(e) => e.is_retryable(),
            ExecutionError::MalformedStructure(_) | ExecutionError::Timeout(_) => true,
            ExecutionError::Output(OutputError::Write { .. }) => true,
            _ => false,
        }
    }
}

/// Terminal failure of one node invocation
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Missing context: {0}")]
    MissingContext(String),

    #[error("Failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: ExecutionError,
    },

    #[error("Unrecoverable error on attempt {attempts}: {source}")]
    Fatal {
        attempts: u32,
        #[source]
        source: ExecutionError,
    },

    #[error("Section {index} failed after {attempts} attempts: {message}")]
    Item {
        index: String,
        attempts: u32,
        message: String,
    },

    #[error("Finalize failed: {0}")]
    Finalize(String),
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Stage '{stage}' failed: {source} (input: {input})")]
    Stage {
        stage: String,
        input: String,
        #[source]
        source: NodeError,
    },

    #[error("Flow references unknown stage '{0}'")]
    UnknownStage(String),

    #[error("Stage '{0}' registered twice")]
    DuplicateStage(String),

    #[error("Flow exceeded {0} stage transitions")]
    StepLimit(usize),
}
