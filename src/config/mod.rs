mod defaults;
mod types;

pub use types::*;

use crate::error::ConfigError;
use defaults::*;
use std::collections::HashMap;
use std::path::Path;

impl Default for Config {
    fn default() -> Self {
        Self {
            topic: None,
            materials_dir: default_materials_dir(),
            outline: None,
            materials: MaterialsConfig::default(),
            provider: Provider::default(),
            providers: ProvidersConfig::default(),
            retry: RetryConfig::default(),
            stage_retry: HashMap::new(),
            batch: BatchConfig::default(),
            assembly: AssemblyConfig::default(),
            limits: LimitsConfig::default(),
            output: OutputConfig::default(),
            prompts: PromptsConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Retry policy for a stage, honouring per-stage overrides
    pub fn retry_for(&self, stage: &str) -> RetryConfig {
        self.stage_retry
            .get(stage)
            .cloned()
            .unwrap_or_else(|| self.retry.clone())
    }

    /// Validate the config for a run that may need to generate an outline
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }

        let has_topic = self
            .topic
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false);
        if self.outline.is_none() && !has_topic {
            return Err(ConfigError::MissingTopic);
        }

        Ok(())
    }
}
