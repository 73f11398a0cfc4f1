use crate::config::{MaterialsConfig, RetryConfig};
use crate::engine::{Attempt, AttemptInfo, Context, Node, DEFAULT_SIGNAL};
use crate::error::{ExecutionError, NodeError};
use crate::materials::{load_materials, Materials};
use crate::outline::{load_outline, Outline};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct LoadInput {
    pub materials_dir: PathBuf,
    pub outline_path: Option<PathBuf>,
}

/// Reads the materials directory and, when given, a pre-built outline
pub struct LoadMaterials {
    config: MaterialsConfig,
    converted_dir: PathBuf,
    retry: RetryConfig,
}

impl LoadMaterials {
    /// Each conversion has its own time limit, so the scan as a whole is
    /// never cut off by the attempt budget.
    pub fn new(config: MaterialsConfig, converted_dir: PathBuf, retry: RetryConfig) -> Self {
        Self {
            config,
            converted_dir,
            retry: RetryConfig {
                timeout_sec: None,
                ..retry
            },
        }
    }
}

#[async_trait]
impl Node for LoadMaterials {
    type Input = LoadInput;
    type Output = (Materials, Option<Outline>);

    fn name(&self) -> &str {
        "load"
    }

    fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    fn prepare(&self, ctx: &Context) -> Result<LoadInput, NodeError> {
        if ctx.input.materials_dir.as_os_str().is_empty() {
            return Err(NodeError::MissingContext("input.materials_dir".into()));
        }
        Ok(LoadInput {
            materials_dir: ctx.input.materials_dir.clone(),
            outline_path: ctx.input.outline_path.clone(),
        })
    }

    async fn execute(&self, input: &LoadInput, _attempt: AttemptInfo) -> Attempt<Self::Output> {
        let materials =
            match load_materials(&input.materials_dir, &self.config, &self.converted_dir).await {
                Ok(materials) => materials,
                Err(e) => return Attempt::Fatal(e.into()),
            };

        // A supplied outline that fails validation is never retried
        let outline = match &input.outline_path {
            Some(path) => match load_outline(path) {
                Ok(outline) => Some(outline),
                Err(e) => return Attempt::Fatal(ExecutionError::from(e)),
            },
            None => None,
        };

        Attempt::Success((materials, outline))
    }

    fn finalize(
        &self,
        ctx: &mut Context,
        _input: LoadInput,
        (materials, outline): Self::Output,
    ) -> Result<String, NodeError> {
        info!(
            "Loaded {} files from {} ({} chars)",
            materials.loaded_count(),
            materials.dir.display(),
            materials.raw_content.chars().count()
        );
        if let Some(outline) = &outline {
            info!(
                "Using supplied outline '{}' ({} sections)",
                outline.title(),
                outline.len()
            );
        }
        ctx.materials = Some(materials);
        ctx.outline = outline;
        Ok(DEFAULT_SIGNAL.to_string())
    }
}
