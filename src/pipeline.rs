//! Flow construction for each kind of run

use crate::config::{Config, RetryConfig};
use crate::engine::{Flow, FlowBuilder};
use crate::error::FlowError;
use crate::output::timestamp_now;
use crate::prompts::PromptSet;
use crate::provider::Inference;
use crate::stages::{
    Analyze, AssembleReport, LoadMaterials, Plan, SaveOutline, Summarize, WriteSections,
    OUTLINE_SUPPLIED,
};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    /// load → analyze → plan → write → assemble → summary
    Full,
    /// Everything up to the outline, then the summary
    Minimal,
    /// Stops once the outline is saved
    OutlineOnly,
}

struct Stages<'a> {
    config: &'a Config,
    inference: Arc<dyn Inference>,
    prompts: Arc<PromptSet>,
    stamp: Option<String>,
}

impl Stages<'_> {
    fn retry(&self, stage: &str) -> RetryConfig {
        self.config.retry_for(stage)
    }

    fn load(&self) -> LoadMaterials {
        LoadMaterials::new(
            self.config.materials.clone(),
            self.config.output.dir.join("converted"),
            self.retry("load"),
        )
    }

    fn analyze(&self) -> Analyze {
        Analyze {
            inference: Arc::clone(&self.inference),
            prompts: Arc::clone(&self.prompts),
            retry: self.retry("analyze"),
            analysis_chars: self.config.limits.analysis_chars,
        }
    }

    fn plan(&self) -> Plan {
        Plan {
            inference: Arc::clone(&self.inference),
            prompts: Arc::clone(&self.prompts),
            retry: self.retry("plan"),
        }
    }

    fn save_outline(&self) -> SaveOutline {
        SaveOutline {
            output_dir: self.config.output.dir.clone(),
            format: self.config.output.outline_format,
            stamp: self.stamp.clone(),
            retry: self.retry("save_outline"),
        }
    }

    fn write(&self) -> WriteSections {
        WriteSections {
            inference: Arc::clone(&self.inference),
            prompts: Arc::clone(&self.prompts),
            retry: self.retry("write"),
            policy: self.config.batch.clone(),
            writing_chars: self.config.limits.writing_chars,
        }
    }

    fn assemble(&self) -> AssembleReport {
        AssembleReport {
            config: self.config.assembly.clone(),
            output_dir: self.config.output.dir.clone(),
            stamp: self.stamp.clone(),
            retry: self.retry("assemble"),
        }
    }

    fn summary(&self, write_json: bool) -> Summarize {
        Summarize {
            json_dir: write_json.then(|| self.config.output.dir.clone()),
            retry: self.retry("summary"),
        }
    }
}

/// Build the flow for `kind`
///
/// A run that starts with a supplied outline leaves analyze on the
/// `outline_supplied` signal and skips planning.
pub fn build_flow(
    kind: FlowKind,
    config: &Config,
    inference: Arc<dyn Inference>,
    prompts: Arc<PromptSet>,
) -> Result<Flow, FlowError> {
    let stages = Stages {
        config,
        inference,
        prompts,
        stamp: config.output.timestamp.then(timestamp_now),
    };
    let intermediates = config.output.intermediates;

    let builder = Flow::builder()
        .start("load")
        .node(stages.load())
        .node(stages.analyze())
        .node(stages.plan())
        .then("load", "analyze")
        .then("analyze", "plan");

    let builder = match kind {
        FlowKind::Full => {
            let builder = builder
                .batch(stages.write())
                .node(stages.assemble())
                .node(stages.summary(true));
            let builder = if intermediates {
                with_outline_save(builder, &stages)
                    .then("save_outline", "write")
                    .edge("analyze", OUTLINE_SUPPLIED, "save_outline")
            } else {
                builder
                    .then("plan", "write")
                    .edge("analyze", OUTLINE_SUPPLIED, "write")
            };
            builder.then("write", "assemble").then("assemble", "summary")
        }
        FlowKind::Minimal => {
            let builder = builder.node(stages.summary(false));
            if intermediates {
                with_outline_save(builder, &stages)
                    .then("save_outline", "summary")
                    .edge("analyze", OUTLINE_SUPPLIED, "summary")
            } else {
                builder
                    .then("plan", "summary")
                    .edge("analyze", OUTLINE_SUPPLIED, "summary")
            }
        }
        FlowKind::OutlineOnly => with_outline_save(builder, &stages)
            .node(stages.summary(false))
            .then("save_outline", "summary"),
    };

    builder.build()
}

fn with_outline_save(builder: FlowBuilder, stages: &Stages<'_>) -> FlowBuilder {
    builder
        .node(stages.save_outline())
        .then("plan", "save_outline")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Context, RunInput};
    use crate::provider::testing::FakeInference;
    use crate::provider::{InferenceRequest, Inferred};
    use serde_json::json;
    use std::fs;
    use std::path::Path;

    fn respond(req: &InferenceRequest, _call: usize) -> Result<Inferred, crate::error::ProviderError> {
        if req.structured {
            return Ok(Inferred::Structured(json!({
                "title": "Rust Concurrency",
                "sections": [
                    {"index": "1", "title": "Intro", "description": "Why", "children": [
                        {"index": "1.1", "title": "Threads", "description": "OS threads"},
                        {"index": "1.2", "title": "Tasks", "description": "Async tasks"}
                    ]},
                    {"index": "2", "title": "Summary", "description": "Wrap up"}
                ]
            })));
        }
        if req.user.contains("[RAW MATERIALS]") {
            return Ok(Inferred::Text("Knowledge context".into()));
        }
        let title = req
            .user
            .lines()
            .find_map(|l| l.strip_prefix("[SECTION TITLE]: "))
            .unwrap_or("?");
        Ok(Inferred::Text(format!("Text about {}.", title)))
    }

    fn config(dir: &Path) -> Config {
        let mut config = Config {
            topic: Some("Rust concurrency".into()),
            ..Config::default()
        };
        config.retry = RetryConfig::once();
        config.output.dir = dir.join("output");
        config.output.timestamp = false;
        config
    }

    fn context(dir: &Path) -> Context {
        let materials = dir.join("materials");
        fs::create_dir_all(&materials).unwrap();
        fs::write(materials.join("notes.md"), "Threads and tasks.").unwrap();
        Context::new(RunInput {
            topic: "Rust concurrency".into(),
            materials_dir: materials,
            outline_path: None,
        })
    }

    #[tokio::test]
    async fn test_full_flow_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let fake = Arc::new(FakeInference::new(respond));
        let flow = build_flow(FlowKind::Full, &config, fake, Arc::new(PromptSet::default())).unwrap();

        let mut ctx = context(dir.path());
        let report = flow.run(&mut ctx).await.unwrap();
        assert_eq!(
            report.stage_names(),
            vec!["load", "analyze", "plan", "save_outline", "write", "assemble", "summary"]
        );

        let output = ctx.output.unwrap();
        assert_eq!(output.path, config.output.dir.join("rust_concurrency.md"));
        assert_eq!(
            output.document,
            "# Intro\n## Threads\nText about Threads.\n## Tasks\nText about Tasks.\n# Summary\nText about Summary.\n"
        );
        assert!(config.output.dir.join("summary.json").exists());
        assert!(config
            .output
            .dir
            .join("intermediate/outline/outline.yaml")
            .exists());
        assert!(ctx.summary.unwrap().contains("Sections written: 3, failed: 0"));
    }

    #[tokio::test]
    async fn test_supplied_outline_skips_planning() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.output.intermediates = false;
        let outline_path = dir.path().join("outline.yaml");
        fs::write(
            &outline_path,
            "title: Given\nsections:\n  - index: 1\n    title: Only\n    description: All of it\n",
        )
        .unwrap();

        let fake = Arc::new(FakeInference::new(respond));
        let flow = build_flow(
            FlowKind::Full,
            &config,
            fake.clone(),
            Arc::new(PromptSet::default()),
        )
        .unwrap();

        let mut ctx = context(dir.path());
        ctx.input.outline_path = Some(outline_path);
        let report = flow.run(&mut ctx).await.unwrap();

        assert_eq!(
            report.stage_names(),
            vec!["load", "analyze", "write", "assemble", "summary"]
        );
        assert!(fake.requests().iter().all(|r| !r.structured));
        assert_eq!(ctx.output.unwrap().document, "# Only\nText about Only.\n");
    }

    #[tokio::test]
    async fn test_outline_only_flow() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let fake = Arc::new(FakeInference::new(respond));
        let flow = build_flow(
            FlowKind::OutlineOnly,
            &config,
            fake,
            Arc::new(PromptSet::default()),
        )
        .unwrap();
        assert_eq!(
            flow.reachable(),
            vec!["load", "analyze", "plan", "save_outline", "summary"]
        );

        let mut ctx = context(dir.path());
        flow.run(&mut ctx).await.unwrap();
        assert!(ctx.output.is_none());
        assert_eq!(ctx.outline.unwrap().leaves().len(), 3);
        assert_eq!(ctx.artifacts.len(), 2);
    }

    #[test]
    fn test_minimal_flow_has_no_writer() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.output.intermediates = false;
        let fake = Arc::new(FakeInference::new(respond));
        let flow = build_flow(FlowKind::Minimal, &config, fake, Arc::new(PromptSet::default())).unwrap();
        assert_eq!(flow.reachable(), vec!["load", "analyze", "plan", "summary"]);
    }
}
