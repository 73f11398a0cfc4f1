pub mod materials;
pub mod outline;
pub mod run;
pub mod schema;

use crate::config::{Config, Provider};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reportflow")]
#[command(
    author,
    version,
    about = "Turn a directory of source materials into a structured long-form report"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze materials, plan an outline, write every section and assemble the report
    Run(RunArgs),

    /// Generate and save an outline without writing sections
    Outline(OutlineArgs),

    /// List the materials a run would load
    Materials(MaterialsArgs),

    /// Print JSON Schema for config validation
    Schema,
}

/// Options shared by commands that run a flow
#[derive(Args, Clone)]
pub struct FlowArgs {
    /// Path to config file
    #[arg(short, long, default_value = "reportflow.yaml")]
    pub config: PathBuf,

    /// Report topic
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Directory of source materials
    #[arg(short, long)]
    pub materials: Option<PathBuf>,

    /// Override output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override inference provider (claude_cli, codex_cli, openai)
    #[arg(long)]
    pub provider: Option<Provider>,

    /// Show plan without executing
    #[arg(long)]
    pub dry_run: bool,
}

impl FlowArgs {
    /// Load the config file and apply command-line overrides
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load_or_default(&self.config)?;
        if let Some(topic) = &self.topic {
            config.topic = Some(topic.clone());
        }
        if let Some(materials) = &self.materials {
            config.materials_dir = materials.clone();
        }
        if let Some(output) = &self.output {
            config.output.dir = output.clone();
        }
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        Ok(config)
    }
}

#[derive(Parser, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub flow: FlowArgs,

    /// Use an existing outline (YAML or JSON) instead of planning one
    #[arg(long)]
    pub outline: Option<PathBuf>,

    /// Override max sections written at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Stop the run on the first section that cannot be written
    #[arg(long)]
    pub fail_fast: bool,

    /// Stop after planning (no section writing or assembly)
    #[arg(long)]
    pub minimal: bool,
}

#[derive(Parser, Clone)]
pub struct OutlineArgs {
    #[command(flatten)]
    pub flow: FlowArgs,
}

#[derive(Parser, Clone)]
pub struct MaterialsArgs {
    /// Materials directory (defaults to the configured one)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, default_value = "reportflow.yaml")]
    pub config: PathBuf,

    /// Print the listing as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::parse_from([
            "reportflow",
            "run",
            "--topic",
            "Rust",
            "--provider",
            "openai",
            "--concurrency",
            "8",
            "--fail-fast",
            "-c",
            "missing-config.yaml",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        let config = args.flow.load_config().unwrap();
        assert_eq!(config.topic.as_deref(), Some("Rust"));
        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(args.concurrency, Some(8));
        assert!(args.fail_fast);
    }
}
