use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod assemble;
mod cli;
mod config;
mod engine;
mod error;
mod materials;
mod outline;
mod output;
mod pipeline;
mod prompts;
mod provider;
mod stages;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise stage progress, or everything with --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("reportflow=debug")
        } else {
            EnvFilter::new("reportflow=info")
        }
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => cli::run::execute(args).await,
        Commands::Outline(args) => cli::outline::execute(args).await,
        Commands::Materials(args) => cli::materials::execute(args),
        Commands::Schema => cli::schema::execute(),
    }
}
