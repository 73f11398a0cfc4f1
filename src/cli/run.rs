use crate::cli::RunArgs;
use crate::config::Config;
use crate::engine::{Context, Flow, FlowReport, RunInput};
use crate::pipeline::{build_flow, FlowKind};
use crate::prompts::PromptSet;
use crate::provider::create_inference;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub async fn execute(args: RunArgs) -> anyhow::Result<()> {
    info!("Loading config from {:?}", args.flow.config);
    let mut config = args.flow.load_config()?;

    // Apply run-only overrides
    if let Some(outline) = args.outline {
        config.outline = Some(outline);
    }
    if let Some(concurrency) = args.concurrency {
        config.batch.concurrency = concurrency;
    }
    if args.fail_fast {
        config.batch.fail_fast = true;
    }

    config.validate()?;

    let kind = if args.minimal {
        FlowKind::Minimal
    } else {
        FlowKind::Full
    };
    let (flow, mut ctx) = prepare(kind, &config)?;

    if args.flow.dry_run {
        info!("DRY RUN - no provider calls will be made");
        print_execution_plan(&config, &flow);
        return Ok(());
    }

    let report = flow.run(&mut ctx).await?;
    finish(&ctx, &report);
    Ok(())
}

/// Build the flow and its starting context from a validated config
pub(crate) fn prepare(kind: FlowKind, config: &Config) -> anyhow::Result<(Flow, Context)> {
    let prompts = Arc::new(PromptSet::load(&config.prompts)?);
    let inference = create_inference(config)?;
    info!("Using provider {}", inference.name());

    let flow = build_flow(kind, config, inference, prompts)?;
    let ctx = Context::new(RunInput {
        topic: config.topic.clone().unwrap_or_default(),
        materials_dir: config.materials_dir.clone(),
        outline_path: config.outline.clone(),
    });
    Ok((flow, ctx))
}

/// Print the summary and log how the run went
pub(crate) fn finish(ctx: &Context, report: &FlowReport) {
    if let Some(summary) = &ctx.summary {
        println!("{}", summary);
    }
    if !ctx.writing.failures.is_empty() {
        warn!(
            "{} sections could not be written and were left out",
            ctx.writing.failures.len()
        );
    }
    for record in &report.visited {
        debug!(
            "{} -> '{}' in {:.1}s",
            record.name,
            record.signal,
            record.duration.as_secs_f64()
        );
    }
    info!(
        "Completed {} in {:.1}s",
        report.stage_names().join(" -> "),
        report.total_duration.as_secs_f64()
    );
}

pub(crate) fn print_execution_plan(config: &Config, flow: &Flow) {
    println!("\n=== Execution Plan ===\n");
    if let Some(topic) = &config.topic {
        println!("Topic: {}", topic);
    }
    println!("Materials: {:?}", config.materials_dir);
    match &config.outline {
        Some(outline) => println!("Outline: {:?} (planning skipped)", outline),
        None => println!("Outline: generated"),
    }
    println!("Provider: {}", config.provider);
    println!(
        "Concurrency: {} (fail-fast: {})",
        config.batch.concurrency,
        if config.batch.fail_fast { "on" } else { "off" }
    );
    println!(
        "Retries: {} per stage, {}ms base wait",
        config.retry.max_retries, config.retry.wait_ms
    );
    println!("Output dir: {:?}", config.output.dir);
    println!("\nStages: {}", flow.reachable().join(" -> "));
    println!();
}
