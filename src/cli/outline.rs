use crate::cli::run::{finish, prepare, print_execution_plan};
use crate::cli::OutlineArgs;
use crate::pipeline::FlowKind;
use tracing::info;

pub async fn execute(args: OutlineArgs) -> anyhow::Result<()> {
    let mut config = args.flow.load_config()?;
    // Planning is the point of this command
    config.outline = None;
    config.validate()?;

    let (flow, mut ctx) = prepare(FlowKind::OutlineOnly, &config)?;
    if args.flow.dry_run {
        print_execution_plan(&config, &flow);
        return Ok(());
    }

    let report = flow.run(&mut ctx).await?;
    for artifact in &ctx.artifacts {
        info!("Wrote {}", artifact.display());
    }
    finish(&ctx, &report);
    Ok(())
}
