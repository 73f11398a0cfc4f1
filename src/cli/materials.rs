use crate::cli::MaterialsArgs;
use crate::config::Config;
use crate::materials::{scan, MaterialKind};

pub fn execute(args: MaterialsArgs) -> anyhow::Result<()> {
    let config = Config::load_or_default(&args.config)?;
    let dir = args.dir.unwrap_or(config.materials_dir);
    let files = scan(&dir, &config.materials)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    println!("Materials in {:?}:\n", dir);
    for file in &files {
        println!(
            "  {:<12} {:>10}  {}",
            file.kind.to_string(),
            file.bytes,
            file.path.display()
        );
    }

    let usable = files
        .iter()
        .filter(|f| f.kind != MaterialKind::Unsupported)
        .count();
    let total_bytes: u64 = files.iter().map(|f| f.bytes).sum();
    println!(
        "\n{} files ({} usable), {} bytes",
        files.len(),
        usable,
        total_bytes
    );
    Ok(())
}
