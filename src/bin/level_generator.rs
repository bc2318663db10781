use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;
use sort_resort::config::Settings;
use sort_resort::generator::{generate_batch, ItemPool};
use sort_resort::level::LevelRecord;

/// Item types used when no pool file is given.
const DEFAULT_POOL_SIZE: usize = 25;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Level JSON whose containers are used as the layout
    layout_file: PathBuf,

    /// First level number to generate
    #[clap(short, long, default_value_t = 1)]
    level: u32,

    /// Number of consecutive levels
    #[clap(short, long, default_value_t = 1)]
    count: u32,

    /// Base seed
    #[clap(short, long, default_value_t = 0)]
    seed: u64,

    /// Item pool JSON: {"world_id": ..., "item_groups": [[unlock_level, [items...]], ...]}
    #[clap(short, long)]
    items: Option<PathBuf>,

    /// Output directory for the generated level files
    #[clap(short, long, default_value = "levels")]
    out: PathBuf,

    /// Settings file (JSON)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Write the effective settings to this file before generating
    #[clap(long)]
    save_config: Option<PathBuf>,
}

fn read_pool(path: &Path) -> Result<ItemPool> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid item pool {}", path.display()))
}

fn default_pool() -> ItemPool {
    ItemPool {
        world_id: "world".to_string(),
        item_groups: vec![(1, (1..=DEFAULT_POOL_SIZE).map(|i| format!("item_{:02}", i)).collect())],
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let settings = args.config.as_deref().map(Settings::load_or_default).unwrap_or_default();
    if let Some(path) = &args.save_config {
        settings
            .save(path)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
    }
    let template = LevelRecord::load(&args.layout_file)
        .with_context(|| format!("Failed to read layout from {}", args.layout_file.display()))?;
    let pool = match &args.items {
        Some(path) => read_pool(path)?,
        None => default_pool(),
    };

    println!(
        "Generating {} level(s) from L{} on {} containers (seed {})\n",
        args.count,
        args.level,
        template.containers.len(),
        args.seed
    );
    let report = generate_batch(args.level, args.count, &template, &pool, &settings, args.seed)
        .context("Generation failed")?;

    fs::create_dir_all(&args.out).with_context(|| format!("Failed to create {}", args.out.display()))?;
    let mut verified = 0;
    for generated in &report.levels {
        let path = args.out.join(format!("level_{:03}.json", generated.record.id));
        generated
            .record
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if generated.verified {
            verified += 1;
        }
        println!(
            "  L{:3}: {:3} items, stars {:?}, {}s -> {}",
            generated.record.id,
            generated.record.item_count(),
            generated.record.star_move_thresholds,
            generated.record.time_limit_seconds,
            path.display()
        );
    }

    for (level, problem) in report.diagnostics() {
        warn!("L{}: {}", level, problem);
    }
    if let Some(unused) = report.unused_diagnostic() {
        warn!("{}", unused);
    }

    println!(
        "\n{} of {} level(s) verified, {} skipped",
        verified,
        report.levels.len(),
        report.skipped.len()
    );
    Ok(())
}
