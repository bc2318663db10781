use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use sort_resort::config::Settings;
use sort_resort::constructor::construct;
use sort_resort::heuristics::Strategy;
use sort_resort::level::{ContainerDef, LevelRecord};
use sort_resort::solver::solve;

const COLUMNS: usize = 3;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Number of boards to evaluate
    #[clap(short, long, default_value_t = 20)]
    boards: u32,

    /// First seed; board `i` uses `seed + i`
    #[clap(short, long, default_value_t = 0)]
    seed: u64,

    /// Triples per board
    #[clap(short, long, default_value_t = 8)]
    triples: usize,

    /// Containers per board when no layout file is given
    #[clap(long, default_value_t = 6)]
    containers: usize,

    /// Level JSON whose containers are used as the layout
    #[clap(long)]
    layout: Option<PathBuf>,

    /// Settings file (JSON)
    #[clap(long)]
    config: Option<PathBuf>,
}

#[derive(Default)]
struct Tally {
    solved: u32,
    moves: Vec<u32>,
}

fn grid_layout(count: usize) -> Vec<ContainerDef> {
    (0..count)
        .map(|i| {
            let (col, row) = (i % COLUMNS, i / COLUMNS);
            ContainerDef::new(format!("c{}", i), 3, 3).at(200.0 + 340.0 * col as f64, 450.0 + 320.0 * row as f64)
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let settings = args.config.as_deref().map(Settings::load_or_default).unwrap_or_default();
    let layout = match &args.layout {
        Some(path) => {
            LevelRecord::load(path)
                .with_context(|| format!("Failed to read layout from {}", path.display()))?
                .containers
        }
        None => grid_layout(args.containers),
    };
    let triples: Vec<String> = (0..args.triples).map(|i| format!("item_{:02}", i % 12)).collect();
    let strategies = Strategy::all();

    let mut tallies: HashMap<String, Tally> = HashMap::new();
    println!("Starting strategy evaluation for {} boards...", args.boards);

    for board_idx in 0..args.boards {
        let current_seed = args.seed + u64::from(board_idx);
        let mut rng = SmallRng::seed_from_u64(current_seed);
        let built = construct(&layout, &triples, &settings.constructor, &mut rng);

        println!(
            "\nBoard {} (Seed: {}, {} items, {} construction moves)",
            board_idx,
            current_seed,
            built.state.item_count(),
            built.construction_moves
        );

        for strategy in &strategies {
            let result = solve(&built.state, Some(strategy), &settings.solver, current_seed);
            println!(
                "  Strategy: {:<14} {:<8} Moves: {}",
                strategy.name,
                if result.success { "solved" } else { "FAILED" },
                result.total_moves
            );
            let tally = tallies.entry(strategy.name.clone()).or_default();
            if result.success {
                tally.solved += 1;
                tally.moves.push(result.total_moves);
            }
        }
    }

    println!("\n--- Evaluation Complete ---");
    println!("Number of boards evaluated: {}", args.boards);
    println!("\n--- Results ---");

    let mut rows: Vec<(&str, u32, f64)> = tallies
        .iter()
        .map(|(name, tally)| {
            let avg = if tally.moves.is_empty() {
                f64::NAN
            } else {
                f64::from(tally.moves.iter().sum::<u32>()) / tally.moves.len() as f64
            };
            (name.as_str(), tally.solved, avg)
        })
        .collect();

    // Most solves first, then fewest average moves
    rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.total_cmp(&b.2)));

    for (name, solved, avg) in rows {
        println!(
            "Strategy {:<14}: solved {:>3}/{:<3} Average Moves = {:.2}",
            name, solved, args.boards, avg
        );
    }
    Ok(())
}
