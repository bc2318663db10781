use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use sort_resort::config::Settings;
use sort_resort::engine::GameState;
use sort_resort::ensemble::solve_best;
use sort_resort::heuristics::Strategy;
use sort_resort::level::LevelRecord;
use sort_resort::solver::{solve, SolveResult};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the level JSON file
    level_file: PathBuf,

    /// Run every strategy with noisy restarts and keep the shortest solution
    #[clap(short, long)]
    best: bool,

    /// Single strategy to use (Balanced, PairFocused, RevealFocused, Cautious, Aggressive)
    #[clap(short, long, conflicts_with = "best")]
    strategy: Option<String>,

    /// Print every move with its score and reasoning
    #[clap(short, long)]
    verbose: bool,

    /// Print a JSON report instead of text
    #[clap(long)]
    json: bool,

    /// Settings file (JSON)
    #[clap(long)]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct MoveReport {
    item: String,
    from_container: usize,
    from_slot: usize,
    to_container: usize,
    to_slot: usize,
    score: i32,
    reason: String,
}

#[derive(Serialize)]
struct Report {
    level: u32,
    success: bool,
    strategy: String,
    total_moves: u32,
    total_matches: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
    #[serde(with = "sort_resort::serde_duration")]
    duration: Duration,
    moves: Vec<MoveReport>,
}

impl Report {
    fn new(level: &LevelRecord, state: &GameState, strategy: String, result: &SolveResult) -> Self {
        Report {
            level: level.id,
            success: result.success,
            strategy,
            total_moves: result.total_moves,
            total_matches: result.total_matches,
            failure: result.failure_reason(),
            duration: result.duration,
            moves: result
                .moves
                .iter()
                .map(|m| MoveReport {
                    item: state.item_name(m.item).to_string(),
                    from_container: m.from_container,
                    from_slot: m.from_slot,
                    to_container: m.to_container,
                    to_slot: m.to_slot,
                    score: m.score,
                    reason: m.reason.clone(),
                })
                .collect(),
        }
    }
}

fn find_strategy(name: &str) -> Result<Strategy> {
    match Strategy::all().into_iter().find(|s| s.name.eq_ignore_ascii_case(name)) {
        Some(strategy) => Ok(strategy),
        None => bail!("Unknown strategy '{}'", name),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let settings = args.config.as_deref().map(Settings::load_or_default).unwrap_or_default();
    let level = LevelRecord::load(&args.level_file)
        .with_context(|| format!("Failed to read level from {}", args.level_file.display()))?;
    let state = level
        .to_game_state()
        .with_context(|| format!("Invalid level {}", args.level_file.display()))?;

    let (strategy, result) = if args.best {
        let best = solve_best(&state, level.move_limit_hint(), &settings.solver, &settings.ensemble);
        (best.strategy, best.result)
    } else {
        let strategy = args.strategy.as_deref().map(find_strategy).transpose()?;
        let name = strategy.as_ref().map_or("Balanced", |s| s.name.as_str()).to_string();
        (name, solve(&state, strategy.as_ref(), &settings.solver, 0))
    };

    let report = Report::new(&level, &state, strategy, &result);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Loaded level {} from {}\n", level.id, args.level_file.display());
    println!("Initial board state:\n{}", state);
    if report.success {
        println!(
            "Solved with {} in {} moves ({} matches, {:.1}ms)",
            report.strategy,
            report.total_moves,
            report.total_matches,
            report.duration.as_secs_f64() * 1000.0
        );
    } else {
        println!(
            "Not solved with {}: {}",
            report.strategy,
            report.failure.as_deref().unwrap_or("unknown")
        );
    }

    if args.verbose {
        println!("\nMoves ({}):", report.moves.len());
        for (i, m) in report.moves.iter().enumerate() {
            println!(
                "  {:3}: {} C[{}].S[{}] -> C[{}].S[{}] (score {}: {})",
                i + 1,
                m.item,
                m.from_container,
                m.from_slot,
                m.to_container,
                m.to_slot,
                m.score,
                m.reason
            );
        }
    }
    Ok(())
}
