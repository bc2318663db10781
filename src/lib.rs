//! # Sort Resort Level Tools
//!
//! Game rules, a greedy solver and a level generator for a tile-sort puzzle:
//! containers hold items in slots stacked in rows, only the front row is
//! playable, and three identical items in a front row clear and let the rows
//! behind advance.
//!
//! It is used by three binaries:
//! - `level_solver`: Loads a level file and solves it with one strategy or the
//!   full ensemble.
//! - `level_generator`: Builds a run of levels on a container layout and verifies
//!   each one with the ensemble.
//! - `strategy_evaluator`: Compares the scoring strategies over generated boards.
//!
//! ## Modules
//! - `engine`: Board representation (`GameState`, `Container`, `Move`) and all game
//!   mechanics (matching, row advance, unlocking).
//! - `heuristics`: Move scoring, strategy weights and move selection.
//! - `solver`: The greedy `solve` loop.
//! - `ensemble`: Best-of search over strategies and noisy restarts.
//! - `constructor`: Reverse-play construction of solvable boards.
//! - `generator`: Difficulty curves, item selection and verified level generation.
//! - `level`: The on-disk level record.
//! - `config`: Tunable settings.
//! - `error`: Error types.
//! - `utils`: Parsing boards from compact strings.

pub mod config;
pub mod constructor;
pub mod engine;
pub mod ensemble;
pub mod error;
pub mod generator;
pub mod heuristics;
pub mod level;
pub mod serde_duration;
pub mod solver;
pub mod utils;
