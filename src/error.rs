//! Error types shared by the solver, the constructor and the level I/O layer.
use std::io;

use thiserror::Error;

/// Why a solve attempt did not clear the board.
///
/// The solver never returns these through `Err`; they travel inside
/// [`SolveResult`](crate::solver::SolveResult) so callers always get move and
/// match counts back alongside the reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveFailure {
    /// The level record could not be turned into a board.
    #[error("Failed to initialize state: {0}")]
    InitializationFailure(String),
    /// Items remain but no legal move exists.
    #[error("No valid moves. {remaining} items remaining.")]
    NoValidMoves { remaining: usize },
    /// The search hit its move limit before the board was cleared.
    #[error("Max moves exceeded ({limit} move limit, {remaining} items remaining)")]
    MoveLimitExceeded { limit: u32, remaining: usize },
}

/// Problems raised while building a level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// The layout ran out of room before every triple found a host.
    #[error("Construction incomplete: placed {placed} of {requested} triples")]
    ConstructionIncomplete { placed: usize, requested: usize },
    /// No ensemble strategy solved any of the constructed boards.
    #[error("Solver failed after {attempts} attempts")]
    VerificationFailed { attempts: u32 },
    /// The layout template cannot host a level at all.
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),
    #[error("{items} items (not a multiple of 3)")]
    ItemCountNotMultipleOfThree { items: usize },
    #[error("{container} has a triple at row {row}")]
    PreMatchedRow { container: String, row: usize },
    #[error("{count} empty container(s)")]
    EmptyContainers { count: usize },
    #[error("Unused items: {}", .0.join(", "))]
    UnusedItems(Vec<String>),
}

/// Errors from reading or writing level records and settings files.
#[derive(Error, Debug)]
pub enum LevelError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
