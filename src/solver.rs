use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::debug;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::SolverConfig;
use crate::engine::{GameState, Move};
use crate::error::SolveFailure;
use crate::heuristics::{choose_move, Strategy};
use crate::level::LevelRecord;

/// Outcome of one greedy solve.
#[derive(Clone, Debug)]
pub struct SolveResult {
    pub success: bool,
    /// Moves played, including the ones made before a failure.
    pub total_moves: u32,
    pub total_matches: u32,
    /// Every executed move in order, with its score and trace.
    pub moves: Vec<Move>,
    /// Why the board was not cleared; `None` on success.
    pub failure: Option<SolveFailure>,
    pub duration: Duration,
}

impl SolveResult {
    fn failed(failure: SolveFailure, duration: Duration) -> Self {
        SolveResult {
            success: false,
            total_moves: 0,
            total_matches: 0,
            moves: Vec::new(),
            failure: Some(failure),
            duration,
        }
    }

    /// Human-readable failure reason, `None` on success.
    pub fn failure_reason(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }
}

/// Plays `initial` forward with the greedy heuristic until the board is cleared,
/// no move is left, or `config.move_limit` moves have been made.
///
/// Triples already present on the board are cleared before the first move without
/// costing one. With `strategy` set to `None` the default scoring is used. `seed`
/// only matters for strategies with noise.
///
/// The search is fully deterministic for a given board, strategy and seed.
///
/// # Examples
/// ```
/// use sort_resort::config::SolverConfig;
/// use sort_resort::solver::solve;
/// use sort_resort::utils::board_from_str_array;
///
/// let state = board_from_str_array(&["AA.", "BB.", "AB."]).unwrap();
/// let result = solve(&state, None, &SolverConfig::default(), 0);
/// assert!(result.success);
/// assert_eq!(result.total_moves, 2);
/// ```
pub fn solve(initial: &GameState, strategy: Option<&Strategy>, config: &SolverConfig, seed: u64) -> SolveResult {
    let start = Instant::now();
    let mut state = initial.clone();
    let mut moves = Vec::new();

    let mut noise_rng = strategy
        .filter(|s| s.noise_magnitude > 0)
        .map(|_| SmallRng::seed_from_u64(seed));

    state.process_all_matches();

    let mut last_move: Option<Move> = None;
    let mut recent: VecDeque<Move> = VecDeque::with_capacity(config.pattern_window + 1);

    while !state.is_complete() && state.move_count() < config.move_limit {
        let Some(best) = choose_move(&state, last_move.as_ref(), &recent, strategy, noise_rng.as_mut()) else {
            let remaining = state.item_count();
            debug!("No valid moves after {} moves, {} items left", state.move_count(), remaining);
            return SolveResult {
                success: false,
                total_moves: state.move_count(),
                total_matches: state.match_count(),
                moves,
                failure: Some(SolveFailure::NoValidMoves { remaining }),
                duration: start.elapsed(),
            };
        };

        debug!("{} [{}] {}", best, best.score, best.reason);
        state.execute_move(&best);
        moves.push(best.clone());

        recent.push_back(best.clone());
        if recent.len() > config.pattern_window {
            recent.pop_front();
        }
        last_move = Some(best);

        if state.process_all_matches() > 0 {
            last_move = None;
            recent.clear();
        }
    }

    let failure = (!state.is_complete()).then(|| SolveFailure::MoveLimitExceeded {
        limit: config.move_limit,
        remaining: state.item_count(),
    });
    SolveResult {
        success: failure.is_none(),
        total_moves: state.move_count(),
        total_matches: state.match_count(),
        moves,
        failure,
        duration: start.elapsed(),
    }
}

/// Builds the board described by `level` and solves it.
///
/// A record that cannot be turned into a board yields a failed result carrying
/// [`SolveFailure::InitializationFailure`].
pub fn solve_level(level: &LevelRecord, strategy: Option<&Strategy>, config: &SolverConfig, seed: u64) -> SolveResult {
    let start = Instant::now();
    match level.to_game_state() {
        Ok(state) => solve(&state, strategy, config, seed),
        Err(failure) => SolveResult::failed(failure, start.elapsed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::board_from_str_array;

    fn solve_default(state: &GameState) -> SolveResult {
        solve(state, None, &SolverConfig::default(), 0)
    }

    #[test]
    fn test_solve_tutorial_board() {
        let state = board_from_str_array(&["AA.", "BB.", "AB."]).unwrap();
        let result = solve_default(&state);
        assert!(result.success);
        assert_eq!(result.total_moves, 2);
        assert_eq!(result.total_matches, 2);
        assert_eq!(result.moves.len(), 2);
        assert!(result.failure.is_none());
        assert!(result.failure_reason().is_none());
        assert!(result.moves.iter().all(|m| m.score == 999));
        // The caller's board is untouched.
        assert_eq!(state.item_count(), 6);
    }

    #[test]
    fn test_solve_deadlocked_board() {
        let state = board_from_str_array(&["ABC", "DEF"]).unwrap();
        let result = solve_default(&state);
        assert!(!result.success);
        assert_eq!(result.total_moves, 0);
        assert_eq!(result.failure, Some(SolveFailure::NoValidMoves { remaining: 6 }));
        assert_eq!(result.failure_reason().unwrap(), "No valid moves. 6 items remaining.");
    }

    #[test]
    fn test_solve_clears_starting_cascade_without_moves() {
        let state = board_from_str_array(&["AAA/BBB"]).unwrap();
        let result = solve_default(&state);
        assert!(result.success);
        assert_eq!(result.total_moves, 0);
        assert_eq!(result.total_matches, 2);
    }

    #[test]
    fn test_solve_respects_move_limit() {
        let state = board_from_str_array(&["AA.", "BB.", "AB."]).unwrap();
        let config = SolverConfig::default().with_move_limit(1);
        let result = solve(&state, None, &config, 0);
        assert!(!result.success);
        assert_eq!(result.total_moves, 1);
        assert_eq!(result.total_matches, 1);
        assert_eq!(result.failure, Some(SolveFailure::MoveLimitExceeded { limit: 1, remaining: 3 }));
    }

    #[test]
    fn test_solve_with_hidden_rows_and_lock() {
        // Clearing the A triple reveals the Bs and opens the locked container.
        let state = board_from_str_array(&["AA./BB.", "A../...", "L1:B..", "..."]).unwrap();
        let result = solve_default(&state);
        assert!(result.success, "{:?}", result.failure_reason());
        assert_eq!(result.total_matches, 2);
        assert_eq!(result.total_moves, 2);
    }

    #[test]
    fn test_solve_is_deterministic() {
        let state = board_from_str_array(&["AB./CA.", "BC./...", "CAB", "..."]).unwrap();
        let first = solve_default(&state);
        let second = solve_default(&state);
        assert_eq!(first.success, second.success);
        assert_eq!(first.total_moves, second.total_moves);
        assert_eq!(first.moves, second.moves);
    }

    #[test]
    fn test_noisy_solve_repeats_with_same_seed() {
        let state = board_from_str_array(&["AB./CA.", "BC./...", "CAB", "..."]).unwrap();
        let strategy = Strategy::aggressive().with_noise(2, 8);
        let config = SolverConfig::default();
        let first = solve(&state, Some(&strategy), &config, 2);
        let second = solve(&state, Some(&strategy), &config, 2);
        assert_eq!(first.moves, second.moves);
        assert_eq!(first.total_moves, second.total_moves);
    }

    #[test]
    fn test_move_count_never_exceeds_limit() {
        let state = board_from_str_array(&["AB./CA.", "BC./...", "CAB", "..."]).unwrap();
        for limit in 1..6 {
            let result = solve(&state, None, &SolverConfig::default().with_move_limit(limit), 0);
            assert!(result.total_moves <= limit);
            assert_eq!(result.moves.len() as u32, result.total_moves);
        }
    }
}
