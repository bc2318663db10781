//! Move evaluation for the greedy solver.
//!
//! The scorer is additive: each rule below adds or subtracts a fixed amount, and
//! three running subtotals (pairing, reveal, penalty) are kept on the side so a
//! [`Strategy`] can rescale them afterwards. Every constant here is part of the
//! solver's observable behaviour; changing one changes move sequences.
use std::collections::{HashSet, VecDeque};

use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::{Container, GameState, ItemId, Move, MATCH_SIZE};

/// Score reported for a move that completes a triple on the spot.
pub const ONE_MOVE_MATCH_SCORE: i32 = 999;
/// Subtracted from a move that exactly undoes the previous one.
pub const REVERSAL_PENALTY: i32 = 1000;
/// Subtracted from a move whose reverse appears in the recent-move window.
pub const PATTERN_PENALTY: i32 = 500;

/// Named weight profile applied to the scorer's subtotals.
///
/// A weight of `1.0` leaves its subtotal untouched; `noise_magnitude == 0` keeps the
/// search fully deterministic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    /// Scales pair creation/destruction bonuses.
    pub pair_weight: f64,
    /// Scales reveal and row-advance bonuses.
    pub reveal_weight: f64,
    /// Scales penalties (higher = more cautious).
    pub caution_weight: f64,
    /// Random noise in `-n..=n` added to each candidate's score.
    pub noise_magnitude: i32,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::balanced()
    }
}

impl Strategy {
    fn profile(name: &str, pair_weight: f64, reveal_weight: f64, caution_weight: f64) -> Self {
        Strategy {
            name: name.to_string(),
            pair_weight,
            reveal_weight,
            caution_weight,
            noise_magnitude: 0,
        }
    }

    pub fn balanced() -> Self {
        Strategy::profile("Balanced", 1.0, 1.0, 1.0)
    }

    pub fn pair_focused() -> Self {
        Strategy::profile("PairFocused", 1.4, 0.85, 1.0)
    }

    pub fn reveal_focused() -> Self {
        Strategy::profile("RevealFocused", 0.85, 1.4, 1.0)
    }

    pub fn cautious() -> Self {
        Strategy::profile("Cautious", 1.0, 0.9, 1.6)
    }

    pub fn aggressive() -> Self {
        Strategy::profile("Aggressive", 1.1, 1.3, 0.5)
    }

    /// The ensemble's strategy set, in the order it is run.
    pub fn all() -> Vec<Strategy> {
        vec![
            Strategy::balanced(),
            Strategy::pair_focused(),
            Strategy::reveal_focused(),
            Strategy::cautious(),
            Strategy::aggressive(),
        ]
    }

    /// Copy of this profile with noise enabled, named `<name>_n<run>`.
    pub fn with_noise(&self, run: u32, magnitude: i32) -> Self {
        Strategy {
            name: format!("{}_n{}", self.name, run),
            noise_magnitude: magnitude,
            ..self.clone()
        }
    }
}

/// How reachable one item type is right now.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Accessibility {
    /// Copies in the front row of an unlocked container.
    pub accessible: u32,
    /// Copies one event away: the front row of a nearly-unlocked container, or
    /// row 1 of a container about to advance.
    pub near_accessible: u32,
    /// Copies anywhere on the board.
    pub total: u32,
}

/// Per-item [`Accessibility`], rebuilt once per search step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessibilityMap {
    entries: Vec<Accessibility>,
}

impl AccessibilityMap {
    /// Classifies every item on the board.
    ///
    /// A locked container within two matches of unlocking exposes its front row as
    /// "nearly accessible"; an unlocked container with at most one occupied front
    /// slot and hidden rows exposes its row 1 the same way.
    pub fn analyze(state: &GameState) -> Self {
        let near_advance: Vec<bool> = state
            .containers()
            .iter()
            .map(|c| !c.is_locked() && c.occupied_front_slot_count() <= 1 && c.has_back_row_items())
            .collect();

        let mut entries = vec![Accessibility::default(); state.catalog().len()];
        for (index, container) in state.containers().iter().enumerate() {
            for slot in 0..container.slot_count() {
                for row in 0..container.max_rows() {
                    let Some(item) = container.get(slot, row) else {
                        continue;
                    };
                    if item.index() >= entries.len() {
                        entries.resize(item.index() + 1, Accessibility::default());
                    }
                    let entry = &mut entries[item.index()];
                    entry.total += 1;
                    if row == 0 && !container.is_locked() {
                        entry.accessible += 1;
                    } else if row == 0 && container.is_near_unlock() {
                        entry.near_accessible += 1;
                    } else if row == 1 && near_advance[index] {
                        entry.near_accessible += 1;
                    }
                }
            }
        }
        AccessibilityMap { entries }
    }

    pub fn get(&self, item: ItemId) -> Accessibility {
        self.entries.get(item.index()).copied().unwrap_or_default()
    }
}

/// Front-row item counts in first-seen order.
fn ordered_counts(items: impl IntoIterator<Item = ItemId>) -> Vec<(ItemId, usize)> {
    let mut counts: Vec<(ItemId, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(i, _)| *i == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((item, 1)),
        }
    }
    counts
}

fn has_pair(items: impl IntoIterator<Item = ItemId>) -> Option<ItemId> {
    ordered_counts(items)
        .into_iter()
        .find(|&(_, n)| n >= 2)
        .map(|(item, _)| item)
}

/// Emptying this container's last front item would advance its rows.
fn is_last_front_item(container: &Container) -> bool {
    container.occupied_front_slot_count() == 1 && container.has_back_row_items()
}

/// Finds a move that completes a triple immediately.
///
/// A candidate drops the third copy into a matchable, unlocked container whose front
/// row already holds two copies and an empty slot. When several exist, the one with
/// the best reveal potential wins: emptying its source's front row (more so when the
/// revealed types have a waiting pair somewhere) and clearing a destination that
/// hides rows. Ties keep the first candidate found.
///
/// # Examples
/// ```
/// use sort_resort::heuristics::find_one_move_match;
/// use sort_resort::utils::board_from_str_array;
///
/// let state = board_from_str_array(&["AA.", "BB.", "AB."]).unwrap();
/// let mv = find_one_move_match(&state).unwrap();
/// assert_eq!((mv.from_container, mv.to_container), (2, 0));
/// ```
pub fn find_one_move_match(state: &GameState) -> Option<Move> {
    let mut best: Option<(i32, Move)> = None;

    for (ci, container) in state.containers().iter().enumerate() {
        if container.is_locked() || container.slot_count() < MATCH_SIZE {
            continue;
        }
        let Some(empty_slot) = container.first_empty_front_slot() else {
            continue;
        };
        let front = container.front_row_items();
        if front.len() < 2 {
            continue;
        }

        for (target, count) in ordered_counts(front) {
            if count < 2 {
                continue;
            }
            for (oci, other) in state.containers().iter().enumerate() {
                if oci == ci || other.is_locked() {
                    continue;
                }
                for os in 0..other.slot_count() {
                    if other.front_item(os) != Some(target) {
                        continue;
                    }

                    let mut reveal_score = 0;
                    if is_last_front_item(other) {
                        let revealed = other.items_that_would_advance();
                        reveal_score += 100 + revealed.len() as i32 * 20;
                        for &item in &revealed {
                            if state.has_waiting_pair_for(item) {
                                reveal_score += 50;
                            }
                        }
                    }
                    if container.has_back_row_items() {
                        let advancing = container.items_that_would_advance();
                        reveal_score += 50 + advancing.len() as i32 * 15;
                    }

                    if best.as_ref().map_or(true, |(score, _)| reveal_score > *score) {
                        best = Some((reveal_score, Move::new(oci, os, ci, empty_slot, target)));
                    }
                }
            }
        }
    }

    best.map(|(_, mv)| mv)
}

/// Running subtotals a [`Strategy`] can rescale.
#[derive(Default)]
struct Subtotals {
    pair: i32,
    reveal: i32,
    penalty: i32,
}

/// Scores one candidate move. Returns the score and a comma-separated trace of
/// every rule that fired (`"neutral"` when none did).
///
/// The move is simulated on a private clone of the board; `state` is untouched.
/// `access` must have been built from `state`.
pub fn score_move(
    state: &GameState,
    mv: &Move,
    access: &AccessibilityMap,
    strategy: Option<&Strategy>,
) -> (i32, String) {
    let mut score = 0;
    let mut reasons: Vec<String> = Vec::new();
    let mut sub = Subtotals::default();

    let from = state.container(mv.from_container);
    let to = state.container(mv.to_container);
    let item = mv.item;

    let Accessibility {
        accessible: acc,
        near_accessible: near,
        ..
    } = access.get(item);
    let is_actionable = acc + near >= 2;

    let dest_items = to.front_row_items();
    let matching_at_dest = to.front_count_of(item);

    // Match-enabling bonuses.
    let mut test_state = state.clone();
    test_state.execute_move(mv);

    let mut makes_or_enables_match = false;
    let mut credited_pair = false;
    let mut temp_location = false;

    if test_state.would_match() {
        score += 200;
        makes_or_enables_match = true;
        reasons.push("creates match".to_string());
    } else if let Some(follow_up) = find_one_move_match(&test_state) {
        makes_or_enables_match = true;
        if matching_at_dest >= 1 {
            score += 120;
            credited_pair = true;
            reasons.push("enables match + creates pair".to_string());
        } else if dest_items.is_empty() {
            score += 80;
            reasons.push("enables match (to empty)".to_string());
        } else {
            score += 40;
            temp_location = true;
            reasons.push("enables match (temp location)".to_string());
        }

        let fu_from = test_state.container(follow_up.from_container);
        if is_last_front_item(fu_from) {
            let revealed = fu_from.items_that_would_advance();
            let bonus = 20 + revealed.len() as i32 * 10;
            score += bonus;
            sub.reveal += bonus;
            reasons.push(format!("follow-up reveals {} items", revealed.len()));
        }

        let mut fu_state = test_state.clone();
        fu_state.execute_move(&follow_up);
        fu_state.process_all_matches();
        if find_one_move_match(&fu_state).is_some() {
            score += 15;
            sub.reveal += 15;
            reasons.push("follow-up chains into match".to_string());
        }
    }

    // Pairing.
    let mut pair_room_will_open = false;
    if matching_at_dest == 1 && !credited_pair {
        let third_accessible = acc >= 3;
        let third_nearly = acc + near >= 3;
        let has_room_for_third = to.empty_front_slot_count() >= 2;

        if third_accessible && has_room_for_third {
            score += 180;
            sub.pair += 180;
            reasons.push("creates completable pair".to_string());
        } else if third_accessible {
            score -= 50;
            sub.pair -= 50;
            reasons.push("creates BLOCKED pair (no room for 3rd)".to_string());
        } else if third_nearly && has_room_for_third {
            if to.back_row_item_types().contains(&item) {
                score -= 200;
                sub.pair -= 200;
                reasons.push("SELF-BLOCKING pair (3rd hidden HERE)".to_string());
            } else {
                score += 100;
                sub.pair += 100;
                reasons.push("creates near-completable pair (3rd nearly accessible)".to_string());
            }
        } else if has_room_for_third {
            score += 20;
            sub.pair += 20;
            reasons.push("creates waiting pair (3rd hidden)".to_string());
            if to.has_back_row_items() {
                score -= 80;
                sub.pair -= 80;
                reasons.push("pair blocks reveals".to_string());
            }
        } else {
            let blockers: Vec<ItemId> = ordered_counts(dest_items.iter().copied())
                .into_iter()
                .map(|(i, _)| i)
                .filter(|&i| i != item)
                .collect();
            let room_will_open = !blockers.is_empty()
                && blockers
                    .iter()
                    .all(|&b| test_state.unlocked_front_count_of(b) >= MATCH_SIZE);

            if room_will_open {
                score += 30;
                sub.pair += 30;
                pair_room_will_open = true;
                reasons.push("creates pair (room will open - blocking type clearable)".to_string());
            } else {
                score -= 100;
                sub.pair -= 100;
                reasons.push("creates useless pair (hidden + blocked)".to_string());
            }
        }
    } else if matching_at_dest == 0 && !dest_items.is_empty() && !temp_location {
        score -= 10;
        sub.penalty -= 10;
        reasons.push("mixes items".to_string());
    }

    if matching_at_dest >= 1 && credited_pair && to.back_row_item_types().contains(&item) {
        score -= 200;
        sub.pair -= 200;
        reasons.push("SELF-BLOCKING pair (3rd hidden HERE)".to_string());
    }

    // Actionability. The bonus itself is deliberately outside every subtotal.
    if is_actionable {
        score += 30;
        reasons.push("actionable item".to_string());
    } else if !makes_or_enables_match {
        score -= 40;
        sub.penalty -= 40;
        reasons.push("stuck item shuffle".to_string());
    }

    // Pair destruction at the source.
    if from.front_count_of(item) == 2 && matching_at_dest != 2 {
        let has_room = from.empty_front_slot_count() >= 1;
        if acc >= 3 && has_room {
            score -= 150;
            sub.pair -= 150;
            reasons.push("DESTROYS completable pair".to_string());
        } else if acc >= 3 {
            score -= 30;
            sub.pair -= 30;
            reasons.push("breaks blocked pair".to_string());
        }
    }

    // Row advancement at the source.
    let from_occupied = from.occupied_front_slot_count();
    let triggers_reveal = is_last_front_item(from);

    if triggers_reveal {
        let revealed = from.items_that_would_advance();
        let bonus = 100 + revealed.len() as i32 * 25;
        score += bonus;
        sub.reveal += bonus;
        reasons.push(format!("triggers row advance ({} items)", revealed.len()));

        if let Some(&waiting) = revealed.iter().find(|&&r| state.has_waiting_pair_for(r)) {
            score += 80;
            sub.reveal += 80;
            reasons.push(format!("reveals {} for waiting pair", state.item_name(waiting)));
        }

        if matching_at_dest == 1 && acc >= 3 {
            score += 60;
            sub.reveal += 60;
            reasons.push("combo: completable pair + reveal".to_string());
        } else if matching_at_dest == 1 && acc + near >= 3 {
            score += 50;
            sub.reveal += 50;
            reasons.push("combo: near-pair + reveal".to_string());
        }
    } else if from.has_back_row_items() {
        let hidden = from.back_row_item_count();
        let bonus = 30 + hidden as i32 * 10;
        score += bonus;
        sub.reveal += bonus;
        reasons.push(format!("progress toward reveal ({} hidden)", hidden));
    }

    // Pairs left behind at the source.
    if triggers_reveal {
        if let Some(pair) = has_pair(from.items_that_would_advance()) {
            score += 40;
            sub.pair += 40;
            reasons.push(format!("reveals source pair ({})", state.item_name(pair)));
        }
    } else if from_occupied > 1 {
        let remaining = (0..from.slot_count())
            .filter(|&s| s != mv.from_slot)
            .filter_map(|s| from.front_item(s));
        if let Some(pair) = has_pair(remaining) {
            score += 25;
            sub.pair += 25;
            reasons.push(format!("exposes source pair ({})", state.item_name(pair)));
        }
    }

    // Destination quality.
    if to.empty_front_slot_count() <= 1 && !pair_room_will_open {
        score -= 15;
        sub.penalty -= 15;
        reasons.push("fills container".to_string());
    }

    // Deadlock prevention. `test_state` is not needed after this point.
    let matches_from_move = test_state.process_all_matches();
    let total_empty_slots = test_state.empty_front_slots();
    let near_unlock_count = test_state.near_unlock_count();

    if matches_from_move == 0 {
        if total_empty_slots == 0 && near_unlock_count == 0 {
            score -= 500;
            sub.penalty -= 500;
            reasons.push("DEADLOCK: leaves 0 empty slots".to_string());
        } else if total_empty_slots == 0 {
            score -= 150;
            sub.penalty -= 150;
            reasons.push("tight board (unlocks coming)".to_string());
        } else if total_empty_slots == 1 && near_unlock_count == 0 {
            score -= 100;
            sub.penalty -= 100;
            reasons.push("near-deadlock: only 1 empty slot left".to_string());
        } else if total_empty_slots <= 2 && near_unlock_count == 0 {
            score -= 30;
            sub.penalty -= 30;
            reasons.push("low slots remaining".to_string());
        }
    }

    // Staging into an empty container.
    if dest_items.is_empty() {
        if triggers_reveal {
            score += 20;
            reasons.push("productive staging".to_string());
        } else {
            score -= 5;
            sub.penalty -= 5;
            reasons.push("staging move".to_string());
        }
    }

    if from.empty_front_slot_count() >= 2 && is_actionable && matching_at_dest == 0 && !triggers_reveal {
        score -= 35;
        sub.penalty -= 35;
        reasons.push("disrupts match-in-place potential".to_string());
    }

    // Completing a triple where hidden rows are waiting.
    let will_complete = matching_at_dest >= 2 || (matching_at_dest == 1 && acc >= 3);
    if to.has_back_row_items() && matching_at_dest >= 1 && will_complete {
        let hidden = to.back_row_item_count();
        let bonus = 50 + hidden as i32 * 20;
        score += bonus;
        sub.reveal += bonus;
        reasons.push(format!("triple reveals {} hidden item(s)", hidden));

        if to.back_row_item_types().iter().any(|&h| h != item) {
            score += 30;
            sub.reveal += 30;
            reasons.push("clears container for revealed items".to_string());
        }
    }

    if let Some(strategy) = strategy {
        score += (sub.pair as f64 * (strategy.pair_weight - 1.0)) as i32;
        score += (sub.reveal as f64 * (strategy.reveal_weight - 1.0)) as i32;
        score += (sub.penalty as f64 * (strategy.caution_weight - 1.0)) as i32;
    }

    let trace = if reasons.is_empty() {
        "neutral".to_string()
    } else {
        reasons.join(", ")
    };
    (score, trace)
}

/// Picks the next move for the greedy search.
///
/// 1. A move that completes a triple right now is always taken.
/// 2. Otherwise every legal move is scored; exact reversals of `last_move` and moves
///    whose reverse sits in `recent` are penalized, and noise is added when the
///    strategy asks for it.
/// 3. The highest score wins; ties keep enumeration order.
///
/// Returns `None` when no legal move exists.
pub fn choose_move(
    state: &GameState,
    last_move: Option<&Move>,
    recent: &VecDeque<Move>,
    strategy: Option<&Strategy>,
    mut noise_rng: Option<&mut SmallRng>,
) -> Option<Move> {
    if let Some(mut mv) = find_one_move_match(state) {
        mv.score = ONE_MOVE_MATCH_SCORE;
        mv.reason = "1-move match (always taken)".to_string();
        return Some(mv);
    }

    let access = AccessibilityMap::analyze(state);
    let candidates = state.enumerate_moves();
    if candidates.is_empty() {
        return None;
    }

    let recent_set: HashSet<(ItemId, usize, usize)> = recent.iter().map(Move::signature).collect();
    let noise = strategy.map_or(0, |s| s.noise_magnitude);

    let mut best: Option<Move> = None;
    for mut mv in candidates {
        let (mut score, mut reason) = score_move(state, &mv, &access, strategy);

        if last_move.map_or(false, |last| mv.is_reversal_of(last)) {
            score -= REVERSAL_PENALTY;
            reason.push_str(", REVERSAL PENALTY");
        }
        if recent_set.contains(&mv.reverse_signature()) {
            score -= PATTERN_PENALTY;
            reason.push_str(", PATTERN PENALTY");
        }
        if noise > 0 {
            if let Some(rng) = noise_rng.as_deref_mut() {
                score += rng.gen_range(-noise..=noise);
            }
        }

        if best.as_ref().map_or(true, |b| score > b.score) {
            mv.score = score;
            mv.reason = reason;
            best = Some(mv);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::board_from_str_array;
    use rand::SeedableRng;

    fn item(state: &GameState, name: &str) -> ItemId {
        state.catalog().get(name).unwrap()
    }

    #[test]
    fn test_accessibility_classification() {
        let state = board_from_str_array(&["AB./CD.", "L1:E..", "L5:F..", "A../G.."]).unwrap();
        let access = AccessibilityMap::analyze(&state);

        let a = access.get(item(&state, "A"));
        assert_eq!((a.accessible, a.near_accessible, a.total), (2, 0, 2));
        // Row 1 of a container with two occupied front slots is not near.
        let c = access.get(item(&state, "C"));
        assert_eq!((c.accessible, c.near_accessible, c.total), (0, 0, 1));
        let e = access.get(item(&state, "E"));
        assert_eq!((e.accessible, e.near_accessible), (0, 1));
        let f = access.get(item(&state, "F"));
        assert_eq!((f.accessible, f.near_accessible, f.total), (0, 0, 1));
        let g = access.get(item(&state, "G"));
        assert_eq!((g.accessible, g.near_accessible), (0, 1));
        assert_eq!(access.get(ItemId(42)), Accessibility::default());
    }

    #[test]
    fn test_one_move_match_none_without_pairs() {
        let state = board_from_str_array(&["AB.", "BA.", "C.."]).unwrap();
        assert!(find_one_move_match(&state).is_none());
    }

    #[test]
    fn test_one_move_match_ignores_locked_source() {
        let state = board_from_str_array(&["AA.", "L3:A.."]).unwrap();
        assert!(find_one_move_match(&state).is_none());
    }

    #[test]
    fn test_one_move_match_prefers_revealing_source() {
        // Container 1 has a plain A; container 2's A is its last front item with
        // something hidden behind it.
        let state = board_from_str_array(&["AA./...", "AB./...", "A../C.."]).unwrap();
        let mv = find_one_move_match(&state).unwrap();
        assert_eq!(mv.from_container, 2);
        assert_eq!(mv.to_container, 0);
        assert_eq!(mv.to_slot, 2);
    }

    #[test]
    fn test_score_reveal_move_exact_and_weighted() {
        let state = board_from_str_array(&["A../BCD", "..."]).unwrap();
        let access = AccessibilityMap::analyze(&state);
        let mv = Move::new(0, 0, 1, 0, item(&state, "A"));

        let (balanced, trace) = score_move(&state, &mv, &access, Some(&Strategy::balanced()));
        assert_eq!(balanced, 125, "{}", trace);
        assert!(trace.contains("triggers row advance (3 items)"));
        assert!(trace.contains("stuck item shuffle"));
        assert!(trace.contains("low slots remaining"));
        assert!(trace.contains("productive staging"));

        let (unweighted, _) = score_move(&state, &mv, &access, None);
        assert_eq!(unweighted, balanced);

        let (reveal, _) = score_move(&state, &mv, &access, Some(&Strategy::reveal_focused()));
        assert_eq!(reveal, 194);

        let (cautious, _) = score_move(&state, &mv, &access, Some(&Strategy::cautious()));
        assert_eq!(cautious, 66);
    }

    #[test]
    fn test_score_near_deadlock() {
        let state = board_from_str_array(&["AB.", "CDE"]).unwrap();
        let access = AccessibilityMap::analyze(&state);
        let mv = Move::new(1, 0, 0, 2, item(&state, "C"));
        let (score, trace) = score_move(&state, &mv, &access, None);
        assert_eq!(score, -165, "{}", trace);
        assert!(trace.contains("mixes items"));
        assert!(trace.contains("fills container"));
        assert!(trace.contains("near-deadlock"));
    }

    #[test]
    fn test_score_full_deadlock_is_severe() {
        let state = board_from_str_array(&["AB.", "CDE", "FGH"]).unwrap();
        let access = AccessibilityMap::analyze(&state);
        let mv = Move::new(1, 0, 0, 2, item(&state, "C"));
        let (_, trace) = score_move(&state, &mv, &access, None);
        assert!(!trace.contains("DEADLOCK"), "{}", trace);

        // The source advances DEF into its emptied front row.
        let tight = board_from_str_array(&["AB.", "C../DEF"]).unwrap();
        let access = AccessibilityMap::analyze(&tight);
        let mv = Move::new(1, 0, 0, 2, item(&tight, "C"));
        let (_, trace) = score_move(&tight, &mv, &access, None);
        assert!(trace.contains("DEADLOCK: leaves 0 empty slots"), "{}", trace);
    }

    #[test]
    fn test_score_enabled_match_credits_pair() {
        let state = board_from_str_array(&["A..", "AB.", "A.."]).unwrap();
        let access = AccessibilityMap::analyze(&state);
        let mv = Move::new(1, 0, 0, 1, item(&state, "A"));
        let (_, trace) = score_move(&state, &mv, &access, None);
        assert!(trace.starts_with("enables match + creates pair"), "{}", trace);
        assert!(trace.contains("actionable item"));
        assert!(!trace.contains("creates completable pair"));
    }

    #[test]
    fn test_choose_move_takes_one_move_match() {
        let state = board_from_str_array(&["AA.", "BB.", "AB."]).unwrap();
        let mv = choose_move(&state, None, &VecDeque::new(), None, None).unwrap();
        assert_eq!(mv.score, ONE_MOVE_MATCH_SCORE);
        assert_eq!(mv.to_container, 0);
    }

    #[test]
    fn test_choose_move_none_on_full_board() {
        let state = board_from_str_array(&["ABC", "DEF"]).unwrap();
        assert!(choose_move(&state, None, &VecDeque::new(), None, None).is_none());
    }

    #[test]
    fn test_choose_move_ties_keep_enumeration_order() {
        let state = board_from_str_array(&["AB.", "CDE"]).unwrap();
        let mv = choose_move(&state, None, &VecDeque::new(), None, None).unwrap();
        assert_eq!((mv.from_container, mv.from_slot), (1, 0));
        assert_eq!(mv.score, -165);
    }

    #[test]
    fn test_choose_move_avoids_reversal_and_pattern() {
        let state = board_from_str_array(&["A..", "B..", "C..", "..."]).unwrap();
        let first = choose_move(&state, None, &VecDeque::new(), None, None).unwrap();

        // Pretend `first` undoes the previous move.
        let previous = Move::new(first.to_container, first.to_slot, first.from_container, first.from_slot, first.item);
        let mut recent = VecDeque::new();
        recent.push_back(previous.clone());

        let second = choose_move(&state, Some(&previous), &recent, None, None).unwrap();
        assert!(!second.is_reversal_of(&previous));
        assert!(second.score > first.score - REVERSAL_PENALTY - PATTERN_PENALTY);
    }

    #[test]
    fn test_noise_is_bounded_and_seeded() {
        let state = board_from_str_array(&["A..", "B..", "C..", "..."]).unwrap();
        let strategy = Strategy::balanced().with_noise(1, 8);
        assert_eq!(strategy.name, "Balanced_n1");

        let mut rng_a = SmallRng::seed_from_u64(1);
        let mut rng_b = SmallRng::seed_from_u64(1);
        let a = choose_move(&state, None, &VecDeque::new(), Some(&strategy), Some(&mut rng_a)).unwrap();
        let b = choose_move(&state, None, &VecDeque::new(), Some(&strategy), Some(&mut rng_b)).unwrap();
        assert_eq!(a, b);

        let access = AccessibilityMap::analyze(&state);
        let mut shifted = false;
        for seed in 0..20 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let noisy = choose_move(&state, None, &VecDeque::new(), Some(&strategy), Some(&mut rng)).unwrap();
            let (clean, _) = score_move(&state, &noisy, &access, None);
            assert!((noisy.score - clean).abs() <= 8, "seed {}: {} vs {}", seed, noisy.score, clean);
            shifted |= noisy.score != clean;
        }
        assert!(shifted);
    }

    #[test]
    fn test_strategy_profiles() {
        let all = Strategy::all();
        let names: Vec<&str> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Balanced", "PairFocused", "RevealFocused", "Cautious", "Aggressive"]);
        assert!(all.iter().all(|s| s.noise_magnitude == 0));
        assert_eq!(Strategy::default(), Strategy::balanced());
    }
}
