//! Core game engine for the sort puzzle.
//!
//! This module defines the game's fundamental components:
//! - `ItemId` / `ItemCatalog`: compact item-type handles and the table of their names.
//! - `Container`: a slotted container with a fixed `slot × row` grid. Row 0 is the
//!   front row, the only row that takes part in moves and matches.
//! - `GameState`: the ordered set of containers plus move and match counters, with the
//!   match/cascade engine, move execution, and legal-move enumeration.
//! - `Move`: a single front-item transfer between two containers.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Slot count used when a container declares a non-positive one.
pub const DEFAULT_SLOT_COUNT: usize = 3;
/// Row depth used when a container declares a non-positive one.
pub const DEFAULT_MAX_ROWS: usize = 4;
/// Minimum slot count for a container to be able to form a triple.
pub const MATCH_SIZE: usize = 3;
/// A locked container this close to unlocking counts as "near unlock".
pub const NEAR_UNLOCK_MATCHES: u32 = 2;

/// Compact handle for an item type. Resolve it to a name through [`ItemCatalog`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u16);

impl ItemId {
    /// Index of this item in its catalog.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single grid cell: an item or nothing.
pub type Cell = Option<ItemId>;

/// Interning table from item names (as found in level records) to [`ItemId`]s.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemCatalog {
    names: Vec<String>,
    lookup: HashMap<String, ItemId>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `name`, allocating a new one the first time it is seen.
    pub fn intern(&mut self, name: &str) -> ItemId {
        if let Some(&id) = self.lookup.get(name) {
            return id;
        }
        let id = ItemId(self.names.len() as u16);
        self.names.push(name.to_string());
        self.lookup.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<ItemId> {
        self.lookup.get(name).copied()
    }

    /// Name of `id`, or `"?"` for an id this catalog never issued.
    pub fn name(&self, id: ItemId) -> &str {
        self.names.get(id.index()).map(String::as_str).unwrap_or("?")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One container on the board.
///
/// The grid is stored as `cells[slot][row]`; its dimensions never change after
/// creation. Locked containers reject every move in or out until enough matches
/// have happened elsewhere on the board.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Container {
    slot_count: usize,
    max_rows: usize,
    is_locked: bool,
    unlock_matches_required: u32,
    current_unlock_progress: u32,
    cells: Vec<Vec<Cell>>,
}

impl Container {
    /// Creates an empty container.
    ///
    /// A zero `slot_count` or `max_rows` is coerced to [`DEFAULT_SLOT_COUNT`] /
    /// [`DEFAULT_MAX_ROWS`] instead of producing an unusable grid.
    ///
    /// # Examples
    /// ```
    /// use sort_resort::engine::Container;
    /// let c = Container::new(0, 2, false, 0);
    /// assert_eq!(c.slot_count(), 3);
    /// assert_eq!(c.max_rows(), 2);
    /// assert!(c.is_empty());
    /// ```
    pub fn new(slot_count: usize, max_rows: usize, is_locked: bool, unlock_matches_required: u32) -> Self {
        let slot_count = if slot_count == 0 { DEFAULT_SLOT_COUNT } else { slot_count };
        let max_rows = if max_rows == 0 { DEFAULT_MAX_ROWS } else { max_rows };
        Container {
            slot_count,
            max_rows,
            is_locked,
            unlock_matches_required,
            current_unlock_progress: 0,
            cells: vec![vec![None; max_rows]; slot_count],
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    pub fn unlock_matches_required(&self) -> u32 {
        self.unlock_matches_required
    }

    pub fn unlock_progress(&self) -> u32 {
        self.current_unlock_progress
    }

    /// Matches still needed before this container unlocks (0 when unlocked).
    pub fn matches_until_unlock(&self) -> u32 {
        if !self.is_locked {
            return 0;
        }
        self.unlock_matches_required
            .saturating_sub(self.current_unlock_progress)
    }

    /// Locked, but at most [`NEAR_UNLOCK_MATCHES`] matches away from opening.
    pub fn is_near_unlock(&self) -> bool {
        self.is_locked && self.matches_until_unlock() <= NEAR_UNLOCK_MATCHES
    }

    /// Returns the cell at (`slot`, `row`), or `None` when out of range.
    pub fn get(&self, slot: usize, row: usize) -> Cell {
        self.cells.get(slot).and_then(|s| s.get(row)).copied().flatten()
    }

    /// Sets the cell at (`slot`, `row`).
    ///
    /// # Panics
    /// Panics if `slot` or `row` is outside the grid.
    pub fn set(&mut self, slot: usize, row: usize, cell: Cell) {
        self.cells[slot][row] = cell;
    }

    pub fn front_item(&self, slot: usize) -> Cell {
        self.get(slot, 0)
    }

    pub fn is_front_slot_empty(&self, slot: usize) -> bool {
        self.front_item(slot).is_none()
    }

    /// First empty front slot, scanning slots in order.
    pub fn first_empty_front_slot(&self) -> Option<usize> {
        (0..self.slot_count).find(|&s| self.is_front_slot_empty(s))
    }

    pub fn empty_front_slot_count(&self) -> usize {
        (0..self.slot_count)
            .filter(|&s| self.is_front_slot_empty(s))
            .count()
    }

    pub fn occupied_front_slot_count(&self) -> usize {
        self.slot_count - self.empty_front_slot_count()
    }

    /// Front-row items in slot order, skipping empty slots.
    pub fn front_row_items(&self) -> Vec<ItemId> {
        (0..self.slot_count).filter_map(|s| self.front_item(s)).collect()
    }

    /// Number of front-row cells holding `item`.
    pub fn front_count_of(&self, item: ItemId) -> usize {
        (0..self.slot_count)
            .filter(|&s| self.front_item(s) == Some(item))
            .count()
    }

    pub fn has_back_row_items(&self) -> bool {
        self.cells
            .iter()
            .any(|slot| slot.iter().skip(1).any(Option::is_some))
    }

    pub fn back_row_item_count(&self) -> usize {
        self.cells
            .iter()
            .map(|slot| slot.iter().skip(1).filter(|c| c.is_some()).count())
            .sum()
    }

    /// Every hidden item, slot by slot, front to back.
    pub fn back_row_item_types(&self) -> Vec<ItemId> {
        self.cells
            .iter()
            .flat_map(|slot| slot.iter().skip(1).filter_map(|c| *c))
            .collect()
    }

    /// Items that would reach the front row if the front row were cleared now:
    /// the first non-empty hidden cell of each slot.
    pub fn items_that_would_advance(&self) -> Vec<ItemId> {
        self.cells
            .iter()
            .filter_map(|slot| slot.iter().skip(1).find_map(|c| *c))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|slot| slot.iter().all(Option::is_none))
    }

    pub fn item_count(&self) -> usize {
        self.cells
            .iter()
            .map(|slot| slot.iter().filter(|c| c.is_some()).count())
            .sum()
    }

    /// The item type filling the whole front row, if this container can match
    /// and every front cell holds the same type.
    pub fn front_row_match(&self) -> Option<ItemId> {
        if self.slot_count < MATCH_SIZE {
            return None;
        }
        let first = self.front_item(0)?;
        (1..self.slot_count)
            .all(|s| self.front_item(s) == Some(first))
            .then_some(first)
    }

    /// Triple in any row (not only the front). Used by the constructor to find
    /// hidden triples that would auto-match after a row advance.
    pub fn row_match(&self, row: usize) -> Option<ItemId> {
        if self.slot_count < MATCH_SIZE || row >= self.max_rows {
            return None;
        }
        let first = self.get(0, row)?;
        (1..self.slot_count)
            .all(|s| self.get(s, row) == Some(first))
            .then_some(first)
    }

    fn clear_front_row(&mut self) {
        for slot in &mut self.cells {
            slot[0] = None;
        }
    }

    /// Counts one match toward unlocking. Unlocking is irreversible.
    fn record_unlock_progress(&mut self) {
        if !self.is_locked {
            return;
        }
        self.current_unlock_progress += 1;
        if self.current_unlock_progress >= self.unlock_matches_required {
            self.is_locked = false;
        }
    }

    /// Advances rows once the front row is fully empty and something is hidden.
    ///
    /// Each slot is compacted on its own: its first non-empty row becomes row 0 and
    /// everything behind it shifts forward by the same distance, keeping order.
    ///
    /// Returns `true` if any cell moved.
    pub fn check_and_advance_rows(&mut self) -> bool {
        if (0..self.slot_count).any(|s| !self.is_front_slot_empty(s)) {
            return false;
        }
        if !self.has_back_row_items() {
            return false;
        }

        for slot in &mut self.cells {
            let Some(first) = slot.iter().position(Option::is_some) else {
                continue;
            };
            if first == 0 {
                continue;
            }
            let rows = slot.len();
            for r in first..rows {
                slot[r - first] = slot[r];
                slot[r] = None;
            }
        }
        true
    }
}

/// A front-item transfer from one container slot to another.
///
/// `score` and `reason` are diagnostics filled in by the scorer; they take no part
/// in move legality or equality of effect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Move {
    pub from_container: usize,
    pub from_slot: usize,
    pub to_container: usize,
    pub to_slot: usize,
    pub item: ItemId,
    pub score: i32,
    pub reason: String,
}

impl Move {
    pub fn new(from_container: usize, from_slot: usize, to_container: usize, to_slot: usize, item: ItemId) -> Self {
        Move {
            from_container,
            from_slot,
            to_container,
            to_slot,
            item,
            score: 0,
            reason: String::new(),
        }
    }

    /// Same item travelling straight back along the edge `previous` used.
    pub fn is_reversal_of(&self, previous: &Move) -> bool {
        self.item == previous.item
            && self.from_container == previous.to_container
            && self.to_container == previous.from_container
    }

    /// `(item, from, to)` identity used by the anti-oscillation window.
    pub fn signature(&self) -> (ItemId, usize, usize) {
        (self.item, self.from_container, self.to_container)
    }

    /// Signature of the move that would undo this one.
    pub fn reverse_signature(&self) -> (ItemId, usize, usize) {
        (self.item, self.to_container, self.from_container)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Move #{} from C[{}].S[{}] to C[{}].S[{}]",
            self.item.0, self.from_container, self.from_slot, self.to_container, self.to_slot
        )
    }
}

/// Full board state during play or search.
///
/// Cloning is a deep copy of the container grids; the item catalog is shared
/// through an `Arc`, so one-ply lookahead clones stay cheap and independent.
#[derive(Clone, Debug)]
pub struct GameState {
    containers: Vec<Container>,
    move_count: u32,
    match_count: u32,
    catalog: Arc<ItemCatalog>,
}

impl PartialEq for GameState {
    fn eq(&self, other: &Self) -> bool {
        self.containers == other.containers
            && self.move_count == other.move_count
            && self.match_count == other.match_count
    }
}

impl GameState {
    pub fn new(containers: Vec<Container>, catalog: Arc<ItemCatalog>) -> Self {
        GameState {
            containers,
            move_count: 0,
            match_count: 0,
            catalog,
        }
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn container(&self, index: usize) -> &Container {
        &self.containers[index]
    }

    #[cfg(test)]
    pub(crate) fn container_mut(&mut self, index: usize) -> &mut Container {
        &mut self.containers[index]
    }

    pub fn catalog(&self) -> &Arc<ItemCatalog> {
        &self.catalog
    }

    pub fn item_name(&self, item: ItemId) -> &str {
        self.catalog.name(item)
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn match_count(&self) -> u32 {
        self.match_count
    }

    pub fn item_count(&self) -> usize {
        self.containers.iter().map(Container::item_count).sum()
    }

    /// The board is cleared: every cell of every container is empty.
    pub fn is_complete(&self) -> bool {
        self.containers.iter().all(Container::is_empty)
    }

    /// Empty front slots across unlocked containers.
    pub fn empty_front_slots(&self) -> usize {
        self.containers
            .iter()
            .filter(|c| !c.is_locked())
            .map(Container::empty_front_slot_count)
            .sum()
    }

    pub fn near_unlock_count(&self) -> usize {
        self.containers.iter().filter(|c| c.is_near_unlock()).count()
    }

    /// Executes `mv`: lifts the item from its source, drops it at the destination,
    /// bumps the move counter and lets the source advance its rows.
    ///
    /// Matches are not processed here; call [`GameState::process_all_matches`].
    pub fn execute_move(&mut self, mv: &Move) {
        self.containers[mv.from_container].set(mv.from_slot, 0, None);
        self.containers[mv.to_container].set(mv.to_slot, 0, Some(mv.item));
        self.move_count += 1;
        self.containers[mv.from_container].check_and_advance_rows();
    }

    fn process_container_match(&mut self, index: usize) -> bool {
        if self.containers[index].front_row_match().is_none() {
            return false;
        }
        self.containers[index].clear_front_row();
        self.match_count += 1;
        for container in &mut self.containers {
            container.record_unlock_progress();
        }
        self.containers[index].check_and_advance_rows();
        true
    }

    /// Clears every complete front row, repeatedly, until none remain.
    ///
    /// An advance can expose a fresh triple, so containers are rescanned until a full
    /// pass finds nothing. Returns the number of matches made.
    ///
    /// # Examples
    /// ```
    /// use sort_resort::utils::board_from_str_array;
    /// let mut state = board_from_str_array(&["AAA/BBB"]).unwrap();
    /// assert_eq!(state.process_all_matches(), 2);
    /// assert!(state.is_complete());
    /// assert_eq!(state.move_count(), 0);
    /// ```
    pub fn process_all_matches(&mut self) -> u32 {
        let mut total = 0;
        loop {
            let mut found = false;
            for index in 0..self.containers.len() {
                if self.process_container_match(index) {
                    found = true;
                    total += 1;
                }
            }
            if !found {
                break;
            }
        }
        total
    }

    /// Some container currently shows a complete front-row triple.
    pub fn would_match(&self) -> bool {
        self.containers.iter().any(|c| c.front_row_match().is_some())
    }

    /// A matchable, unlocked container shows exactly two copies of `item` in its
    /// front row plus an empty front slot for the third.
    pub fn has_waiting_pair_for(&self, item: ItemId) -> bool {
        self.containers.iter().any(|c| {
            !c.is_locked()
                && c.slot_count() >= MATCH_SIZE
                && c.front_count_of(item) == 2
                && c.empty_front_slot_count() >= 1
        })
    }

    /// Copies of `item` showing in front rows of unlocked containers.
    pub fn unlocked_front_count_of(&self, item: ItemId) -> usize {
        self.containers
            .iter()
            .filter(|c| !c.is_locked())
            .map(|c| c.front_count_of(item))
            .sum()
    }

    /// Lists every legal move.
    ///
    /// A move takes the front item of a slot in an unlocked container and drops it
    /// into an empty front slot of a different unlocked container. Two prunings keep
    /// the list small without losing anything:
    /// - among completely empty containers only the first one of each slot count is
    ///   offered as a destination;
    /// - only the first empty front slot of each destination is offered.
    ///
    /// Moves come out ordered by source container, source slot, then destination.
    pub fn enumerate_moves(&self) -> Vec<Move> {
        let mut representatives: HashMap<usize, usize> = HashMap::new();
        let mut empty_containers = vec![false; self.containers.len()];
        for (index, container) in self.containers.iter().enumerate() {
            if !container.is_locked() && container.is_empty() {
                empty_containers[index] = true;
                representatives.entry(container.slot_count()).or_insert(index);
            }
        }

        let mut moves = Vec::new();
        for (from_index, from) in self.containers.iter().enumerate() {
            if from.is_locked() {
                continue;
            }
            for from_slot in 0..from.slot_count() {
                let Some(item) = from.front_item(from_slot) else {
                    continue;
                };
                for (to_index, to) in self.containers.iter().enumerate() {
                    if to_index == from_index || to.is_locked() {
                        continue;
                    }
                    if empty_containers[to_index]
                        && representatives.get(&to.slot_count()) != Some(&to_index)
                    {
                        continue;
                    }
                    if let Some(to_slot) = to.first_empty_front_slot() {
                        moves.push(Move::new(from_index, from_slot, to_index, to_slot, item));
                    }
                }
            }
        }
        moves
    }
}

impl fmt::Display for GameState {
    /// One line per container: rows front to back separated by `|`, `.` for empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, container) in self.containers.iter().enumerate() {
            write!(f, "C[{}]", index)?;
            if container.is_locked() {
                write!(
                    f,
                    " [locked {}/{}]",
                    container.unlock_progress(),
                    container.unlock_matches_required()
                )?;
            }
            write!(f, ":")?;
            for row in 0..container.max_rows() {
                if row > 0 {
                    write!(f, " |")?;
                }
                for slot in 0..container.slot_count() {
                    match container.get(slot, row) {
                        Some(item) => write!(f, " {}", self.item_name(item))?,
                        None => write!(f, " .")?,
                    }
                }
            }
            if index + 1 < self.containers.len() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
