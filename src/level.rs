//! Serializable level record.
//!
//! Only the fields the solver and constructor read are typed. Everything else a level
//! file carries (sprites, movement, tracks, ...) is kept in `extra` maps and written
//! back untouched.
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engine::{Container, GameState, ItemCatalog, DEFAULT_MAX_ROWS, DEFAULT_SLOT_COUNT};
use crate::error::{LevelError, SolveFailure};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// One item in a container's starting layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemPlacement {
    #[serde(rename = "id")]
    pub item: String,
    pub row: i64,
    pub slot: i64,
}

impl ItemPlacement {
    pub fn new(item: impl Into<String>, row: usize, slot: usize) -> Self {
        ItemPlacement {
            item: item.into(),
            row: row as i64,
            slot: slot as i64,
        }
    }
}

fn default_slot_count() -> i64 {
    DEFAULT_SLOT_COUNT as i64
}

fn default_max_rows() -> i64 {
    DEFAULT_MAX_ROWS as i64
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerDef {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default = "default_slot_count")]
    pub slot_count: i64,
    #[serde(default = "default_max_rows")]
    pub max_rows_per_slot: i64,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub unlock_matches_required: u32,
    #[serde(default)]
    pub initial_items: Vec<ItemPlacement>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContainerDef {
    pub fn new(id: impl Into<String>, slot_count: usize, max_rows: usize) -> Self {
        ContainerDef {
            id: id.into(),
            position: None,
            slot_count: slot_count as i64,
            max_rows_per_slot: max_rows as i64,
            is_locked: false,
            unlock_matches_required: 0,
            initial_items: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn locked(mut self, unlock_matches_required: u32) -> Self {
        self.is_locked = true;
        self.unlock_matches_required = unlock_matches_required;
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    /// Slot count with non-positive values coerced to the default.
    pub fn effective_slot_count(&self) -> usize {
        usize::try_from(self.slot_count)
            .ok()
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_SLOT_COUNT)
    }

    /// Row depth with non-positive values coerced to the default.
    pub fn effective_max_rows(&self) -> usize {
        usize::try_from(self.max_rows_per_slot)
            .ok()
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_MAX_ROWS)
    }

    pub fn capacity(&self) -> usize {
        self.effective_slot_count() * self.effective_max_rows()
    }
}

/// A level as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LevelRecord {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub world_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub star_move_thresholds: Vec<u32>,
    #[serde(default)]
    pub time_limit_seconds: u32,
    #[serde(default)]
    pub containers: Vec<ContainerDef>,
    /// Move count of the reverse-play construction, when the level was built that way.
    #[serde(default, alias = "_construction_moves", skip_serializing_if = "Option::is_none")]
    pub construction_moves: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LevelRecord {
    pub fn from_json_str(text: &str) -> Result<Self, LevelError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Writes the record as compact JSON.
    pub fn save(&self, path: &Path) -> Result<(), LevelError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    pub fn item_count(&self) -> usize {
        self.containers.iter().map(|c| c.initial_items.len()).sum()
    }

    pub fn total_capacity(&self) -> usize {
        self.containers.iter().map(ContainerDef::capacity).sum()
    }

    /// Builds the playable board.
    ///
    /// Placements outside a container's grid are skipped with a warning. Two items
    /// in the same cell make the record unusable.
    ///
    /// # Examples
    /// ```
    /// use sort_resort::level::{ContainerDef, ItemPlacement, LevelRecord};
    ///
    /// let mut container = ContainerDef::new("c0", 3, 1);
    /// container.initial_items = vec![
    ///     ItemPlacement::new("apple", 0, 0),
    ///     ItemPlacement::new("apple", 0, 1),
    /// ];
    /// let level = LevelRecord { containers: vec![container], ..Default::default() };
    ///
    /// let state = level.to_game_state().unwrap();
    /// assert_eq!(state.item_count(), 2);
    /// assert_eq!(state.catalog().len(), 1);
    /// ```
    pub fn to_game_state(&self) -> Result<GameState, SolveFailure> {
        let mut catalog = ItemCatalog::new();
        let mut containers = Vec::with_capacity(self.containers.len());

        for def in &self.containers {
            let slot_count = def.effective_slot_count();
            let max_rows = def.effective_max_rows();
            let mut container = Container::new(slot_count, max_rows, def.is_locked, def.unlock_matches_required);
            let mut occupied: HashSet<(usize, usize)> = HashSet::new();

            for placement in &def.initial_items {
                let (Ok(slot), Ok(row)) = (usize::try_from(placement.slot), usize::try_from(placement.row)) else {
                    warn!("{}: skipping {} at negative slot/row", def.id, placement.item);
                    continue;
                };
                if slot >= slot_count || row >= max_rows {
                    warn!(
                        "{}: skipping {} at slot {} row {} (grid is {}x{})",
                        def.id, placement.item, slot, row, slot_count, max_rows
                    );
                    continue;
                }
                if !occupied.insert((slot, row)) {
                    return Err(SolveFailure::InitializationFailure(format!(
                        "container '{}' has two items at slot {} row {}",
                        def.id, slot, row
                    )));
                }
                container.set(slot, row, Some(catalog.intern(&placement.item)));
            }
            containers.push(container);
        }

        Ok(GameState::new(containers, Arc::new(catalog)))
    }

    /// Replaces every container's `initial_items` with the contents of `state`,
    /// slot by slot, front row first. `state` must have one container per definition.
    pub fn set_items_from_state(&mut self, state: &GameState) {
        for (def, container) in self.containers.iter_mut().zip(state.containers()) {
            def.initial_items.clear();
            for slot in 0..container.slot_count() {
                for row in 0..container.max_rows() {
                    if let Some(item) = container.get(slot, row) {
                        def.initial_items.push(ItemPlacement::new(state.item_name(item), row, slot));
                    }
                }
            }
        }
    }

    /// Move limit hint: the construction move count when known.
    pub fn move_limit_hint(&self) -> Option<u32> {
        self.construction_moves.filter(|&m| m > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVEL_JSON: &str = r#"{
        "id": 7,
        "world_id": "island",
        "name": "level_007",
        "star_move_thresholds": [4, 5, 6, 7],
        "time_limit_seconds": 30,
        "containers": [
            {
                "id": "c0",
                "position": {"x": 200.0, "y": 400.0},
                "container_image": "island_container",
                "slot_count": 3,
                "max_rows_per_slot": 2,
                "is_locked": false,
                "unlock_matches_required": 0,
                "move_speed": 50.0,
                "initial_items": [
                    {"id": "shell", "row": 0, "slot": 0},
                    {"id": "shell", "row": 0, "slot": 1},
                    {"id": "crab", "row": 1, "slot": 2}
                ]
            },
            {
                "id": "c1",
                "position": {"x": 540.0, "y": 400.0},
                "slot_count": 3,
                "max_rows_per_slot": 1,
                "is_locked": true,
                "unlock_matches_required": 1,
                "initial_items": [{"id": "shell", "row": 0, "slot": 0}]
            }
        ],
        "moving_tracks": [],
        "construction_moves": 3
    }"#;

    #[test]
    fn round_trip_keeps_unknown_fields() {
        let level = LevelRecord::from_json_str(LEVEL_JSON).unwrap();
        assert_eq!(level.containers[0].extra["container_image"], "island_container");
        assert!(level.extra.contains_key("moving_tracks"));

        let written: Value = serde_json::to_value(&level).unwrap();
        let original: Value = serde_json::from_str(LEVEL_JSON).unwrap();
        assert_eq!(written, original);
    }

    #[test]
    fn builds_game_state() {
        let level = LevelRecord::from_json_str(LEVEL_JSON).unwrap();
        let state = level.to_game_state().unwrap();
        assert_eq!(state.containers().len(), 2);
        assert_eq!(state.item_count(), 4);
        assert_eq!(level.item_count(), 4);
        assert_eq!(level.total_capacity(), 9);
        assert!(state.container(1).is_locked());
        let crab = state.catalog().get("crab").unwrap();
        assert_eq!(state.container(0).get(2, 1), Some(crab));
        assert_eq!(level.move_limit_hint(), Some(3));
    }

    #[test]
    fn legacy_construction_moves_key() {
        let level = LevelRecord::from_json_str(r#"{"containers": [], "_construction_moves": 12}"#).unwrap();
        assert_eq!(level.construction_moves, Some(12));
    }

    #[test]
    fn coerces_bad_dimensions_and_skips_out_of_range() {
        let level = LevelRecord::from_json_str(
            r#"{"containers": [{"id": "c", "slot_count": 0, "max_rows_per_slot": -1,
                "initial_items": [{"id": "a", "row": 9, "slot": 0}, {"id": "a", "row": 0, "slot": -1},
                                  {"id": "b", "row": 3, "slot": 2}]}]}"#,
        )
        .unwrap();
        let state = level.to_game_state().unwrap();
        let c = state.container(0);
        assert_eq!((c.slot_count(), c.max_rows()), (DEFAULT_SLOT_COUNT, DEFAULT_MAX_ROWS));
        assert_eq!(state.item_count(), 1);
    }

    #[test]
    fn overlapping_items_fail_initialization() {
        let mut container = ContainerDef::new("dup", 3, 1);
        container.initial_items = vec![ItemPlacement::new("a", 0, 0), ItemPlacement::new("b", 0, 0)];
        let level = LevelRecord {
            containers: vec![container],
            ..Default::default()
        };
        match level.to_game_state() {
            Err(SolveFailure::InitializationFailure(msg)) => assert!(msg.contains("dup")),
            other => panic!("expected initialization failure, got {:?}", other),
        }
    }

    #[test]
    fn writes_state_back_slot_major() {
        let mut level = LevelRecord::from_json_str(LEVEL_JSON).unwrap();
        let mut state = level.to_game_state().unwrap();
        state.process_all_matches();
        level.set_items_from_state(&state);

        let items: Vec<(String, i64, i64)> = level.containers[0]
            .initial_items
            .iter()
            .map(|p| (p.item.clone(), p.row, p.slot))
            .collect();
        assert_eq!(
            items,
            vec![
                ("shell".to_string(), 0, 0),
                ("shell".to_string(), 0, 1),
                ("crab".to_string(), 1, 2)
            ]
        );
    }

    #[test]
    fn save_and_load() {
        let dir = std::env::temp_dir().join(format!("sort_resort_level_{}", std::process::id()));
        let path = dir.join("level_007.json");
        let level = LevelRecord::from_json_str(LEVEL_JSON).unwrap();
        level.save(&path).unwrap();
        assert_eq!(LevelRecord::load(&path).unwrap(), level);
        fs::remove_dir_all(&dir).unwrap();
    }
}
