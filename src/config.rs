//! Tunable parameters for the solver, ensemble, constructor and generator.
//!
//! Every section deserializes with `serde(default)`, so a settings file only needs
//! the keys it changes. Out-of-range values are pulled back into range by
//! [`Settings::sanitized`] rather than rejected.
use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::LevelError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SolverConfig {
    /// Hard cap on forward moves for one solve.
    pub move_limit: u32,
    /// Size of the recent-move window used by the pattern penalty.
    pub pattern_window: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            move_limit: 500,
            pattern_window: 10,
        }
    }
}

impl SolverConfig {
    /// Copy with the move limit replaced, falling back to the configured limit when
    /// `limit` is zero.
    pub fn with_move_limit(self, limit: u32) -> Self {
        Self {
            move_limit: if limit == 0 { self.move_limit } else { limit },
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Noisy restarts after each strategy's clean run. Restart `k` uses seed `k`.
    pub noise_runs_per_strategy: u32,
    pub noise_magnitude: i32,
    /// Fan runs out over the rayon pool instead of running them in order.
    pub parallel: bool,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            noise_runs_per_strategy: 3,
            noise_magnitude: 8,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConstructorConfig {
    /// Empty front slots the playability pass keeps on unlocked containers.
    pub min_empty_front: usize,
    /// Chance of hosting a triple in a container whose front row must be pushed.
    pub push_preference: f64,
    /// A variance move follows every this many placed triples (0 disables).
    pub variance_interval: usize,
    /// Screen y of the HUD bar's lower edge. Containers whose top edge is above it
    /// are off-screen at game start.
    pub hud_bar_bottom_y: f64,
    /// Height of a one-row container, in screen units.
    pub container_base_height: f64,
    /// Extra height per additional row.
    pub row_height: f64,
    /// Iteration cap of the starting-triple repair pass.
    pub repair_iterations: usize,
}

impl Default for ConstructorConfig {
    fn default() -> Self {
        Self {
            min_empty_front: 3,
            push_preference: 0.7,
            variance_interval: 3,
            hud_bar_bottom_y: 140.0,
            container_base_height: 150.0,
            row_height: 40.0,
            repair_iterations: 50,
        }
    }
}

impl ConstructorConfig {
    /// Half the on-screen height of a container with `max_rows` rows.
    pub fn container_half_height(&self, max_rows: usize) -> f64 {
        let extra_rows = max_rows.saturating_sub(1) as f64;
        (self.container_base_height + extra_rows * self.row_height) / 2.0
    }

    /// A container centred at `y` starts above the HUD bar.
    pub fn is_off_screen(&self, y: f64, max_rows: usize) -> bool {
        y - self.container_half_height(max_rows) < self.hud_bar_bottom_y
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Construct-and-verify attempts per level before giving up.
    pub max_attempts: u32,
    /// Seed offset added per retry: attempt `n` reseeds with `n * stride`.
    pub seed_offset_stride: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            seed_offset_stride: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub solver: SolverConfig,
    pub ensemble: EnsembleConfig,
    pub constructor: ConstructorConfig,
    pub generator: GeneratorConfig,
}

impl Settings {
    pub fn sanitized(mut self) -> Self {
        if self.solver.move_limit == 0 {
            self.solver.move_limit = SolverConfig::default().move_limit;
        }
        self.solver.pattern_window = self.solver.pattern_window.max(1);
        self.ensemble.noise_magnitude = self.ensemble.noise_magnitude.max(0);
        self.constructor.push_preference = self.constructor.push_preference.clamp(0.0, 1.0);
        self.constructor.repair_iterations = self.constructor.repair_iterations.max(1);
        self.generator.max_attempts = self.generator.max_attempts.max(1);
        self
    }

    /// Reads settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let text = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&text)?;
        Ok(settings.sanitized())
    }

    /// Like [`Settings::load`], but any problem yields the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                warn!("Using default settings ({}): {}", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), LevelError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
