//! Level generation: difficulty curves, item selection, reverse-play construction,
//! ensemble verification and star thresholds.
//!
//! The container layout of a level (positions, locks, depths) comes in as a template
//! [`LevelRecord`]; this module only decides which items go where.
use std::collections::BTreeMap;

use log::{info, warn};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::constructor::construct;
use crate::engine::MATCH_SIZE;
use crate::ensemble::solve_level_best;
use crate::error::GenerateError;
use crate::level::{ItemPlacement, LevelRecord};

/// Target share of the layout's cells to fill at `level`.
pub fn fill_ratio(level: u32) -> f64 {
    match level {
        0..=1 => 0.55,
        2..=5 => 0.80,
        6..=15 => 0.80 + f64::from(level - 5) * 0.01,
        16..=25 => 0.90 + f64::from(level - 15) * 0.005,
        _ => 0.95,
    }
}

/// Minimum number of distinct item types at `level`.
pub fn target_types(level: u32) -> usize {
    let t = f64::from(level.saturating_sub(1)) / 99.0;
    ((2.0 + 23.0 * t.powf(0.7)).round_ties_even() as usize).max(2)
}

/// Time limit: two seconds per item at level 1 down to half a second at level 100,
/// never under ten seconds.
pub fn timer_seconds(level: u32, items: usize) -> u32 {
    let per_item = 2.0 - f64::from(level.saturating_sub(1)) * (1.5 / 99.0);
    ((items as f64 * per_item).round_ties_even() as u32).max(10)
}

/// Three-star, two-star, one-star and fail thresholds for an optimal move count.
///
/// # Examples
/// ```
/// use sort_resort::generator::star_thresholds;
/// assert_eq!(star_thresholds(40), [40, 46, 52, 56]);
/// assert_eq!(star_thresholds(0), [2, 3, 4, 5]);
/// ```
pub fn star_thresholds(optimal: u32) -> [u32; 4] {
    let o = optimal.max(2);
    let scaled = |f: f64| (f64::from(o) * f).round_ties_even() as u32;
    let three = o;
    let two = (three + 1).max(scaled(1.15));
    let one = (two + 1).max(scaled(1.30));
    let fail = (one + 1).max(scaled(1.40));
    [three, two, one, fail]
}

/// Items of one world, unlocked progressively.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemPool {
    #[serde(default)]
    pub world_id: String,
    /// `(unlock_level, items)` groups.
    pub item_groups: Vec<(u32, Vec<String>)>,
}

impl ItemPool {
    /// Items unlocked at or before `level`, in declaration order.
    pub fn available(&self, level: u32) -> Vec<String> {
        self.item_groups
            .iter()
            .filter(|(unlock, _)| level >= *unlock)
            .flat_map(|(_, items)| items.iter().cloned())
            .collect()
    }

    pub fn all_items(&self) -> Vec<String> {
        self.item_groups
            .iter()
            .flat_map(|(_, items)| items.iter().cloned())
            .collect()
    }
}

/// How often each item has been picked across a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageLedger {
    counts: BTreeMap<String, u32>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, item: &str) -> u32 {
        self.counts.get(item).copied().unwrap_or(0)
    }

    /// Picks `n` items from `available`, least used first (random among equals),
    /// and records the picks.
    pub fn select<R: Rng + ?Sized>(&mut self, rng: &mut R, available: &[String], n: usize) -> Vec<String> {
        let mut shuffled = available.to_vec();
        shuffled.shuffle(rng);
        shuffled.sort_by_key(|item| self.count(item));
        shuffled.truncate(n);
        for item in &shuffled {
            *self.counts.entry(item.clone()).or_insert(0) += 1;
        }
        shuffled
    }

    /// Items of `pool` that were never picked.
    pub fn unused(&self, pool: &ItemPool) -> Vec<String> {
        pool.all_items()
            .into_iter()
            .filter(|item| self.count(item) == 0)
            .collect()
    }
}

/// A generated level plus what is known about its quality.
#[derive(Debug, Clone)]
pub struct GeneratedLevel {
    pub record: LevelRecord,
    /// Construct-and-verify attempts used, starting at 1.
    pub attempts: u32,
    /// The ensemble solved the emitted board.
    pub verified: bool,
    pub solver_moves: Option<u32>,
    pub strategy: Option<String>,
    pub diagnostics: Vec<GenerateError>,
}

fn level_seed(base_seed: u64, level: u32, offset: u64) -> u64 {
    base_seed
        .wrapping_add(u64::from(level) * 42 + 7)
        .wrapping_add(offset)
}

fn blank_record(level: u32, template: &LevelRecord, pool: &ItemPool) -> LevelRecord {
    let mut record = template.clone();
    record.id = level;
    record.world_id = pool.world_id.clone();
    record.name = Some(format!("level_{:03}", level));
    record.construction_moves = None;
    for container in &mut record.containers {
        container.initial_items.clear();
    }
    record
}

fn tutorial(level: u32, template: &LevelRecord, pool: &ItemPool, ledger: &mut UsageLedger, rng: &mut SmallRng) -> Result<LevelRecord, GenerateError> {
    if template.containers.len() < 3 || template.containers.iter().take(3).any(|c| c.effective_slot_count() < 2) {
        return Err(GenerateError::InvalidLayout(
            "tutorial needs three containers with at least two slots".to_string(),
        ));
    }
    let picked = ledger.select(rng, &pool.available(level), 2);
    let [a, b] = picked.as_slice() else {
        return Err(GenerateError::InvalidLayout(format!(
            "tutorial needs 2 items, pool has {}",
            picked.len()
        )));
    };

    let mut record = blank_record(level, template, pool);
    record.containers[0].initial_items = vec![ItemPlacement::new(a.clone(), 0, 0), ItemPlacement::new(a.clone(), 0, 1)];
    record.containers[1].initial_items = vec![ItemPlacement::new(b.clone(), 0, 0), ItemPlacement::new(b.clone(), 0, 1)];
    record.containers[2].initial_items = vec![ItemPlacement::new(a.clone(), 0, 0), ItemPlacement::new(b.clone(), 0, 1)];
    record.star_move_thresholds = vec![2, 3, 4, 5];
    record.time_limit_seconds = timer_seconds(level, 6);
    Ok(record)
}

/// Builds one unverified level. Level 1 is the fixed two-move tutorial.
///
/// Returns the record and any construction diagnostic.
pub fn generate_level(
    level: u32,
    template: &LevelRecord,
    pool: &ItemPool,
    ledger: &mut UsageLedger,
    settings: &Settings,
    seed: u64,
) -> Result<(LevelRecord, Option<GenerateError>), GenerateError> {
    let mut rng = SmallRng::seed_from_u64(seed);
    if level <= 1 {
        return tutorial(level, template, pool, ledger, &mut rng).map(|record| (record, None));
    }

    if !template.containers.iter().any(|c| c.effective_slot_count() >= MATCH_SIZE) {
        return Err(GenerateError::InvalidLayout("no container can host a triple".to_string()));
    }
    let available = pool.available(level);
    if available.len() < 2 {
        return Err(GenerateError::InvalidLayout(format!(
            "{} item(s) available at level {}",
            available.len(),
            level
        )));
    }

    let capacity = template.total_capacity();
    let max_placeable = capacity / MATCH_SIZE;
    let target_triples = ((capacity as f64 * fill_ratio(level) / 3.0).ceil() as usize).max(2);
    let unique = target_triples
        .max(target_types(level))
        .min(max_placeable)
        .min(available.len())
        .max(2);

    let mut selected = ledger.select(&mut rng, &available, unique);
    let total_triples = target_triples.min(max_placeable);
    let mut duplicates: Vec<String> = (selected.len()..total_triples)
        .filter_map(|_| selected.choose(&mut rng).cloned())
        .collect();
    duplicates.shuffle(&mut rng);
    selected.shuffle(&mut rng);

    // Duplicates first: they end up buried under the unique types.
    let mut order = duplicates;
    order.extend(selected);

    let built = construct(&template.containers, &order, &settings.constructor, &mut rng);
    let mut record = blank_record(level, template, pool);
    built.apply_to(&mut record);
    record.time_limit_seconds = timer_seconds(level, record.item_count());
    record.star_move_thresholds = star_thresholds(built.construction_moves).to_vec();

    Ok((record, built.diagnostic()))
}

/// Generates a level and verifies it with the ensemble solver, re-seeding up to
/// `settings.generator.max_attempts` times.
///
/// On success the star thresholds come from the ensemble's move count. When every
/// attempt fails the last board is still returned, flagged with
/// [`GenerateError::VerificationFailed`]. Item picks of failed attempts are rolled
/// back in `ledger`.
pub fn generate_verified(
    level: u32,
    template: &LevelRecord,
    pool: &ItemPool,
    ledger: &mut UsageLedger,
    settings: &Settings,
    base_seed: u64,
) -> Result<GeneratedLevel, GenerateError> {
    let max_attempts = settings.generator.max_attempts.max(1);
    let mut last = None;

    for attempt in 0..max_attempts {
        let saved = ledger.clone();
        let offset = u64::from(attempt) * settings.generator.seed_offset_stride;
        let (mut record, construction) =
            generate_level(level, template, pool, ledger, settings, level_seed(base_seed, level, offset))?;

        let best = solve_level_best(&record, &settings.solver, &settings.ensemble);
        if best.result.success {
            if level > 1 {
                record.star_move_thresholds = star_thresholds(best.result.total_moves).to_vec();
            }
            let mut diagnostics: Vec<GenerateError> = construction.into_iter().collect();
            diagnostics.extend(validate(&record));
            return Ok(GeneratedLevel {
                record,
                attempts: attempt + 1,
                verified: true,
                solver_moves: Some(best.result.total_moves),
                strategy: Some(best.strategy),
                diagnostics,
            });
        }

        warn!(
            "L{} attempt {}: {}",
            level,
            attempt + 1,
            best.result.failure_reason().unwrap_or_default()
        );
        *ledger = saved;
        last = Some((record, construction));
    }

    let Some((record, construction)) = last else {
        return Err(GenerateError::VerificationFailed { attempts: 0 });
    };
    let mut diagnostics: Vec<GenerateError> = construction.into_iter().collect();
    diagnostics.push(GenerateError::VerificationFailed { attempts: max_attempts });
    diagnostics.extend(validate(&record));
    Ok(GeneratedLevel {
        record,
        attempts: max_attempts,
        verified: false,
        solver_moves: None,
        strategy: None,
        diagnostics,
    })
}

/// Structural checks on a finished record: item count, starting triples in any row,
/// empty containers.
pub fn validate(record: &LevelRecord) -> Vec<GenerateError> {
    let mut problems = Vec::new();

    let items = record.item_count();
    if items % MATCH_SIZE != 0 {
        problems.push(GenerateError::ItemCountNotMultipleOfThree { items });
    }

    for container in &record.containers {
        let slots = container.effective_slot_count();
        if slots < MATCH_SIZE {
            continue;
        }
        for row in 0..container.effective_max_rows() {
            let mut cells: Vec<Option<&str>> = vec![None; slots];
            for placement in container.initial_items.iter().filter(|p| p.row == row as i64) {
                if let Some(cell) = usize::try_from(placement.slot).ok().and_then(|s| cells.get_mut(s)) {
                    *cell = Some(placement.item.as_str());
                }
            }
            let first = cells[0];
            if first.is_some() && cells.iter().all(|&c| c == first) {
                problems.push(GenerateError::PreMatchedRow {
                    container: container.id.clone(),
                    row,
                });
            }
        }
    }

    let empty = record
        .containers
        .iter()
        .filter(|c| c.initial_items.is_empty())
        .count();
    if empty > 0 {
        problems.push(GenerateError::EmptyContainers { count: empty });
    }
    problems
}

/// Result of generating a run of levels on one layout.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub levels: Vec<GeneratedLevel>,
    /// Levels that could not be built at all, with the reason.
    pub skipped: Vec<(u32, GenerateError)>,
    /// Pool items no level picked.
    pub unused: Vec<String>,
}

impl BatchReport {
    /// Every per-level problem, skipped levels included.
    pub fn diagnostics(&self) -> impl Iterator<Item = (u32, &GenerateError)> {
        self.levels
            .iter()
            .flat_map(|l| l.diagnostics.iter().map(move |d| (l.record.id, d)))
            .chain(self.skipped.iter().map(|(level, err)| (*level, err)))
    }

    /// [`GenerateError::UnusedItems`] when part of the pool never appeared.
    pub fn unused_diagnostic(&self) -> Option<GenerateError> {
        (!self.unused.is_empty()).then(|| GenerateError::UnusedItems(self.unused.clone()))
    }
}

/// Generates `count` consecutive levels starting at `first_level`, sharing one usage
/// ledger so item types rotate across the batch.
///
/// A level that fails verification or cannot be built is reported and the batch
/// moves on. `Err` is returned only when no level of the batch could be built,
/// carrying the first level's error.
pub fn generate_batch(
    first_level: u32,
    count: u32,
    template: &LevelRecord,
    pool: &ItemPool,
    settings: &Settings,
    base_seed: u64,
) -> Result<BatchReport, GenerateError> {
    let mut ledger = UsageLedger::new();
    let mut levels = Vec::with_capacity(count as usize);
    let mut skipped = Vec::new();

    for level in first_level..first_level.saturating_add(count) {
        let generated = match generate_verified(level, template, pool, &mut ledger, settings, base_seed) {
            Ok(generated) => generated,
            Err(err) => {
                warn!("L{}: skipped: {}", level, err);
                skipped.push((level, err));
                continue;
            }
        };
        info!(
            "L{:3}: {:2}c, {:3}i, thresh={:?}, timer={}s, {}{}",
            level,
            generated.record.containers.len(),
            generated.record.item_count(),
            generated.record.star_move_thresholds,
            generated.record.time_limit_seconds,
            generated
                .solver_moves
                .map_or_else(|| "UNSOLVED".to_string(), |m| format!("solver={}m", m)),
            if generated.attempts > 1 {
                format!(" (attempt {})", generated.attempts)
            } else {
                String::new()
            }
        );
        levels.push(generated);
    }

    if levels.is_empty() {
        if let Some((_, err)) = skipped.first().cloned() {
            return Err(err);
        }
    }

    let unused = ledger.unused(pool);
    Ok(BatchReport { levels, skipped, unused })
}
