//! The stagger-step engine: lifecycle lists, half-step passes, reclamation,
//! reversible stepping and the public mutate/query/run contract.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, error, trace, warn};

use super::arena::TileArena;
use super::kernel::{self, Hood};
use super::lifecycle::Reclaim;
use super::pacing::Pacer;
use super::quiescence::{Quadrant, Quiescence};
use super::rules::RuleTable;
use super::table::{Sweep, TransitionTables};
use super::tile::{
    Direction, Lifecycle, Phase, TILE_SIZE, Tile, TileFlags, TileId, Words, cell_bit,
    for_each_cell,
};
use crate::error::LifeError;

const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_SWEEP_INTERVAL: u64 = 128;

/// Cells per axis of the universe torus.
const SPAN: i32 = 1 << 20;
const HALF_SPAN: i32 = SPAN / 2;

/// Folds a cell coordinate into `[-2^19, 2^19)`.
#[inline]
fn wrap_cell(v: i32) -> i32 {
    ((v + HALF_SPAN) & (SPAN - 1)) - HALF_SPAN
}

/// Global cell coordinate of local `(0, 0)` of a tile in `phase`.
#[inline]
fn cell_origin(coord: (i16, i16), phase: Phase) -> (i32, i32) {
    let off = phase.offset();
    (
        coord.0 as i32 * TILE_SIZE + off,
        coord.1 as i32 * TILE_SIZE + off,
    )
}

/// Tile coordinate and local cell of `(x, y)` in the `phase` tiling.
#[inline]
fn locate(phase: Phase, x: i32, y: i32) -> ((i16, i16), usize, usize) {
    let off = phase.offset();
    let (x, y) = (x.wrapping_sub(off), y.wrapping_sub(off));
    (
        ((x >> 4) as i16, (y >> 4) as i16),
        (x & 15) as usize,
        (y & 15) as usize,
    )
}

// ── Configuration ───────────────────────────────────────────────────────

/// Configuration for a [`LifeEngine`].
///
/// `LifeConfig::default()` gives Conway's rule, 100 ms frames with adaptive
/// skipping, no tile budget and a 128-generation reclamation sweep.
#[derive(Clone, Debug, Default)]
pub struct LifeConfig {
    /// Rule string; `None` means `23/3`.
    pub rule: Option<String>,
    /// Target wall time per displayed frame.
    pub frame_interval: Option<Duration>,
    /// Generations per frame. `0` adapts to the measured display cost.
    pub skip: Option<u64>,
    /// Upper bound on allocated tiles. `None` means only the allocator limits.
    pub max_tiles: Option<usize>,
    /// Generations between morgue sweeps, rounded up to a power of two.
    pub sweep_interval: Option<u64>,
}

impl LifeConfig {
    pub fn rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    pub fn skip(mut self, generations: u64) -> Self {
        self.skip = Some(generations);
        self
    }

    pub fn max_tiles(mut self, n: usize) -> Self {
        self.max_tiles = Some(n.max(1));
        self
    }

    pub fn sweep_interval(mut self, generations: u64) -> Self {
        self.sweep_interval = Some(generations.max(1).next_power_of_two());
        self
    }

    /// Defaults overlaid with `STAGGERLIFE_RULE`, `STAGGERLIFE_MAX_TILES` and
    /// `STAGGERLIFE_SKIP`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    fn overlay(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            var(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        if let Some(rule) = get("STAGGERLIFE_RULE") {
            self = self.rule(rule);
        }
        if let Some(n) = get("STAGGERLIFE_MAX_TILES").and_then(|v| v.parse().ok()) {
            self = self.max_tiles(n);
        }
        if let Some(n) = get("STAGGERLIFE_SKIP").and_then(|v| v.parse().ok()) {
            self = self.skip(n);
        }
        self
    }
}

// ── Public helper types ─────────────────────────────────────────────────

/// Why [`LifeEngine::step`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// A frame is due; call again with `resuming = true` to continue.
    PitStop,
    /// The requested number of generations has been computed.
    Finished,
    /// A stop was requested through the [`StopSignal`].
    Stopped,
}

/// Cooperative cancellation, checked once per generation.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Visible cell rectangle, in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    /// Whether any cell the tile covers, in either phase, is visible. The
    /// view may straddle the seam of the torus.
    pub fn overlaps_tile(&self, coord: (i16, i16)) -> bool {
        // Both tilings together span 17 cells per axis.
        let span = TILE_SIZE as i64 + 1;
        overlaps_on_torus(coord.0 as i64 * TILE_SIZE as i64, span, self.x, self.width)
            && overlaps_on_torus(coord.1 as i64 * TILE_SIZE as i64, span, self.y, self.height)
    }
}

/// Overlap of `[start, start + len)` with `[view, view + width)`, both taken
/// modulo the torus span.
fn overlaps_on_torus(start: i64, len: i64, view: i32, width: i32) -> bool {
    let span = SPAN as i64;
    let width = (width as i64).clamp(0, span);
    if width == 0 {
        return false;
    }
    (start - view as i64).rem_euclid(span) < width || (view as i64 - start).rem_euclid(span) < len
}

/// Read-only view of a tile on the display list.
#[derive(Clone, Copy)]
pub struct TileView<'a> {
    tile: &'a Tile,
}

impl<'a> TileView<'a> {
    #[inline]
    pub fn coord(&self) -> (i16, i16) {
        self.tile.coord
    }

    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        self.tile.lifecycle
    }

    #[inline]
    pub fn words(&self, phase: Phase) -> &'a Words {
        self.tile.words(phase)
    }

    /// Cell coordinate of local `(0, 0)` in `phase`.
    pub fn origin(&self, phase: Phase) -> (i32, i32) {
        cell_origin(self.tile.coord, phase)
    }

    pub fn cell(&self, phase: Phase, x: usize, y: usize) -> bool {
        let (index, mask) = cell_bit(x, y);
        self.tile.words(phase)[index] & mask != 0
    }

    pub fn for_each_live(&self, phase: Phase, mut f: impl FnMut(i32, i32)) {
        let (ox, oy) = self.origin(phase);
        for_each_cell(self.tile.words(phase), |x, y| {
            f(wrap_cell(ox + x as i32), wrap_cell(oy + y as i32))
        });
    }
}

/// Sizes of the tile lists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileCounts {
    pub living: usize,
    pub hibernating: usize,
    pub morgue: usize,
    pub displayed: usize,
    pub allocated: usize,
}

// ── Engine ──────────────────────────────────────────────────────────────

pub struct LifeEngine {
    arena: TileArena,
    rule: RuleTable,
    tables: TransitionTables,
    phase: Phase,
    generation: u64,
    /// The other phase still holds the previous generation, untouched.
    reversible: bool,
    pacer: Pacer,
    countdown: u64,
    sweep_interval: u64,
    stop: StopSignal,
}

impl Default for LifeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LifeEngine {
    pub fn new() -> Self {
        Self::from_parts(RuleTable::conway(), &LifeConfig::default())
    }

    /// Create an engine with explicit configuration. Fails only on a bad rule.
    pub fn with_config(config: LifeConfig) -> Result<Self, LifeError> {
        let rule = match config.rule.as_deref() {
            Some(text) => RuleTable::parse(text)?,
            None => RuleTable::conway(),
        };
        Ok(Self::from_parts(rule, &config))
    }

    fn from_parts(rule: RuleTable, config: &LifeConfig) -> Self {
        let tables = TransitionTables::build(&rule);
        Self {
            arena: TileArena::new(config.max_tiles),
            rule,
            tables,
            phase: Phase::P,
            generation: 0,
            reversible: false,
            pacer: Pacer::new(
                config.frame_interval.unwrap_or(DEFAULT_FRAME_INTERVAL),
                config.skip.unwrap_or(0),
            ),
            countdown: 0,
            sweep_interval: config
                .sweep_interval
                .unwrap_or(DEFAULT_SWEEP_INTERVAL)
                .max(1),
            stop: StopSignal::default(),
        }
    }

    // ── Rule and pacing ─────────────────────────────────────────────────

    /// Compiles `text` and rebuilds the transition tables. On error the
    /// current rule stays in force.
    pub fn set_rule(&mut self, text: &str) -> Result<(), LifeError> {
        let rule = RuleTable::parse(text)?;
        self.tables = TransitionTables::build(&rule);
        self.rule = rule;
        // Quiescence recorded under the old rule means nothing now.
        self.arena.rattle_all();
        self.reversible = false;
        debug!("rule set to {}", self.rule);
        Ok(())
    }

    /// Canonical form of the current rule.
    pub fn rule(&self) -> String {
        self.rule.canonical()
    }

    pub fn set_pacing(&mut self, frame_interval: Duration, skip: u64) {
        self.pacer.set(frame_interval, skip);
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    // ── Cells ───────────────────────────────────────────────────────────

    /// Sets one cell of the current generation, allocating its tile if
    /// needed and waking every tile that reads it.
    pub fn set_cell(&mut self, x: i32, y: i32, alive: bool) -> Result<(), LifeError> {
        let phase = self.phase;
        let (coord, lx, ly) = locate(phase, x, y);
        let id = match self.arena.id_at(coord) {
            Some(id) => {
                self.arena.rattle(id);
                id
            }
            None if alive => self.allocate(coord)?,
            None => return Ok(()),
        };
        self.reversible = false;

        // The next sweep borrows two rows and columns of this phase: the
        // west/north edges of `p`, the east/south edges of `q`.
        let (edge_x, edge_y) = match phase {
            Phase::P => (lx < 2, ly < 2),
            Phase::Q => (lx >= 14, ly >= 14),
        };
        let [horizontal, vertical, diagonal] = Sweep::from_phase(phase.flip()).borrowed();
        if edge_x {
            self.rouse(id, horizontal)?;
        }
        if edge_y {
            self.rouse(id, vertical)?;
        }
        if edge_x && edge_y {
            self.rouse(id, diagonal)?;
        }

        let (index, mask) = cell_bit(lx, ly);
        let tile = self.arena.tile_mut(id);
        let words = tile.words_mut(phase);
        if (words[index] & mask != 0) == alive {
            return Ok(());
        }
        words[index] ^= mask;
        *tile.state_mut(phase) = Quiescence::NONE;

        for dir in Sweep::from_phase(phase).borrowed() {
            let Some(neighbor) = self.arena.tile(id).neighbor(dir) else {
                continue;
            };
            let (dx, dy) = dir.offset();
            let state = self.arena.tile_mut(neighbor).state_mut(phase);
            for quadrant in Quadrant::ALL {
                let (qx, qy) = quadrant.grid();
                let faces_x = dx == 0 || qx == (dx < 0) as usize;
                let faces_y = dy == 0 || qy == (dy < 0) as usize;
                if faces_x && faces_y {
                    state.unsettle_quadrant(quadrant);
                }
            }
        }
        Ok(())
    }

    /// Reads one cell of the current generation. Never allocates.
    pub fn get_cell(&self, x: i32, y: i32) -> bool {
        let (coord, lx, ly) = locate(self.phase, x, y);
        self.arena.id_at(coord).is_some_and(|id| {
            let (index, mask) = cell_bit(lx, ly);
            self.arena.tile(id).words(self.phase)[index] & mask != 0
        })
    }

    // ── Stepping ────────────────────────────────────────────────────────

    /// Runs up to `n` generations (`0` runs until stopped), pausing when the
    /// pacer says a frame is due. Pass `resuming = true` to continue a run
    /// after a pit stop.
    pub fn step(&mut self, n: u64, resuming: bool) -> Result<StepOutcome, LifeError> {
        if !resuming {
            self.countdown = n;
            self.pacer.begin_run(self.generation);
            self.stop.reset();
        }
        self.pacer.mark_time(Instant::now(), resuming);

        while !self.stop.is_requested() {
            self.tick()?;
            if n != 0 {
                self.countdown = self.countdown.saturating_sub(1);
                if self.countdown == 0 {
                    return Ok(StepOutcome::Finished);
                }
            }
            if self.pacer.frame_due(self.generation) {
                return Ok(StepOutcome::PitStop);
            }
        }
        Ok(StepOutcome::Stopped)
    }

    /// Advances exactly `n` generations without pacing.
    pub fn step_n(&mut self, n: u64) -> Result<(), LifeError> {
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }

    /// Returns to the previous generation, which the other phase still
    /// holds. Only one step back is possible, and not after a mutation.
    pub fn step_back(&mut self) -> Result<(), LifeError> {
        if !self.reversible {
            return Err(LifeError::InvalidStepBack);
        }
        self.phase = self.phase.flip();
        self.generation -= 1;
        self.arena.rattle_all();
        self.reversible = false;
        debug!("stepped back to generation {}", self.generation);
        Ok(())
    }

    fn tick(&mut self) -> Result<(), LifeError> {
        if self.generation % self.sweep_interval == 0 {
            self.arena.reclaim(Reclaim::Aged);
            trace!(
                "generation {}: {:?}",
                self.generation,
                self.tile_counts()
            );
        }
        let sweep = Sweep::from_phase(self.phase);
        if let Err(err) = self.advance(sweep) {
            self.abandon();
            error!(
                "generation {} abandoned, staying at {}: {err}",
                self.generation + 1,
                self.generation
            );
            return Err(err);
        }
        self.phase = self.phase.flip();
        self.generation += 1;
        self.reversible = true;
        Ok(())
    }

    /// Forgets a half-finished pass. The source phase was never written, so
    /// the current generation is intact; only cached quiescence is suspect.
    fn abandon(&mut self) {
        self.arena.rattle_all();
        self.reversible = false;
    }

    fn advance(&mut self, sweep: Sweep) -> Result<(), LifeError> {
        // Tiles woken during the pass go to the head of living, behind the
        // cursor, and wait for the next pass.
        let mut cursor = self.arena.living.head();
        while let Some(id) = cursor {
            cursor = self.arena.living.next(&self.arena.tiles, id);
            self.sweep_tile(id, sweep)?;
        }
        Ok(())
    }

    fn sweep_tile(&mut self, id: TileId, sweep: Sweep) -> Result<(), LifeError> {
        let hood = Hood::gather(&self.arena, id, sweep);
        let target = sweep.target();
        let (quiet, dead) = match sweep {
            Sweep::Forward => (TileFlags::P_QUIET, TileFlags::P_DEAD),
            Sweep::Backward => (TileFlags::Q_QUIET, TileFlags::Q_DEAD),
        };

        if hood.tile_settled(sweep, false) {
            let tile = self.arena.tile_mut(id);
            if hood.tile_settled(sweep, true) {
                tile.flags.insert(quiet | dead);
                *tile.state_mut(target) = Quiescence::ALL;
                let held = tile.flags & (TileFlags::PHASES | TileFlags::RATTLED);
                if held == TileFlags::PHASES {
                    self.arena.kill(id);
                }
            } else {
                tile.flags.insert(quiet);
                tile.state_mut(target).hibernate_all();
                let both = TileFlags::P_QUIET | TileFlags::Q_QUIET;
                if tile.flags & (both | TileFlags::RATTLED) == both {
                    self.arena.tranquilize(id);
                }
            }
            self.arena.tile_mut(id).flags.remove(TileFlags::RATTLED);
        } else {
            self.arena
                .tile_mut(id)
                .flags
                .remove(TileFlags::PHASES | TileFlags::RATTLED);
            for quadrant in Quadrant::ALL {
                self.sweep_quadrant(id, sweep, &hood, quadrant)?;
            }
        }

        if !self.reversible {
            *self.arena.tile_mut(id).state_mut(target) = Quiescence::NONE;
        }
        Ok(())
    }

    fn sweep_quadrant(
        &mut self,
        id: TileId,
        sweep: Sweep,
        hood: &Hood,
        quadrant: Quadrant,
    ) -> Result<(), LifeError> {
        let target = sweep.target();
        let base = quadrant.first_word();
        let tile = self.arena.tile_mut(id);

        if hood.quadrant_settled(sweep, quadrant, false) {
            let mut current = [0u16; 4];
            current.copy_from_slice(&tile.words(target)[base..base + 4]);
            let live = kernel::touched(sweep, &current);
            kernel::settle_skipped(tile.state_mut(target), quadrant, live);
            return Ok(());
        }

        let fresh = kernel::advance_quadrant(&self.tables, sweep, hood, quadrant);
        let words = tile.words_mut(target);
        let mut diff = [0u16; 4];
        for (i, &word) in fresh.iter().enumerate() {
            diff[i] = words[base + i] ^ word;
            words[base + i] = word;
        }
        let wake = kernel::record(
            tile.state_mut(target),
            sweep,
            quadrant,
            kernel::touched(sweep, &diff),
            kernel::touched(sweep, &fresh),
        );
        for dir in wake.directions(sweep) {
            self.rouse(id, dir)?;
        }
        Ok(())
    }

    /// Rattles the neighbour of `id` in `dir`, creating it if absent.
    fn rouse(&mut self, id: TileId, dir: Direction) -> Result<(), LifeError> {
        let tile = self.arena.tile(id);
        match tile.neighbor(dir) {
            Some(neighbor) => {
                self.arena.rattle(neighbor);
            }
            None => {
                let coord = dir.step(tile.coord);
                self.allocate(coord)?;
            }
        }
        Ok(())
    }

    /// Allocates a tile, digging deeper into the morgue each time the
    /// allocator refuses.
    fn allocate(&mut self, coord: (i16, i16)) -> Result<TileId, LifeError> {
        if let Ok(id) = self.arena.allocate(coord) {
            return Ok(id);
        }
        for mode in [Reclaim::Undisplayed, Reclaim::Everything] {
            let freed = self.arena.reclaim(mode);
            warn!(
                "tile allocation at {coord:?} failed with {} tiles in use; reclaimed {freed} ({mode:?})",
                self.arena.occupied()
            );
            if let Ok(id) = self.arena.allocate(coord) {
                return Ok(id);
            }
        }
        Err(LifeError::ResourceExhausted {
            tiles: self.arena.occupied(),
        })
    }

    // ── Whole-universe operations ───────────────────────────────────────

    /// Drops every tile and returns to generation 0. The rule and pacing
    /// survive.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.phase = Phase::P;
        self.generation = 0;
        self.reversible = false;
        self.countdown = 0;
        self.pacer.begin_run(0);
        debug!("universe cleared");
    }

    /// No live cell anywhere in the current generation.
    pub fn is_empty(&self) -> bool {
        if self.arena.living.is_empty() && self.arena.hibernating.is_empty() {
            return true;
        }
        let tiles = &self.arena.tiles;
        let phase = self.phase;
        self.arena
            .living
            .iter(tiles)
            .chain(self.arena.hibernating.iter(tiles))
            .all(|id| !tiles[id.index()].has_live(phase))
    }

    // ── Display list ────────────────────────────────────────────────────

    /// Puts every living and hibernating tile back on the display list.
    pub fn freshen_view(&mut self) {
        let tiles = &self.arena.tiles;
        let awake: Vec<TileId> = self
            .arena
            .living
            .iter(tiles)
            .chain(self.arena.hibernating.iter(tiles))
            .collect();
        for id in awake {
            self.arena.add_to_display(id);
        }
    }

    /// Tells the engine the renderer has drawn the display list. Morgue tiles
    /// leave it, and so do tiles outside `view` when one is given.
    pub fn acknowledge_frame(&mut self, view: Option<Viewport>) {
        let tiles = &self.arena.tiles;
        let stale: Vec<TileId> = self
            .arena
            .display
            .iter(tiles)
            .filter(|&id| {
                let tile = &tiles[id.index()];
                tile.lifecycle == Lifecycle::Morgue
                    || view.is_some_and(|v| !v.overlaps_tile(tile.coord))
            })
            .collect();
        for id in stale {
            self.arena.remove_from_display(id);
        }
    }

    pub fn display_tiles(&self) -> impl Iterator<Item = TileView<'_>> + '_ {
        let tiles = &self.arena.tiles;
        self.arena.display.iter(tiles).map(move |id| TileView {
            tile: &tiles[id.index()],
        })
    }

    // ── Queries ─────────────────────────────────────────────────────────

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The tiling that holds the current generation.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn is_reversible(&self) -> bool {
        self.reversible
    }

    pub fn tile_counts(&self) -> TileCounts {
        TileCounts {
            living: self.arena.living.len(),
            hibernating: self.arena.hibernating.len(),
            morgue: self.arena.morgue.len(),
            displayed: self.arena.display.len(),
            allocated: self.arena.occupied(),
        }
    }

    /// Lifecycle of the tile holding cell `(x, y)` in the current phase.
    pub fn lifecycle_at(&self, x: i32, y: i32) -> Option<Lifecycle> {
        let (coord, _, _) = locate(self.phase, x, y);
        self.arena
            .id_at(coord)
            .map(|id| self.arena.tile(id).lifecycle)
    }

    pub fn population(&self) -> u64 {
        let phase = self.phase;
        self.arena
            .ids()
            .map(|id| self.arena.tile(id).population(phase) as u64)
            .sum()
    }

    pub fn bounds(&self) -> Option<(i32, i32, i32, i32)> {
        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;
        let mut seen = false;

        self.for_each_live(|x, y| {
            seen = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        });

        seen.then_some((min_x, min_y, max_x, max_y))
    }

    pub fn for_each_live<F: FnMut(i32, i32)>(&self, mut f: F) {
        let phase = self.phase;
        for id in self.arena.ids() {
            let tile = self.arena.tile(id);
            TileView { tile }.for_each_live(phase, &mut f);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn live(engine: &LifeEngine) -> Vec<(i32, i32)> {
        let mut cells = Vec::new();
        engine.for_each_live(|x, y| cells.push((x, y)));
        cells.sort();
        cells
    }

    #[test]
    fn cells_round_trip_in_both_phases() {
        let mut engine = LifeEngine::new();
        let cells = [(0, 0), (-1, -1), (15, 16), (-17, 33), (100, -100)];
        for &(x, y) in &cells {
            engine.set_cell(x, y, true).unwrap();
        }
        for &(x, y) in &cells {
            assert!(engine.get_cell(x, y), "({x},{y})");
        }
        assert!(!engine.get_cell(1, 1));
        assert_eq!(engine.population(), cells.len() as u64);

        // A block is still, so it reads the same from the q tiling.
        let mut engine = LifeEngine::new();
        for (x, y) in [(15, 15), (16, 15), (15, 16), (16, 16)] {
            engine.set_cell(x, y, true).unwrap();
        }
        engine.step_n(1).unwrap();
        assert_eq!(engine.phase(), Phase::Q);
        assert_eq!(live(&engine), vec![(15, 15), (15, 16), (16, 15), (16, 16)]);
        engine.set_cell(0, 0, true).unwrap();
        assert!(engine.get_cell(0, 0));
        engine.set_cell(0, 0, false).unwrap();
        assert!(!engine.get_cell(0, 0));
    }

    #[test]
    fn coordinates_wrap_around_the_torus() {
        let mut engine = LifeEngine::new();
        engine.set_cell(HALF_SPAN, 3, true).unwrap();
        assert!(engine.get_cell(-HALF_SPAN, 3));
        assert_eq!(live(&engine), vec![(-HALF_SPAN, 3)]);
        engine.set_cell(-1, -1, true).unwrap();
        assert_eq!(engine.bounds(), Some((-HALF_SPAN, -1, -1, 3)));
    }

    #[test]
    fn clearing_absent_cell_does_not_allocate() {
        let mut engine = LifeEngine::new();
        engine.set_cell(500, 500, false).unwrap();
        assert_eq!(engine.tile_counts().allocated, 0);
        assert!(!engine.get_cell(500, 500));
    }

    #[test]
    fn edge_cells_allocate_borrowing_neighbours() {
        let mut engine = LifeEngine::new();
        // p phase: the west, north and north-west tiles read column/row 0.
        engine.set_cell(0, 0, true).unwrap();
        assert_eq!(engine.tile_counts().allocated, 4);
        let mut engine = LifeEngine::new();
        engine.set_cell(8, 8, true).unwrap();
        assert_eq!(engine.tile_counts().allocated, 1);
    }

    #[test]
    fn blinker_oscillates_and_steps_back() {
        let mut engine = LifeEngine::new();
        for x in 0..3 {
            engine.set_cell(x, 0, true).unwrap();
        }
        assert_eq!(engine.step_back(), Err(LifeError::InvalidStepBack));
        engine.step_n(1).unwrap();
        assert_eq!(live(&engine), vec![(1, -1), (1, 0), (1, 1)]);
        engine.step_n(1).unwrap();
        assert_eq!(live(&engine), vec![(0, 0), (1, 0), (2, 0)]);
        engine.step_back().unwrap();
        assert_eq!(engine.generation(), 1);
        assert_eq!(live(&engine), vec![(1, -1), (1, 0), (1, 1)]);
        assert_eq!(engine.step_back(), Err(LifeError::InvalidStepBack));
        assert_eq!(engine.generation(), 1);
    }

    #[test]
    fn step_honours_generation_budget() {
        let mut engine = LifeEngine::with_config(
            LifeConfig::default().frame_interval(Duration::from_secs(3600)),
        )
        .unwrap();
        engine.set_cell(3, 3, true).unwrap();
        let mut outcome = engine.step(7, false).unwrap();
        while outcome == StepOutcome::PitStop {
            outcome = engine.step(7, true).unwrap();
        }
        assert_eq!(outcome, StepOutcome::Finished);
        assert_eq!(engine.generation(), 7);
    }

    #[test]
    fn stop_signal_ends_unbounded_run() {
        let mut engine = LifeEngine::new();
        engine.stop_signal().request();
        // A fresh run clears stale requests, so only a resumed run sees it.
        assert_eq!(engine.step(0, true).unwrap(), StepOutcome::Stopped);
        assert_eq!(engine.generation(), 0);
    }

    #[test]
    fn bad_rule_keeps_current_one() {
        let mut engine = LifeEngine::with_config(LifeConfig::default().rule("B36/S23")).unwrap();
        assert_eq!(engine.rule(), "B36/S23");
        assert!(engine.set_rule("236").is_err());
        assert_eq!(engine.rule(), "B36/S23");
        assert!(LifeEngine::with_config(LifeConfig::default().rule("B0/S8")).is_err());
    }

    #[test]
    fn config_overlays_environment() {
        let vars: HashMap<&str, &str> = [
            ("STAGGERLIFE_RULE", " 34/34 "),
            ("STAGGERLIFE_MAX_TILES", "64"),
            ("STAGGERLIFE_SKIP", "not a number"),
        ]
        .into_iter()
        .collect();
        let config = LifeConfig::default()
            .skip(3)
            .overlay(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.rule.as_deref(), Some("34/34"));
        assert_eq!(config.max_tiles, Some(64));
        assert_eq!(config.skip, Some(3));
        assert_eq!(LifeConfig::default().sweep_interval(100).sweep_interval, Some(128));
    }

    #[test]
    fn tile_budget_surfaces_as_resource_exhausted() {
        let mut engine = LifeEngine::with_config(LifeConfig::default().max_tiles(1)).unwrap();
        engine.set_cell(8, 8, true).unwrap();
        assert_eq!(
            engine.set_cell(0, 8, true),
            Err(LifeError::ResourceExhausted { tiles: 1 })
        );
        assert!(engine.get_cell(8, 8));
    }

    #[test]
    fn viewport_overlap_includes_stagger() {
        let view = Viewport {
            x: 0,
            y: 0,
            width: 16,
            height: 16,
        };
        assert!(view.overlaps_tile((0, 0)));
        // Tile (-1, 0) reaches cell 0 through its q tiling.
        assert!(view.overlaps_tile((-1, 0)));
        assert!(!view.overlaps_tile((-2, 0)));
        assert!(!view.overlaps_tile((1, 0)));
        assert!(!view.overlaps_tile((0, 1)));
    }

    #[test]
    fn viewport_straddling_the_seam_sees_both_sides() {
        let view = Viewport {
            x: HALF_SPAN - 8,
            y: -8,
            width: 16,
            height: 16,
        };
        assert!(view.overlaps_tile((i16::MAX, 0)));
        assert!(view.overlaps_tile((i16::MIN, -1)));
        assert!(!view.overlaps_tile((0, 0)));
        assert!(!view.overlaps_tile((i16::MIN + 1, 0)));

        let mut engine = LifeEngine::new();
        engine.set_cell(-HALF_SPAN + 4, 4, true).unwrap();
        engine.set_cell(HALF_SPAN - 4, 4, true).unwrap();
        engine.acknowledge_frame(Some(view));
        let mut shown: Vec<(i16, i16)> = engine.display_tiles().map(|t| t.coord()).collect();
        shown.sort();
        assert_eq!(shown, vec![(i16::MIN, 0), (i16::MAX, 0)]);
    }
}
