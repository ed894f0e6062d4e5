//! Dependency-ordered recalculation
//!
//! [`RecalcManager`] walks the formula cells that need new values in
//! ascending depth order, so every cell is evaluated after the formula cells
//! it reads. The manager is a small state machine:
//!
//! ```text
//! Idle -> Collecting -> Evaluating -> Idle
//! ```
//!
//! A trigger that arrives while the manager is not idle is ignored. The
//! state returns to idle through [`ActiveGuard`] on every exit path.

use std::cell::Cell;

use ahash::{AHashMap, AHashSet};
use gridcalc_core::{
    CellKey, CellStorage, DamageKind, DamageSink, DependencyGraph, ErrorKind, Position, Rect,
    Region, Sheet, SheetId, Value, ValueArray,
};
use gridcalc_formula::Formula;

use crate::context::{sheet_with_id, MapContext};
use crate::names::NamedAreas;

/// Recalculation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecalcState {
    #[default]
    Idle,
    /// Building the work set
    Collecting,
    /// Walking the work set by depth
    Evaluating,
}

/// Recalculation options
#[derive(Debug, Clone, PartialEq)]
pub struct RecalcOptions {
    /// Leave cells on sheets with auto-calculation disabled out of
    /// change-driven and map-wide recalculation
    pub honor_auto_calculation: bool,
}

impl Default for RecalcOptions {
    fn default() -> Self {
        Self {
            honor_auto_calculation: true,
        }
    }
}

impl RecalcOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_honor_auto_calculation(mut self, honor: bool) -> Self {
        self.honor_auto_calculation = honor;
        self
    }
}

/// Counters for one recalculation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecalcStats {
    /// Formulas evaluated
    pub evaluated: usize,
    /// Cells left alone because they are part of a cycle
    pub skipped_circular: usize,
    /// Cells left alone because their formula does not parse
    pub skipped_invalid: usize,
    /// Array results written over more than one cell
    pub arrays_spilled: usize,
    /// The trigger arrived while another recalculation was running
    pub suppressed: bool,
}

impl RecalcStats {
    fn suppressed() -> Self {
        Self {
            suppressed: true,
            ..Default::default()
        }
    }
}

/// The parts of the map a recalculation reads and writes
pub struct RecalcTarget<'a> {
    pub sheets: &'a mut [Sheet],
    pub graph: &'a mut DependencyGraph,
    pub names: &'a NamedAreas,
    pub damages: &'a mut dyn DamageSink,
}

/// Puts the manager back to idle when dropped
#[must_use]
pub struct ActiveGuard<'a> {
    state: &'a Cell<RecalcState>,
}

impl ActiveGuard<'_> {
    fn enter(&self, state: RecalcState) {
        self.state.set(state);
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.state.set(RecalcState::Idle);
    }
}

/// Schedules and runs formula evaluation
#[derive(Debug, Default)]
pub struct RecalcManager {
    state: Cell<RecalcState>,
    options: RecalcOptions,
}

impl RecalcManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RecalcOptions) -> Self {
        Self {
            state: Cell::default(),
            options,
        }
    }

    pub fn options(&self) -> &RecalcOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: RecalcOptions) {
        self.options = options;
    }

    pub fn state(&self) -> RecalcState {
        self.state.get()
    }

    pub fn is_active(&self) -> bool {
        self.state.get() != RecalcState::Idle
    }

    /// Leave the idle state
    ///
    /// Returns `None` if a recalculation is already running.
    pub fn activate(&self) -> Option<ActiveGuard<'_>> {
        if self.is_active() {
            return None;
        }
        self.state.set(RecalcState::Collecting);
        Some(ActiveGuard { state: &self.state })
    }

    /// Recalculate the formulas in a region and everything that reads them
    pub fn region_changed(&self, region: &Region, target: RecalcTarget<'_>) -> RecalcStats {
        let Some(guard) = self.activate() else {
            tracing::debug!("recalculation already running, ignoring region change");
            return RecalcStats::suppressed();
        };

        let mut pending = target.graph.consumers_of(region);
        for element in region.valid_elements() {
            pending.extend(target.graph.formula_cells_within(&element.rect, element.sheet));
        }
        let work = transitive_consumers(target.graph, pending);

        let work = self.filter_auto_calculation(work.into_iter().collect(), target.sheets);
        self.evaluate(&guard, work, true, target)
    }

    /// Recalculate every formula of one sheet, even with auto-calculation off
    pub fn recalc_sheet(&self, sheet: SheetId, target: RecalcTarget<'_>) -> RecalcStats {
        let Some(guard) = self.activate() else {
            tracing::debug!("recalculation already running, ignoring {}", sheet);
            return RecalcStats::suppressed();
        };
        let work = target.graph.formula_cells_in(sheet);
        self.evaluate(&guard, work, false, target)
    }

    /// Recalculate every formula of the map
    pub fn recalc_map(&self, target: RecalcTarget<'_>) -> RecalcStats {
        let Some(guard) = self.activate() else {
            tracing::debug!("recalculation already running, ignoring map recalculation");
            return RecalcStats::suppressed();
        };
        let work = target.graph.formula_cells().collect();
        let work = self.filter_auto_calculation(work, target.sheets);
        self.evaluate(&guard, work, true, target)
    }

    fn filter_auto_calculation(&self, mut work: Vec<CellKey>, sheets: &[Sheet]) -> Vec<CellKey> {
        if self.options.honor_auto_calculation {
            work.retain(|cell| {
                sheet_with_id(sheets, cell.sheet).is_some_and(Sheet::is_auto_calculation_enabled)
            });
        }
        work
    }

    /// Evaluate `work`, then the readers of the arrays it spilled
    ///
    /// `auto_only` applies the auto-calculation filter to those readers.
    fn evaluate(
        &self,
        guard: &ActiveGuard<'_>,
        work: Vec<CellKey>,
        auto_only: bool,
        target: RecalcTarget<'_>,
    ) -> RecalcStats {
        guard.enter(RecalcState::Evaluating);
        let RecalcTarget {
            sheets,
            graph,
            names,
            damages,
        } = target;
        let mut stats = RecalcStats::default();

        let (circular, acyclic): (Vec<CellKey>, Vec<CellKey>) = {
            let circular = graph.circular_cells();
            work.into_iter().partition(|cell| circular.contains(cell))
        };
        if !circular.is_empty() {
            tracing::debug!("{} cells are part of a circular reference", circular.len());
        }
        for cell in circular {
            stats.skipped_circular += 1;
            let Some(storage) = storage_mut(sheets, cell.sheet) else {
                continue;
            };
            let pos = cell.position();
            if !storage.value(pos.col, pos.row).is_circular() {
                storage.set_value(pos.col, pos.row, Value::error_circle());
                damages.add_damage(cell.sheet, Region::from_cell(cell), DamageKind::Value);
            }
        }

        let depths = graph.depths().clone();
        let circular = graph.circular_cells().clone();
        let mut spills = evaluate_in_order(acyclic, &depths, sheets, names, damages, &mut stats);

        // Readers of spilled cells are not linked to the array formula, so
        // they are refreshed in follow-up rounds until no array changes.
        let mut rounds = 0;
        while !spills.is_empty() {
            if rounds == MAX_SPILL_ROUNDS {
                tracing::warn!("spilled arrays still changing after {} rounds", rounds);
                break;
            }
            rounds += 1;
            let pending = spills
                .iter()
                .flat_map(|region| graph.consumers_of(region))
                .collect();
            let mut work: Vec<CellKey> = transitive_consumers(graph, pending)
                .into_iter()
                .filter(|cell| !circular.contains(cell))
                .collect();
            if auto_only {
                work = self.filter_auto_calculation(work, sheets);
            }
            spills = evaluate_in_order(work, &depths, sheets, names, damages, &mut stats);
        }

        tracing::debug!(
            "recalculated {} cells ({} circular, {} invalid, {} spilled)",
            stats.evaluated,
            stats.skipped_circular,
            stats.skipped_invalid,
            stats.arrays_spilled
        );
        stats
    }
}

/// Follow-up rounds that refresh readers of spilled cells
const MAX_SPILL_ROUNDS: usize = 32;

/// `pending` and every formula cell that reads them, directly or not
fn transitive_consumers(graph: &DependencyGraph, mut pending: Vec<CellKey>) -> AHashSet<CellKey> {
    let mut work = AHashSet::new();
    while let Some(cell) = pending.pop() {
        if work.insert(cell) {
            pending.extend(graph.consumers_of(&Region::from_cell(cell)));
        }
    }
    work
}

/// Evaluate cells in ascending depth order
///
/// Returns the regions of array results that changed more than their
/// own cell.
fn evaluate_in_order(
    cells: Vec<CellKey>,
    depths: &AHashMap<CellKey, u32>,
    sheets: &mut [Sheet],
    names: &NamedAreas,
    damages: &mut dyn DamageSink,
    stats: &mut RecalcStats,
) -> Vec<Region> {
    let mut ordered: Vec<(u32, CellKey)> = cells
        .into_iter()
        .map(|cell| (depths.get(&cell).copied().unwrap_or(0), cell))
        .collect();
    ordered.sort_unstable();

    let mut spills = Vec::new();
    for (_, cell) in ordered {
        let pos = cell.position();
        let formula = {
            let Some(sheet) = sheet_with_id(sheets, cell.sheet) else {
                continue;
            };
            let storage = sheet.storage();
            if storage.value(pos.col, pos.row).is_circular() {
                stats.skipped_circular += 1;
                continue;
            }
            storage.formula(pos.col, pos.row)
        };
        if formula.is_empty() {
            continue;
        }
        let formula = Formula::from(&formula);
        if !formula.is_valid() {
            stats.skipped_invalid += 1;
            continue;
        }

        let result = formula.eval(&MapContext {
            sheets: &*sheets,
            names,
            current: cell.sheet,
        });
        stats.evaluated += 1;

        let Some(storage) = storage_mut(sheets, cell.sheet) else {
            continue;
        };
        let (damaged, spilled) = write_result(storage, pos, result);
        if spilled {
            stats.arrays_spilled += 1;
        }
        let region = Region::from_rect(damaged, cell.sheet);
        if damaged != Rect::from_position(pos) {
            spills.push(region.clone());
        }
        damages.add_damage(cell.sheet, region, DamageKind::Value);
    }
    spills
}

fn storage_mut(sheets: &mut [Sheet], id: SheetId) -> Option<&mut CellStorage> {
    sheets
        .iter_mut()
        .find(|sheet| sheet.id() == id)
        .map(Sheet::storage_mut)
}

/// Write an evaluation result at `pos`, spilling arrays under a lock
///
/// Returns the rectangle whose values changed and whether the result spilled.
fn write_result(storage: &mut CellStorage, pos: Position, result: Value) -> (Rect, bool) {
    let old_lock = storage
        .locked_cells(pos.col, pos.row)
        .filter(|rect| rect.top_left() == pos);
    let damaged = old_lock.unwrap_or_else(|| Rect::from_position(pos));

    if !result.is_array() || (result.rows() <= 1 && result.columns() <= 1) {
        // Also releases any lock left by an earlier array result
        storage.set_value(pos.col, pos.row, result.element(0, 0));
        return (damaged, false);
    }

    if !ValueArray::fits(result.columns(), result.rows()) {
        storage.set_value(pos.col, pos.row, Value::Error(ErrorKind::Num));
        return (damaged, false);
    }

    let rect = Rect::from_size(pos.col, pos.row, result.columns(), result.rows()).clamped();
    storage.set_value(pos.col, pos.row, result.element(0, 0));
    for target in rect.positions().filter(|target| *target != pos) {
        let element = result.element(target.col - pos.col, target.row - pos.row);
        storage.set_value(target.col, target.row, element);
    }
    storage.lock_cells(rect);
    (damaged.united(&rect), true)
}
