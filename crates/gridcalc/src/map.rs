//! The workbook: sheets, dependencies, names and recalculation

use gridcalc_core::{
    validate_sheet_name, CellKey, DamageEvent, DamageKind, DamageQueue, DamageSink,
    DependencyGraph, Error as CoreError, Formula, MapSettings, Position, Rect, Region, Sheet,
    SheetId, Value,
};

use gridcalc_formula::ReferenceChange;

use crate::context::{sheet_named, sheet_with_id};
use crate::error::Result;
use crate::names::{validate_name, NamedAreas};
use crate::recalc::{RecalcManager, RecalcOptions, RecalcStats, RecalcTarget};

/// All sheets of a document plus the state shared between them
///
/// Every mutating call leaves formula results consistent and queues damage
/// events, which the caller collects with [`Map::take_damages`].
#[derive(Debug)]
pub struct Map {
    sheets: Vec<Sheet>,
    last_sheet_id: u32,
    graph: DependencyGraph,
    recalc: RecalcManager,
    names: NamedAreas,
    settings: MapSettings,
    damages: DamageQueue,
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

impl Map {
    /// Create an empty map with default settings
    pub fn new() -> Self {
        Self::with_settings(MapSettings::default())
    }

    /// Empty map with the given settings
    pub fn with_settings(settings: MapSettings) -> Self {
        Self {
            sheets: Vec::new(),
            last_sheet_id: 0,
            graph: DependencyGraph::new(),
            recalc: RecalcManager::new(),
            names: NamedAreas::new(),
            settings,
            damages: DamageQueue::new(),
        }
    }

    /// Settings shared by all sheets
    pub fn settings(&self) -> &MapSettings {
        &self.settings
    }

    /// The recalculation scheduler
    pub fn recalc_manager(&self) -> &RecalcManager {
        &self.recalc
    }

    /// Replace the recalculation options
    pub fn set_recalc_options(&mut self, options: RecalcOptions) {
        self.recalc.set_options(options);
    }

    /// The dependency graph of all formula cells
    pub fn dependencies(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Every defined name
    pub fn named_areas(&self) -> &NamedAreas {
        &self.names
    }

    // === Sheets ===

    /// Append a sheet
    pub fn add_sheet<S: Into<String>>(&mut self, name: S) -> Result<SheetId> {
        let name = name.into();
        validate_sheet_name(&name)?;
        if self.sheet_by_name(&name).is_some() {
            return Err(CoreError::DuplicateSheetName(name).into());
        }
        self.last_sheet_id += 1;
        let id = SheetId(self.last_sheet_id);
        tracing::debug!("adding sheet '{}' as {}", name, id);
        self.sheets
            .push(Sheet::with_settings(id, name, &self.settings));

        self.damages
            .add_damage(id, Region::from_rect(Rect::SHEET, id), DamageKind::Structure);
        self.update_all_dependencies();
        self.recalc_map();
        Ok(id)
    }

    /// Remove a sheet, returning it
    ///
    /// Formulas on other sheets that read it evaluate to `#REF!`.
    pub fn remove_sheet(&mut self, id: SheetId) -> Result<Sheet> {
        let index = self.sheet_index(id)?;
        let sheet = self.sheets.remove(index);
        tracing::debug!("removed sheet '{}' ({})", sheet.name(), id);
        self.graph.remove_sheet(id);

        self.damages
            .add_damage(id, Region::from_rect(Rect::SHEET, id), DamageKind::Structure);
        self.update_all_dependencies();
        self.recalc_map();
        Ok(sheet)
    }

    /// Rename a sheet; the name must be valid and unused
    pub fn rename_sheet<S: Into<String>>(&mut self, id: SheetId, name: S) -> Result<()> {
        let name = name.into();
        validate_sheet_name(&name)?;
        if self
            .sheet_by_name(&name)
            .is_some_and(|other| other.id() != id)
        {
            return Err(CoreError::DuplicateSheetName(name).into());
        }
        self.require_sheet_mut(id)?.set_name(name);
        // References by the new name now resolve, references by the old one don't
        self.update_all_dependencies();
        self.recalc_map();
        Ok(())
    }

    /// Sheet with an id
    pub fn sheet(&self, id: SheetId) -> Option<&Sheet> {
        sheet_with_id(&self.sheets, id)
    }

    /// Mutable access bypassing dependency tracking
    ///
    /// Values written here are not recalculated until the next
    /// [`Map::recalc_sheet`] or [`Map::recalc_map`].
    pub fn sheet_mut(&mut self, id: SheetId) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|sheet| sheet.id() == id)
    }

    /// Find a sheet by name, ignoring case
    pub fn sheet_by_name(&self, name: &str) -> Option<&Sheet> {
        sheet_named(&self.sheets, name)
    }

    /// All sheets in order
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    /// Number of sheets
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Turn automatic recalculation of a sheet on or off
    ///
    /// Turning it on brings the sheet up to date.
    pub fn set_auto_calculation(&mut self, id: SheetId, enabled: bool) -> Result<()> {
        self.require_sheet_mut(id)?
            .set_auto_calculation_enabled(enabled);
        if enabled {
            self.recalc_sheet(id)?;
        }
        Ok(())
    }

    fn sheet_index(&self, id: SheetId) -> Result<usize> {
        self.sheets
            .iter()
            .position(|sheet| sheet.id() == id)
            .ok_or_else(|| CoreError::UnknownSheet(id).into())
    }

    pub(crate) fn require_sheet_mut(&mut self, id: SheetId) -> Result<&mut Sheet> {
        self.sheet_mut(id)
            .ok_or_else(|| CoreError::UnknownSheet(id).into())
    }

    // === Cells ===

    /// Current value of a cell
    pub fn value(&self, sheet: SheetId, col: u32, row: u32) -> Value {
        self.sheet(sheet)
            .map(|sheet| sheet.storage().value(col, row))
            .unwrap_or_default()
    }

    /// Formula text of a cell (empty if none)
    pub fn formula(&self, sheet: SheetId, col: u32, row: u32) -> Formula {
        self.sheet(sheet)
            .map(|sheet| sheet.storage().formula(col, row))
            .unwrap_or_default()
    }

    /// Store a constant, replacing any formula
    pub fn set_value(&mut self, sheet: SheetId, col: u32, row: u32, value: Value) -> Result<()> {
        let cell = checked_cell(sheet, col, row)?;
        let had_formula = !self
            .require_sheet_mut(sheet)?
            .storage()
            .formula(col, row)
            .is_empty();
        if had_formula {
            self.remove_formula(cell);
        }
        if let Some(sheet) = self.sheet_mut(sheet) {
            sheet.storage_mut().set_value(col, row, value);
        }

        let region = Region::from_cell(cell);
        self.damages
            .add_damage(sheet, region.clone(), DamageKind::Value);
        self.region_changed(&region);
        Ok(())
    }

    /// Store a formula and recalculate it with everything that reads it
    ///
    /// Unparsable formulas are kept; they are skipped by recalculation until
    /// replaced. An empty text clears the cell.
    pub fn set_formula(&mut self, sheet: SheetId, col: u32, row: u32, text: &str) -> Result<()> {
        let cell = checked_cell(sheet, col, row)?;
        if text.trim().is_empty() {
            return self.clear_cell(sheet, col, row);
        }
        self.require_sheet_mut(sheet)?
            .storage_mut()
            .set_formula(col, row, Formula::new(text));

        // Cells that were part of a cycle through this cell get a fresh start
        let mut stale = self.graph.cycle_neighbourhood(cell);
        self.record_dependencies(cell);
        stale.extend(self.graph.cycle_neighbourhood(cell));
        stale.push(cell);
        self.clear_circular_values(&stale);

        let region = Region::from_cell(cell);
        self.damages
            .add_damage(sheet, region.clone(), DamageKind::Formula);
        self.region_changed(&region);
        Ok(())
    }

    /// Remove every attribute held at a position
    pub fn clear_cell(&mut self, sheet: SheetId, col: u32, row: u32) -> Result<()> {
        let cell = checked_cell(sheet, col, row)?;
        self.require_sheet_mut(sheet)?;
        self.remove_formula(cell);
        if let Some(sheet) = self.sheet_mut(sheet) {
            sheet.storage_mut().take(col, row);
        }

        let region = Region::from_cell(cell);
        self.damages
            .add_damage(sheet, region.clone(), DamageKind::Value);
        self.region_changed(&region);
        Ok(())
    }

    fn remove_formula(&mut self, cell: CellKey) {
        let mut stale = self.graph.cycle_neighbourhood(cell);
        stale.push(cell);
        self.graph.remove_formula(cell);
        if let Some(sheet) = self.sheet_mut(cell.sheet) {
            let pos = cell.position();
            sheet
                .storage_mut()
                .set_formula(pos.col, pos.row, Formula::empty());
        }
        self.clear_circular_values(&stale);
    }

    /// Replace `#CIRCLE!` values so the cells are evaluated again
    fn clear_circular_values(&mut self, cells: &[CellKey]) {
        for cell in cells {
            let pos = cell.position();
            let Some(sheet) = self.sheet_mut(cell.sheet) else {
                continue;
            };
            let storage = sheet.storage_mut();
            if storage.value(pos.col, pos.row).is_circular() {
                storage.set_value(pos.col, pos.row, Value::Empty);
            }
        }
    }

    // === Named areas ===

    /// Define or redefine a named area
    pub fn define_name(&mut self, name: &str, region: Region) -> Result<()> {
        validate_name(name)?;
        if region.valid_elements().next().is_none() {
            tracing::debug!("named area '{}' has no valid range", name);
        }
        self.names.insert(name, region);
        self.area_modified(name);
        Ok(())
    }

    /// Remove a name and recalculate the formulas using it
    pub fn remove_name(&mut self, name: &str) -> Option<Region> {
        let removed = self.names.remove(name);
        if removed.is_some() {
            self.area_modified(name);
        }
        removed
    }

    /// Region of a defined name, ignoring case
    pub fn named_area(&self, name: &str) -> Option<&Region> {
        self.names.get(name)
    }

    /// Re-record the formulas that use a name and recalculate them
    fn area_modified(&mut self, name: &str) {
        let consumers = self.graph.area_consumers(name);
        if consumers.is_empty() {
            return;
        }
        tracing::debug!("{} formulas use named area '{}'", consumers.len(), name);
        let mut changed = Region::new();
        for cell in consumers {
            self.record_dependencies(cell);
            changed.add(Rect::from_position(cell.position()), cell.sheet);
        }
        self.region_changed(&changed);
    }

    // === Dependencies ===

    /// Rebuild the dependency graph from the formulas of every sheet
    ///
    /// Cycles are detected again from scratch, so `#CIRCLE!` results are
    /// cleared too.
    pub fn update_all_dependencies(&mut self) {
        self.graph.clear();
        let cells: Vec<CellKey> = self
            .sheets
            .iter()
            .flat_map(|sheet| {
                let id = sheet.id();
                sheet
                    .storage()
                    .formula_positions()
                    .map(move |(pos, _)| CellKey::at(id, pos))
            })
            .collect();
        for &cell in &cells {
            self.record_dependencies(cell);
        }
        self.clear_circular_values(&cells);
        tracing::debug!("rebuilt dependencies of {} formulas", cells.len());
    }

    /// Record what the formula at `cell` reads
    fn record_dependencies(&mut self, cell: CellKey) {
        let pos = cell.position();
        let text = match self.sheet(cell.sheet) {
            Some(sheet) => sheet.storage().formula(pos.col, pos.row),
            None => Formula::empty(),
        };
        if text.is_empty() {
            self.graph.remove_formula(cell);
            return;
        }

        let references = gridcalc_formula::Formula::from(&text).references();
        let mut region = Region::new();
        for (sheet_name, rect) in &references.ranges {
            let sheet = match sheet_name {
                None => Some(cell.sheet),
                Some(name) => self.sheet_by_name(name).map(Sheet::id),
            };
            match sheet {
                Some(sheet) => {
                    region.add(*rect, sheet);
                }
                None => tracing::debug!("{}: skipping reference to unknown sheet", cell),
            }
        }
        for name in &references.names {
            match self.names.get(name) {
                Some(area) => {
                    region.add_region(area);
                }
                None => tracing::debug!("{}: name '{}' is not defined", cell, name),
            }
        }

        self.graph.record_formula(cell, region);
        self.graph.record_named_areas(cell, &references.names);
    }

    /// Depth of a formula cell; `None` for plain and circular cells
    pub fn depth(&mut self, sheet: SheetId, col: u32, row: u32) -> Option<u32> {
        self.graph.depth(CellKey::new(sheet, col, row))
    }

    /// Whether a cell is part of a circular reference
    pub fn is_circular(&mut self, sheet: SheetId, col: u32, row: u32) -> bool {
        self.graph.is_circular(CellKey::new(sheet, col, row))
    }

    // === Recalculation ===

    /// Recalculate the formulas reading a changed region
    pub fn region_changed(&mut self, region: &Region) -> RecalcStats {
        let target = RecalcTarget {
            sheets: &mut self.sheets,
            graph: &mut self.graph,
            names: &self.names,
            damages: &mut self.damages,
        };
        self.recalc.region_changed(region, target)
    }

    /// Recalculate one sheet, even if its auto-calculation is off
    pub fn recalc_sheet(&mut self, sheet: SheetId) -> Result<RecalcStats> {
        self.sheet_index(sheet)?;
        let target = RecalcTarget {
            sheets: &mut self.sheets,
            graph: &mut self.graph,
            names: &self.names,
            damages: &mut self.damages,
        };
        Ok(self.recalc.recalc_sheet(sheet, target))
    }

    /// Recalculate every formula of the map
    pub fn recalc_map(&mut self) -> RecalcStats {
        let target = RecalcTarget {
            sheets: &mut self.sheets,
            graph: &mut self.graph,
            names: &self.names,
            damages: &mut self.damages,
        };
        self.recalc.recalc_map(target)
    }

    // === Damage ===

    /// Take the damage events queued since the last call
    pub fn take_damages(&mut self) -> Vec<DamageEvent> {
        self.damages.drain()
    }

    pub(crate) fn add_damage(&mut self, sheet: SheetId, rect: Rect, kind: DamageKind) {
        self.damages
            .add_damage(sheet, Region::from_rect(rect, sheet), kind);
    }

    /// Rewrite formulas of every sheet that reference moved rows or columns
    ///
    /// Runs before the layout change, in the old coordinates. Formulas in a
    /// band about to be removed are left alone. Returns the number of
    /// rewritten formulas.
    pub(crate) fn adjust_references(&mut self, target: SheetId, change: ReferenceChange) -> usize {
        let Some(target_name) = self.sheet(target).map(|sheet| sheet.name().to_string()) else {
            return 0;
        };
        let mut rewritten = 0;
        for sheet in &mut self.sheets {
            let own = sheet.id() == target;
            let affects = |name: Option<&str>| match name {
                None => own,
                Some(name) => name.eq_ignore_ascii_case(&target_name),
            };
            let updates: Vec<(Position, String)> = sheet
                .storage()
                .formula_positions()
                .filter(|(pos, _)| !(own && change.removes(pos.col, pos.row)))
                .filter_map(|(pos, formula)| {
                    gridcalc_formula::Formula::from(formula)
                        .adjusted(change, &affects)
                        .map(|text| (pos, text))
                })
                .collect();
            for (pos, text) in updates {
                tracing::trace!("{}!{}: references now {}", sheet.name(), pos, text);
                sheet
                    .storage_mut()
                    .set_formula(pos.col, pos.row, Formula::new(text));
                rewritten += 1;
            }
        }
        tracing::debug!("{:?} rewrote {} formulas", change, rewritten);
        rewritten
    }

    /// Bring formulas up to date after rows, columns or cells moved
    ///
    /// Dependencies are recorded again from the cells' new positions and the
    /// whole map is recalculated.
    pub(crate) fn structure_changed(&mut self, damaged: &[(SheetId, Rect)]) {
        for &(sheet, rect) in damaged {
            self.add_damage(sheet, rect, DamageKind::Appearance);
        }
        self.update_all_dependencies();
        self.recalc_map();
    }
}

fn checked_cell(sheet: SheetId, col: u32, row: u32) -> Result<CellKey> {
    let pos = Position::new(col, row);
    if !pos.is_valid() {
        return Err(CoreError::InvalidAddress(format!("({}, {})", col, row)).into());
    }
    Ok(CellKey::at(sheet, pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sheet_lifecycle() {
        let mut map = Map::new();
        let first = map.add_sheet("Sheet1").unwrap();
        let second = map.add_sheet("Data").unwrap();
        assert_ne!(first, second);
        assert!(map.add_sheet("data").is_err());
        assert!(map.add_sheet("bad/name").is_err());

        map.rename_sheet(second, "Input").unwrap();
        assert_eq!(map.sheet_by_name("INPUT").map(Sheet::id), Some(second));

        let removed = map.remove_sheet(first).unwrap();
        assert_eq!(removed.name(), "Sheet1");
        assert_eq!(map.sheet_count(), 1);
        assert!(map.remove_sheet(first).is_err());

        let third = map.add_sheet("Sheet1").unwrap();
        assert_ne!(third, first);
    }

    #[test]
    fn test_value_replaces_formula() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        map.set_formula(sheet, 1, 1, "=2*3").unwrap();
        assert_eq!(map.value(sheet, 1, 1), Value::Float(6.0));

        map.set_value(sheet, 1, 1, Value::from(1)).unwrap();
        assert!(map.formula(sheet, 1, 1).is_empty());
        assert!(!map.dependencies().is_formula_cell(CellKey::new(sheet, 1, 1)));
        assert_eq!(map.value(sheet, 1, 1), Value::from(1));
    }

    #[test]
    fn test_invalid_address_is_an_error() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        assert!(map.set_value(sheet, 0, 1, Value::from(1)).is_err());
        assert!(map.set_formula(SheetId(99), 1, 1, "=1").is_err());
    }

    #[test]
    fn test_cross_sheet_reference() {
        let mut map = Map::new();
        let first = map.add_sheet("Sheet1").unwrap();
        let data = map.add_sheet("Data").unwrap();
        map.set_value(data, 1, 1, Value::from(20)).unwrap();
        map.set_formula(first, 1, 1, "=Data!A1+1").unwrap();
        assert_eq!(map.value(first, 1, 1), Value::Float(21.0));

        map.set_value(data, 1, 1, Value::from(30)).unwrap();
        assert_eq!(map.value(first, 1, 1), Value::Float(31.0));

        map.remove_sheet(data).unwrap();
        assert_eq!(
            map.value(first, 1, 1),
            Value::Error(gridcalc_core::ErrorKind::Ref)
        );
    }

    #[test]
    fn test_named_area_changes_recalculate() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        map.set_value(sheet, 1, 1, Value::from(2)).unwrap();
        map.set_value(sheet, 1, 2, Value::from(5)).unwrap();
        map.set_formula(sheet, 2, 1, "=Rate*10").unwrap();
        assert_eq!(
            map.value(sheet, 2, 1),
            Value::Error(gridcalc_core::ErrorKind::Name)
        );

        map.define_name("Rate", Region::from_rect(Rect::new(1, 1, 1, 1), sheet))
            .unwrap();
        assert_eq!(map.value(sheet, 2, 1), Value::Float(20.0));

        map.set_value(sheet, 1, 1, Value::from(3)).unwrap();
        assert_eq!(map.value(sheet, 2, 1), Value::Float(30.0));

        map.define_name("rate", Region::from_rect(Rect::new(1, 2, 1, 2), sheet))
            .unwrap();
        assert_eq!(map.value(sheet, 2, 1), Value::Float(50.0));

        assert!(map.remove_name("RATE").is_some());
        assert_eq!(
            map.value(sheet, 2, 1),
            Value::Error(gridcalc_core::ErrorKind::Name)
        );
        assert!(map.define_name("A1", Region::new()).is_err());
    }

    #[test]
    fn test_damage_is_queued() {
        let mut map = Map::new();
        let sheet = map.add_sheet("Sheet1").unwrap();
        map.take_damages();

        map.set_formula(sheet, 2, 2, "=1+1").unwrap();
        let kinds: Vec<DamageKind> = map.take_damages().iter().map(|event| event.kind).collect();
        assert_eq!(kinds, vec![DamageKind::Formula, DamageKind::Value]);
        assert!(map.take_damages().is_empty());
    }
}
