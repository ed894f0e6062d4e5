//! Dependency tracking for formula recalculation
//!
//! For every formula cell the graph keeps the region it reads (its
//! providers) and a per-sheet reverse index from rectangles to the formula
//! cells reading them (the consumers), bucketed by row band. Depths are the
//! longest dependency chain below a cell and are recomputed lazily after any
//! change.

use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};

use crate::position::Rect;
use crate::region::{CellKey, Region, SheetId};
use crate::store::PositionKeyedStore;

/// Dependency graph of all formula cells of a map
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Formula cell -> region it reads
    providers: AHashMap<CellKey, Region>,
    /// Sheet -> read rectangles and the formula cells reading them
    consumers: AHashMap<SheetId, ConsumerIndex>,
    /// Named area -> formula cells using the name
    area_deps: AHashMap<String, AHashSet<CellKey>>,
    /// Sheet -> positions of its formula cells
    formula_index: AHashMap<SheetId, PositionKeyedStore<()>>,

    depths: AHashMap<CellKey, u32>,
    circular: AHashSet<CellKey>,
    depths_valid: bool,
}

/// Rows per bucket of a [`ConsumerIndex`]
const BAND_ROWS: u32 = 64;

/// Rectangles spanning more bands than this are not bucketed
const MAX_BANDS: u32 = 32;

fn band(row: u32) -> u32 {
    row / BAND_ROWS
}

/// Rectangles read by formulas on one sheet, bucketed by row band
///
/// A rectangle is stored in every band it touches, so a lookup only visits
/// the bands of the query. Rectangles taller than [`MAX_BANDS`] bands, such
/// as whole columns, live in one list that every lookup scans.
#[derive(Debug, Default)]
struct ConsumerIndex {
    bands: BTreeMap<u32, Vec<(Rect, CellKey)>>,
    tall: Vec<(Rect, CellKey)>,
}

impl ConsumerIndex {
    fn is_tall(rect: &Rect) -> bool {
        band(rect.bottom) - band(rect.top) >= MAX_BANDS
    }

    fn insert(&mut self, rect: Rect, cell: CellKey) {
        if Self::is_tall(&rect) {
            self.tall.push((rect, cell));
            return;
        }
        for b in band(rect.top)..=band(rect.bottom) {
            self.bands.entry(b).or_default().push((rect, cell));
        }
    }

    /// Drop every pair of `cell` stored where `rect` would be
    fn remove(&mut self, rect: &Rect, cell: CellKey) {
        if Self::is_tall(rect) {
            self.tall.retain(|(_, consumer)| *consumer != cell);
            return;
        }
        for b in band(rect.top)..=band(rect.bottom) {
            if let Some(pairs) = self.bands.get_mut(&b) {
                pairs.retain(|(_, consumer)| *consumer != cell);
                if pairs.is_empty() {
                    self.bands.remove(&b);
                }
            }
        }
    }

    /// Stored pairs whose rectangle intersects `rect`, each pair once
    fn intersecting(&self, rect: Rect) -> impl Iterator<Item = &(Rect, CellKey)> + '_ {
        let first = band(rect.top);
        let banded = self
            .bands
            .range(first..=band(rect.bottom))
            .flat_map(move |(&b, pairs)| {
                // report a pair only from the first band it shares with the query
                pairs
                    .iter()
                    .filter(move |(stored, _)| band(stored.top).max(first) == b)
            });
        banded
            .chain(self.tall.iter())
            .filter(move |(stored, _)| stored.intersects(&rect))
    }
}

/// One level of the depth computation walk
struct Frame {
    cell: CellKey,
    deps: Vec<CellKey>,
    next: usize,
    depth: u32,
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    // === Recording ===

    /// Register `cell` as a formula reading `region`, replacing what it read before
    ///
    /// Cells without references are recorded too, so the graph knows every
    /// formula cell. Invalid region elements are dropped.
    pub fn record_formula(&mut self, cell: CellKey, region: Region) {
        self.unlink(cell);

        let region: Region = region.valid_elements().copied().collect();
        for element in region.iter() {
            self.consumers
                .entry(element.sheet)
                .or_default()
                .insert(element.rect, cell);
        }
        self.formula_index
            .entry(cell.sheet)
            .or_default()
            .set(cell.position(), ());
        self.providers.insert(cell, region);
        self.depths_valid = false;
    }

    /// Register the named areas a formula cell uses
    pub fn record_named_areas<I, S>(&mut self, cell: CellKey, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.area_deps
                .entry(name.as_ref().to_lowercase())
                .or_default()
                .insert(cell);
        }
    }

    /// Forget a formula cell
    pub fn remove_formula(&mut self, cell: CellKey) {
        if self.unlink(cell) {
            if let Some(index) = self.formula_index.get_mut(&cell.sheet) {
                index.take(cell.position());
            }
            self.depths_valid = false;
        }
    }

    /// Remove the provider, consumer and name entries of a cell
    fn unlink(&mut self, cell: CellKey) -> bool {
        let Some(region) = self.providers.remove(&cell) else {
            return false;
        };
        for element in region.iter() {
            if let Some(index) = self.consumers.get_mut(&element.sheet) {
                index.remove(&element.rect, cell);
            }
        }
        for cells in self.area_deps.values_mut() {
            cells.remove(&cell);
        }
        true
    }

    /// Forget every formula on a sheet and every reference into it
    pub fn remove_sheet(&mut self, sheet: SheetId) {
        let cells: Vec<CellKey> = self
            .providers
            .keys()
            .filter(|cell| cell.sheet == sheet)
            .copied()
            .collect();
        for cell in cells {
            self.unlink(cell);
        }
        self.consumers.remove(&sheet);
        self.formula_index.remove(&sheet);
        self.depths_valid = false;
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.providers.clear();
        self.consumers.clear();
        self.area_deps.clear();
        self.formula_index.clear();
        self.depths.clear();
        self.circular.clear();
        self.depths_valid = false;
    }

    // === Queries ===

    /// Region a formula cell reads
    pub fn providers(&self, cell: CellKey) -> Option<&Region> {
        self.providers.get(&cell)
    }

    pub fn is_formula_cell(&self, cell: CellKey) -> bool {
        self.providers.contains_key(&cell)
    }

    /// Every recorded formula cell
    pub fn formula_cells(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.providers.keys().copied()
    }

    /// Formula cells of one sheet, row-major
    pub fn formula_cells_in(&self, sheet: SheetId) -> Vec<CellKey> {
        self.formula_index
            .get(&sheet)
            .map(|index| index.iter().map(|(pos, _)| CellKey::at(sheet, pos)).collect())
            .unwrap_or_default()
    }

    /// Formula cells located inside a rectangle
    pub fn formula_cells_within(&self, rect: &Rect, sheet: SheetId) -> Vec<CellKey> {
        self.formula_index
            .get(&sheet)
            .map(|index| {
                index
                    .entries_in(rect)
                    .map(|(pos, _)| CellKey::at(sheet, pos))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Formula cells whose references contain the given cell
    pub fn consuming_region(&self, cell: CellKey) -> Region {
        let mut region = Region::new();
        let Some(index) = self.consumers.get(&cell.sheet) else {
            return region;
        };
        let mut seen = AHashSet::new();
        for (_, consumer) in index.intersecting(Rect::from_position(cell.position())) {
            if seen.insert(*consumer) {
                region.add(Rect::from_position(consumer.position()), consumer.sheet);
            }
        }
        region
    }

    /// Formula cells whose references intersect any element of a region
    pub fn consumers_of(&self, region: &Region) -> Vec<CellKey> {
        let mut seen = AHashSet::new();
        let mut result = Vec::new();
        for element in region.valid_elements() {
            let Some(index) = self.consumers.get(&element.sheet) else {
                continue;
            };
            for (_, consumer) in index.intersecting(element.rect) {
                if seen.insert(*consumer) {
                    result.push(*consumer);
                }
            }
        }
        result
    }

    /// The parts of a region that some formula actually reads
    pub fn reduce_to_providing_region(&self, region: &Region) -> Region {
        let mut providing = Region::new();
        for element in region.valid_elements() {
            let Some(index) = self.consumers.get(&element.sheet) else {
                continue;
            };
            for (rect, _) in index.intersecting(element.rect) {
                if let Some(part) = rect.intersected(&element.rect) {
                    providing.add(part, element.sheet);
                }
            }
        }
        providing
    }

    /// Formula cells using a named area
    pub fn area_consumers(&self, name: &str) -> Vec<CellKey> {
        self.area_deps
            .get(&name.to_lowercase())
            .map(|cells| cells.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Formula cells reachable from `cell` through providers (backward) and
    /// through consumers (forward), excluding `cell` itself
    ///
    /// These are the cells whose circular flags become stale when `cell`
    /// changes its formula.
    pub fn cycle_neighbourhood(&self, cell: CellKey) -> Vec<CellKey> {
        let mut result = Vec::new();
        let mut collected = AHashSet::new();
        for forward in [false, true] {
            let mut seen = AHashSet::new();
            seen.insert(cell);
            let mut pending = self.neighbours(cell, forward);
            while let Some(next) = pending.pop() {
                if !seen.insert(next) {
                    continue;
                }
                if collected.insert(next) {
                    result.push(next);
                }
                pending.extend(self.neighbours(next, forward));
            }
        }
        result
    }

    fn neighbours(&self, cell: CellKey, forward: bool) -> Vec<CellKey> {
        if forward {
            self.consumer_cells(cell)
        } else {
            self.provider_formula_cells(cell)
        }
    }

    /// Formula cells inside the region a cell reads
    fn provider_formula_cells(&self, cell: CellKey) -> Vec<CellKey> {
        let Some(region) = self.providers.get(&cell) else {
            return Vec::new();
        };
        region
            .iter()
            .flat_map(|element| self.formula_cells_within(&element.rect, element.sheet))
            .collect()
    }

    fn consumer_cells(&self, cell: CellKey) -> Vec<CellKey> {
        self.consuming_region(cell)
            .iter()
            .map(|element| CellKey::at(element.sheet, element.rect.top_left()))
            .collect()
    }

    // === Depths ===

    /// Depth of every non-circular formula cell
    pub fn depths(&mut self) -> &AHashMap<CellKey, u32> {
        self.ensure_depths();
        &self.depths
    }

    pub fn depth(&mut self, cell: CellKey) -> Option<u32> {
        self.ensure_depths();
        self.depths.get(&cell).copied()
    }

    /// Formula cells that are part of a reference cycle
    pub fn circular_cells(&mut self) -> &AHashSet<CellKey> {
        self.ensure_depths();
        &self.circular
    }

    pub fn is_circular(&mut self, cell: CellKey) -> bool {
        self.ensure_depths();
        self.circular.contains(&cell)
    }

    /// Drop the cached depths
    pub fn invalidate_depths(&mut self) {
        self.depths_valid = false;
    }

    fn ensure_depths(&mut self) {
        if self.depths_valid {
            return;
        }
        self.compute_depths();
        self.depths_valid = true;
    }

    /// Longest path computation over the provider relation
    ///
    /// A cell reading nothing has depth 0. A cell reading only plain cells
    /// has depth 1. Otherwise its depth is one more than the deepest formula
    /// cell it reads. Cells on a cycle get no depth and count as depth 0 for
    /// the cells reading them.
    fn compute_depths(&mut self) {
        let mut depths: AHashMap<CellKey, u32> = AHashMap::with_capacity(self.providers.len());
        let mut circular: AHashSet<CellKey> = AHashSet::new();
        let mut done: AHashSet<CellKey> = AHashSet::with_capacity(self.providers.len());
        let mut on_path: AHashSet<CellKey> = AHashSet::new();

        let mut starts: Vec<CellKey> = self.providers.keys().copied().collect();
        starts.sort();

        for start in starts {
            if done.contains(&start) {
                continue;
            }
            let mut stack = vec![self.frame(start)];
            on_path.insert(start);

            while let Some(top) = stack.last_mut() {
                if top.next < top.deps.len() {
                    let dep = top.deps[top.next];
                    top.next += 1;

                    if done.contains(&dep) {
                        let below = depths.get(&dep).copied().unwrap_or(0);
                        top.depth = top.depth.max(below + 1);
                    } else if on_path.contains(&dep) {
                        top.depth = top.depth.max(1);
                        let from = stack
                            .iter()
                            .position(|frame| frame.cell == dep)
                            .unwrap_or(0);
                        for frame in &stack[from..] {
                            if circular.insert(frame.cell) {
                                tracing::debug!("circular dependency at {}", frame.cell);
                            }
                        }
                    } else {
                        on_path.insert(dep);
                        let frame = self.frame(dep);
                        stack.push(frame);
                    }
                    continue;
                }

                let Some(finished) = stack.pop() else {
                    break;
                };
                on_path.remove(&finished.cell);
                done.insert(finished.cell);
                let contribution = if circular.contains(&finished.cell) {
                    1
                } else {
                    depths.insert(finished.cell, finished.depth);
                    finished.depth + 1
                };
                if let Some(parent) = stack.last_mut() {
                    parent.depth = parent.depth.max(contribution);
                }
            }
        }

        tracing::trace!(
            "computed {} depths, {} circular cells",
            depths.len(),
            circular.len()
        );
        self.depths = depths;
        self.circular = circular;
    }

    /// Walk state for one cell: the formula cells it reads
    fn frame(&self, cell: CellKey) -> Frame {
        let region = self.providers.get(&cell);
        let reads_anything = region.is_some_and(|region| !region.is_empty());
        let deps = if reads_anything {
            self.provider_formula_cells(cell)
        } else {
            Vec::new()
        };
        Frame {
            cell,
            deps,
            next: 0,
            depth: u32::from(reads_anything),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use pretty_assertions::assert_eq;

    const SHEET: SheetId = SheetId(1);

    fn cell(s: &str) -> CellKey {
        CellKey::at(SHEET, Position::parse(s).unwrap())
    }

    fn reads(s: &str) -> Region {
        Region::from_rect(Rect::parse(s).unwrap(), SHEET)
    }

    #[test]
    fn test_depths_follow_longest_chain() {
        let mut graph = DependencyGraph::new();
        // A1 = 1.0, A2 = A1 + A1, A3 = A1 + A1 + A2
        graph.record_formula(cell("A1"), Region::new());
        graph.record_formula(cell("A2"), reads("A1"));
        let mut a3 = reads("A1");
        a3.add(Rect::parse("A2").unwrap(), SHEET);
        graph.record_formula(cell("A3"), a3);

        assert_eq!(graph.depth(cell("A1")), Some(0));
        assert_eq!(graph.depth(cell("A2")), Some(1));
        assert_eq!(graph.depth(cell("A3")), Some(2));
    }

    #[test]
    fn test_plain_cell_references_have_depth_one() {
        let mut graph = DependencyGraph::new();
        graph.record_formula(cell("B1"), reads("A1:A10"));
        assert_eq!(graph.depth(cell("B1")), Some(1));
    }

    #[test]
    fn test_depth_invariant_on_random_order() {
        let mut graph = DependencyGraph::new();
        graph.record_formula(cell("D1"), reads("C1"));
        graph.record_formula(cell("B1"), reads("A1"));
        graph.record_formula(cell("C1"), reads("A1:B1"));

        let depths = graph.depths().clone();
        for (consumer, depth) in &depths {
            let region = graph.providers(*consumer).cloned().unwrap_or_default();
            for element in region.iter() {
                for provider in graph.formula_cells_within(&element.rect, element.sheet) {
                    assert!(depths[&provider] < *depth);
                }
            }
        }
        assert_eq!(depths[&cell("D1")], 3);
    }

    #[test]
    fn test_cycle_cells_are_circular() {
        let mut graph = DependencyGraph::new();
        graph.record_formula(cell("A1"), reads("B1"));
        graph.record_formula(cell("B1"), reads("A1"));
        graph.record_formula(cell("C1"), reads("B1"));

        assert!(graph.is_circular(cell("A1")));
        assert!(graph.is_circular(cell("B1")));
        assert!(!graph.is_circular(cell("C1")));
        assert_eq!(graph.depth(cell("A1")), None);
        assert_eq!(graph.depth(cell("C1")), Some(1));
    }

    #[test]
    fn test_self_reference_is_circular() {
        let mut graph = DependencyGraph::new();
        graph.record_formula(cell("A1"), reads("A1:A3"));
        assert!(graph.is_circular(cell("A1")));
    }

    #[test]
    fn test_breaking_cycle_recomputes_depths() {
        let mut graph = DependencyGraph::new();
        graph.record_formula(cell("A1"), reads("B1"));
        graph.record_formula(cell("B1"), reads("A1"));
        assert_eq!(graph.circular_cells().len(), 2);

        graph.record_formula(cell("B1"), Region::new());
        assert!(graph.circular_cells().is_empty());
        assert_eq!(graph.depth(cell("A1")), Some(1));
    }

    #[test]
    fn test_consuming_region() {
        let mut graph = DependencyGraph::new();
        graph.record_formula(cell("C1"), reads("A1:A5"));
        graph.record_formula(cell("C2"), reads("A3"));

        let consumers = graph.consuming_region(cell("A3"));
        assert_eq!(consumers.len(), 2);
        assert!(consumers.contains(Position::parse("C1").unwrap(), SHEET));
        assert!(consumers.contains(Position::parse("C2").unwrap(), SHEET));
        assert!(graph.consuming_region(cell("B3")).is_empty());

        graph.remove_formula(cell("C1"));
        assert_eq!(graph.consuming_region(cell("A3")).len(), 1);
    }

    #[test]
    fn test_reduce_to_providing_region() {
        let mut graph = DependencyGraph::new();
        graph.record_formula(cell("C1"), reads("A1:A5"));

        let providing = graph.reduce_to_providing_region(&reads("A4:B9"));
        assert_eq!(providing.first_range(), Some(Rect::parse("A4:A5").unwrap()));
    }

    #[test]
    fn test_named_area_consumers() {
        let mut graph = DependencyGraph::new();
        graph.record_formula(cell("B1"), reads("A1:A3"));
        graph.record_named_areas(cell("B1"), ["Totals"]);

        assert_eq!(graph.area_consumers("totals"), vec![cell("B1")]);
        graph.remove_formula(cell("B1"));
        assert!(graph.area_consumers("Totals").is_empty());
    }

    #[test]
    fn test_remove_sheet() {
        let other = SheetId(2);
        let mut graph = DependencyGraph::new();
        graph.record_formula(CellKey::new(other, 1, 1), reads("A1"));
        graph.record_formula(cell("B1"), Region::from_rect(Rect::parse("A1").unwrap(), other));

        graph.remove_sheet(other);
        assert!(!graph.is_formula_cell(CellKey::new(other, 1, 1)));
        assert!(graph.consuming_region(cell("A1")).is_empty());
        assert!(graph.is_formula_cell(cell("B1")));
    }

    #[test]
    fn test_cycle_neighbourhood() {
        let mut graph = DependencyGraph::new();
        graph.record_formula(cell("A1"), reads("B1"));
        graph.record_formula(cell("B1"), reads("C1"));
        graph.record_formula(cell("C1"), reads("A1"));
        graph.record_formula(cell("D1"), reads("C1"));

        let mut around = graph.cycle_neighbourhood(cell("B1"));
        around.sort();
        assert_eq!(around, vec![cell("A1"), cell("C1"), cell("D1")]);
    }

    #[test]
    fn test_consumers_across_row_bands() {
        let mut graph = DependencyGraph::new();
        // one band, several bands, a whole column
        graph.record_formula(cell("Z1"), reads("A1:B10"));
        graph.record_formula(cell("Z2"), reads("B50:B300"));
        graph.record_formula(cell("Z3"), reads("C1:C1048576"));
        graph.record_formula(cell("Z4"), reads("A5000"));

        let mut found = graph.consumers_of(&reads("A1:C200"));
        found.sort();
        assert_eq!(found, vec![cell("Z1"), cell("Z2"), cell("Z3")]);
        assert_eq!(graph.consumers_of(&reads("B250")), vec![cell("Z2")]);
        assert_eq!(graph.consumers_of(&reads("A4000:A6000")), vec![cell("Z4")]);
        assert!(graph.consumers_of(&reads("D1:D9000")).is_empty());

        let providing = graph.reduce_to_providing_region(&reads("B100:B200"));
        assert_eq!(providing.len(), 1);

        graph.record_formula(cell("Z2"), reads("A5000"));
        assert!(graph.consumers_of(&reads("B250")).is_empty());
        let mut found = graph.consumers_of(&reads("A5000"));
        found.sort();
        assert_eq!(found, vec![cell("Z2"), cell("Z4")]);

        graph.remove_formula(cell("Z3"));
        assert!(graph.consumers_of(&reads("C700000")).is_empty());
    }

    fn span(a: u32, b: u32) -> (u32, u32) {
        (a.min(b), a.max(b))
    }

    proptest::proptest! {
        #[test]
        fn prop_consumers_match_a_full_scan(
            rects in proptest::collection::vec((1u32..20, 1u32..5000, 1u32..20, 1u32..5000), 1..30),
            query in (1u32..20, 1u32..5000, 1u32..20, 1u32..5000),
        ) {
            let mut graph = DependencyGraph::new();
            let mut recorded = Vec::new();
            for (i, (c1, r1, c2, r2)) in rects.into_iter().enumerate() {
                let (left, right) = span(c1, c2);
                let (top, bottom) = span(r1, r2);
                let rect = Rect::new(left, top, right, bottom);
                let key = CellKey::new(SHEET, 30, i as u32 + 1);
                graph.record_formula(key, Region::from_rect(rect, SHEET));
                recorded.push((rect, key));
            }
            let (left, right) = span(query.0, query.2);
            let (top, bottom) = span(query.1, query.3);
            let query = Rect::new(left, top, right, bottom);

            let mut expected: Vec<CellKey> = recorded
                .iter()
                .filter(|(rect, _)| rect.intersects(&query))
                .map(|(_, key)| *key)
                .collect();
            expected.sort();
            let mut found = graph.consumers_of(&Region::from_rect(query, SHEET));
            found.sort();
            proptest::prop_assert_eq!(found, expected);
        }
    }
}
