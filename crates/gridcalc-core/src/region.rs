//! Sheet ids, cell handles and regions

use crate::position::{Position, Rect};
use std::fmt;

/// Stable identifier of a sheet inside a map
///
/// Ids are never reused, so a stale id in a region simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetId(pub u32);

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sheet#{}", self.0)
    }
}

/// A logical handle to one cell of one sheet
///
/// Field order gives a row-major ordering within a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub sheet: SheetId,
    pub row: u32,
    pub col: u32,
}

impl CellKey {
    /// Create a new cell key
    pub fn new(sheet: SheetId, col: u32, row: u32) -> Self {
        Self { sheet, row, col }
    }

    /// Create from a sheet and a position
    pub fn at(sheet: SheetId, pos: Position) -> Self {
        Self::new(sheet, pos.col, pos.row)
    }

    pub fn position(&self) -> Position {
        Position::new(self.col, self.row)
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.position())
    }
}

/// One rectangle of a region, tagged with its sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionElement {
    pub rect: Rect,
    pub sheet: SheetId,
}

impl RegionElement {
    pub fn is_valid(&self) -> bool {
        self.rect.is_valid()
    }
}

/// A possibly non-contiguous set of rectangles, each tagged with its sheet
///
/// Elements keep their insertion order; the first element defines the
/// region's first range and first sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    elements: Vec<RegionElement>,
}

impl Region {
    /// Create an empty region
    pub fn new() -> Self {
        Self::default()
    }

    /// Region with a single rectangle
    pub fn from_rect(rect: Rect, sheet: SheetId) -> Self {
        let mut region = Self::new();
        region.add(rect, sheet);
        region
    }

    /// Region with a single cell
    pub fn from_position(pos: Position, sheet: SheetId) -> Self {
        Self::from_rect(Rect::from_position(pos), sheet)
    }

    /// Region covering one cell key
    pub fn from_cell(cell: CellKey) -> Self {
        Self::from_position(cell.position(), cell.sheet)
    }

    /// Append a rectangle (kept even when invalid, so setters can skip it)
    pub fn add(&mut self, rect: Rect, sheet: SheetId) -> &mut Self {
        self.elements.push(RegionElement { rect, sheet });
        self
    }

    /// Append every element of another region
    pub fn add_region(&mut self, other: &Region) -> &mut Self {
        self.elements.extend_from_slice(&other.elements);
        self
    }

    /// Builder form of [`Region::add`]
    pub fn with(mut self, rect: Rect, sheet: SheetId) -> Self {
        self.add(rect, sheet);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether every element addresses cells inside the sheet bounds
    pub fn is_valid(&self) -> bool {
        !self.elements.is_empty() && self.elements.iter().all(RegionElement::is_valid)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn elements(&self) -> &[RegionElement] {
        &self.elements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RegionElement> {
        self.elements.iter()
    }

    /// Valid elements only
    pub fn valid_elements(&self) -> impl Iterator<Item = &RegionElement> {
        self.elements.iter().filter(|e| e.is_valid())
    }

    /// Rectangle of the first element
    pub fn first_range(&self) -> Option<Rect> {
        self.elements.first().map(|e| e.rect)
    }

    /// Sheet of the first element
    pub fn first_sheet(&self) -> Option<SheetId> {
        self.elements.first().map(|e| e.sheet)
    }

    /// Bounding rectangle of all valid elements (ignoring sheets)
    pub fn bounding_rect(&self) -> Option<Rect> {
        self.valid_elements()
            .map(|e| e.rect)
            .reduce(|acc, rect| acc.united(&rect))
    }

    pub fn contains(&self, pos: Position, sheet: SheetId) -> bool {
        self.valid_elements()
            .any(|e| e.sheet == sheet && e.rect.contains(pos))
    }

    pub fn contains_cell(&self, cell: CellKey) -> bool {
        self.contains(cell.position(), cell.sheet)
    }

    pub fn intersects(&self, rect: &Rect, sheet: SheetId) -> bool {
        self.valid_elements()
            .any(|e| e.sheet == sheet && e.rect.intersects(rect))
    }

    /// Every cell of every valid element, element by element, row by row
    ///
    /// Overlapping elements yield their shared cells more than once.
    pub fn cells(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.valid_elements().flat_map(|e| {
            let sheet = e.sheet;
            e.rect.positions().map(move |pos| CellKey::at(sheet, pos))
        })
    }
}

impl FromIterator<RegionElement> for Region {
    fn from_iter<I: IntoIterator<Item = RegionElement>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Region {
    type Item = &'a RegionElement;
    type IntoIter = std::slice::Iter<'a, RegionElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
