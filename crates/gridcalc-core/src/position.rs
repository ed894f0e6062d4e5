//! Cell positions and rectangles
//!
//! Positions are 1-based: column 1 is `A`, row 1 is the first row. Column 0 or row 0
//! never addresses a cell and is used by callers as "no cell".

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell position (column, row), both 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// Column index (1 = A)
    pub col: u32,
    /// Row index (1 = first row)
    pub row: u32,
}

impl Position {
    /// Create a new position
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    /// Whether the position lies inside the sheet bounds
    pub fn is_valid(&self) -> bool {
        (1..=MAX_COLS).contains(&self.col) && (1..=MAX_ROWS).contains(&self.row)
    }

    /// Parse an A1-style position, ignoring `$` anchors
    ///
    /// # Examples
    /// ```
    /// use gridcalc_core::Position;
    ///
    /// let pos = Position::parse("B3").unwrap();
    /// assert_eq!(pos, Position::new(2, 3));
    ///
    /// let pos = Position::parse("$AA$10").unwrap();
    /// assert_eq!(pos, Position::new(27, 10));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let bytes = s.as_bytes();
        let mut pos = 0;
        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos == col_start {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }
        let col = letters_to_column(&s[col_start..pos])?;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }

        let row_str = &s[pos..];
        if row_str.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }
        let row: u32 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;
        if row == 0 || row > MAX_ROWS {
            return Err(Error::InvalidAddress(format!("row out of range in '{}'", s)));
        }

        Ok(Self { col, row })
    }

    /// Move by a signed offset, clamping to the sheet bounds
    pub fn offset(&self, dcol: i64, drow: i64) -> Self {
        Self {
            col: (self.col as i64 + dcol).clamp(1, MAX_COLS as i64) as u32,
            row: (self.row as i64 + drow).clamp(1, MAX_ROWS as i64) as u32,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_letters(self.col), self.row)
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<(u32, u32)> for Position {
    fn from((col, row): (u32, u32)) -> Self {
        Self::new(col, row)
    }
}

/// Convert a 1-based column index to letters (1 = A, 26 = Z, 27 = AA)
pub fn column_to_letters(col: u32) -> String {
    let mut result = String::new();
    let mut n = col;

    while n > 0 {
        n -= 1;
        let c = ((n % 26) as u8 + b'A') as char;
        result.insert(0, c);
        n /= 26;
    }

    result
}

/// Convert column letters to a 1-based index (A = 1, Z = 26, AA = 27)
pub fn letters_to_column(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(Error::InvalidAddress("empty column letters".into()));
    }

    let mut col: u64 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(Error::InvalidAddress(format!(
                "invalid column letter '{}'",
                c
            )));
        }
        col = col * 26 + (c.to_ascii_uppercase() as u64 - 'A' as u64 + 1);
        if col > MAX_COLS as u64 {
            return Err(Error::InvalidAddress(format!(
                "column '{}' out of range",
                letters
            )));
        }
    }

    Ok(col as u32)
}

/// An inclusive rectangle of cells
///
/// A rectangle with `left > right` or `top > bottom`, or touching column/row 0, is invalid.
/// Invalid rectangles are legal values: they stand for region elements that no longer resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Rect {
    /// The canonical invalid rectangle
    pub const INVALID: Rect = Rect {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    /// The whole sheet
    pub const SHEET: Rect = Rect {
        left: 1,
        top: 1,
        right: MAX_COLS,
        bottom: MAX_ROWS,
    };

    /// Create a rectangle from its edges (normalized so that left <= right, top <= bottom)
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    /// Rectangle spanning two corner positions
    pub fn from_corners(a: Position, b: Position) -> Self {
        Self::new(a.col, a.row, b.col, b.row)
    }

    /// Single-cell rectangle
    pub fn from_position(pos: Position) -> Self {
        Self::new(pos.col, pos.row, pos.col, pos.row)
    }

    /// Rectangle from an origin and a size (width/height at least 1)
    pub fn from_size(col: u32, row: u32, width: u32, height: u32) -> Self {
        Self {
            left: col,
            top: row,
            right: col + width.max(1) - 1,
            bottom: row + height.max(1) - 1,
        }
    }

    /// Whole columns `[col, col + count)`
    pub fn columns(col: u32, count: u32) -> Self {
        Self::new(col, 1, col + count.max(1) - 1, MAX_ROWS)
    }

    /// Whole rows `[row, row + count)`
    pub fn rows(row: u32, count: u32) -> Self {
        Self::new(1, row, MAX_COLS, row + count.max(1) - 1)
    }

    /// Parse "A1:C3" or a single "B2"
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((a, b)) => Ok(Self::from_corners(Position::parse(a)?, Position::parse(b)?)),
            None => Position::parse(s).map(Self::from_position),
        }
    }

    pub fn top_left(&self) -> Position {
        Position::new(self.left, self.top)
    }

    pub fn bottom_right(&self) -> Position {
        Position::new(self.right, self.bottom)
    }

    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }

    /// Number of cells covered
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Whether the rectangle addresses cells inside the sheet bounds
    pub fn is_valid(&self) -> bool {
        self.left >= 1
            && self.top >= 1
            && self.left <= self.right
            && self.top <= self.bottom
            && self.right <= MAX_COLS
            && self.bottom <= MAX_ROWS
    }

    /// Whether this is a single cell
    pub fn is_single_cell(&self) -> bool {
        self.left == self.right && self.top == self.bottom
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.col >= self.left && pos.col <= self.right && pos.row >= self.top && pos.row <= self.bottom
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.top >= self.top
            && other.bottom <= self.bottom
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.left <= other.right
            && self.right >= other.left
            && self.top <= other.bottom
            && self.bottom >= other.top
    }

    /// Intersection, if any
    pub fn intersected(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        Some(Rect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        })
    }

    /// Bounding rectangle of both
    pub fn united(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Move by a signed offset; `None` if the result leaves the sheet
    pub fn translated(&self, dcol: i64, drow: i64) -> Option<Rect> {
        let left = self.left as i64 + dcol;
        let top = self.top as i64 + drow;
        let right = self.right as i64 + dcol;
        let bottom = self.bottom as i64 + drow;
        if left < 1 || top < 1 || right > MAX_COLS as i64 || bottom > MAX_ROWS as i64 {
            return None;
        }
        Some(Rect {
            left: left as u32,
            top: top as u32,
            right: right as u32,
            bottom: bottom as u32,
        })
    }

    /// Clamp every edge into the sheet bounds
    pub fn clamped(&self) -> Rect {
        Rect::new(
            self.left.clamp(1, MAX_COLS),
            self.top.clamp(1, MAX_ROWS),
            self.right.clamp(1, MAX_COLS),
            self.bottom.clamp(1, MAX_ROWS),
        )
    }

    /// Remove `other` from this rectangle, returning the (at most four) remaining pieces
    ///
    /// Pieces are the full-width band above, the full-width band below, then the
    /// left and right parts of the middle band.
    pub fn subtract(&self, other: &Rect) -> Vec<Rect> {
        let Some(cut) = self.intersected(other) else {
            return vec![*self];
        };

        let mut pieces = Vec::with_capacity(4);
        if cut.top > self.top {
            pieces.push(Rect::new(self.left, self.top, self.right, cut.top - 1));
        }
        if cut.bottom < self.bottom {
            pieces.push(Rect::new(self.left, cut.bottom + 1, self.right, self.bottom));
        }
        if cut.left > self.left {
            pieces.push(Rect::new(self.left, cut.top, cut.left - 1, cut.bottom));
        }
        if cut.right < self.right {
            pieces.push(Rect::new(cut.right + 1, cut.top, self.right, cut.bottom));
        }
        pieces
    }

    /// Iterate every position, row by row
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let (left, right) = (self.left, self.right);
        (self.top..=self.bottom)
            .flat_map(move |row| (left..=right).map(move |col| Position::new(col, row)))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.top_left())
        } else {
            write!(f, "{}:{}", self.top_left(), self.bottom_right())
        }
    }
}

impl FromStr for Rect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
