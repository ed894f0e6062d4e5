//! Cell styles with substyle overlay
//!
//! A [`Style`] holds optional attributes. Styles are applied to rectangles as
//! substyles: the effective style of a cell merges every substyle covering it
//! in the order they were applied, so a later substyle only overrides the
//! attributes it actually sets.

use ahash::AHashMap;

use crate::position::{Position, Rect};
use crate::store::{RectStorage, RectUndo};

/// RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0x000000);
    pub const WHITE: Color = Color(0xFFFFFF);

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }
}

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizontalAlignment {
    Left,
    Center,
    Right,
    Justified,
}

/// Vertical text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalAlignment {
    Top,
    Middle,
    Bottom,
}

/// Border line style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderLineStyle {
    #[default]
    None,
    Solid,
    Dashed,
    Dotted,
    Double,
}

/// One border edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BorderPen {
    pub style: BorderLineStyle,
    pub width: u8,
    pub color: Option<Color>,
}

impl BorderPen {
    pub fn solid(width: u8, color: Color) -> Self {
        Self {
            style: BorderLineStyle::Solid,
            width,
            color: Some(color),
        }
    }
}

/// A set of optional cell formatting attributes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Style {
    // Font
    pub font_family: Option<String>,
    pub font_size: Option<u32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub font_color: Option<Color>,

    // Fill
    pub background_color: Option<Color>,

    // Alignment
    pub horizontal_alignment: Option<HorizontalAlignment>,
    pub vertical_alignment: Option<VerticalAlignment>,
    pub wrap_text: Option<bool>,
    pub indent: Option<u16>,

    // Borders
    pub left_border: Option<BorderPen>,
    pub right_border: Option<BorderPen>,
    pub top_border: Option<BorderPen>,
    pub bottom_border: Option<BorderPen>,

    pub number_format: Option<String>,

    // Protection
    pub not_protected: Option<bool>,
    pub hide_formula: Option<bool>,
}

macro_rules! overlay {
    ($self:ident, $other:ident, $($field:ident),* $(,)?) => {
        $(
            if $other.$field.is_some() {
                $self.$field = $other.$field.clone();
            }
        )*
    };
}

impl Style {
    /// Create a style with no attribute set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no attribute is set
    pub fn is_default(&self) -> bool {
        *self == Style::default()
    }

    /// Overlay `other` on top of this style; attributes `other` sets win
    pub fn merge(&mut self, other: &Style) {
        overlay!(
            self,
            other,
            font_family,
            font_size,
            bold,
            italic,
            underline,
            font_color,
            background_color,
            horizontal_alignment,
            vertical_alignment,
            wrap_text,
            indent,
            left_border,
            right_border,
            top_border,
            bottom_border,
            number_format,
            not_protected,
            hide_formula,
        );
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    pub fn with_font_size(mut self, size: u32) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn with_font_family<S: Into<String>>(mut self, family: S) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn with_background_color(mut self, color: Color) -> Self {
        self.background_color = Some(color);
        self
    }

    pub fn with_horizontal_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.horizontal_alignment = Some(alignment);
        self
    }

    pub fn with_wrap_text(mut self, wrap: bool) -> Self {
        self.wrap_text = Some(wrap);
        self
    }

    pub fn with_number_format<S: Into<String>>(mut self, format: S) -> Self {
        self.number_format = Some(format.into());
        self
    }

    pub fn with_border(mut self, pen: BorderPen) -> Self {
        self.left_border = Some(pen);
        self.right_border = Some(pen);
        self.top_border = Some(pen);
        self.bottom_border = Some(pen);
        self
    }
}

/// Index of a substyle in a [`StylePool`]
pub type StyleId = u32;

/// Deduplicating pool of substyles
#[derive(Debug, Clone, Default)]
pub struct StylePool {
    styles: Vec<Style>,
    index_map: AHashMap<Style, StyleId>,
}

impl StylePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a substyle, returning its id
    pub fn get_or_insert(&mut self, style: Style) -> StyleId {
        if let Some(&id) = self.index_map.get(&style) {
            return id;
        }
        let id = self.styles.len() as StyleId;
        self.index_map.insert(style.clone(), id);
        self.styles.push(style);
        id
    }

    pub fn get(&self, id: StyleId) -> Option<&Style> {
        self.styles.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// Rectangle-scoped substyles of one sheet
#[derive(Debug, Clone, Default)]
pub struct StyleStorage {
    pool: StylePool,
    rects: RectStorage<StyleId>,
}

impl StyleStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective style at a position (default style if nothing applies)
    pub fn get(&self, pos: Position) -> Style {
        let mut style = Style::default();
        for id in self.rects.values_at(pos) {
            if let Some(sub) = self.pool.get(*id) {
                style.merge(sub);
            }
        }
        style
    }

    /// Whether any substyle covers a position
    pub fn has_style(&self, pos: Position) -> bool {
        self.rects.get(pos).is_some()
    }

    /// Apply a substyle to a rectangle
    pub fn insert(&mut self, rect: Rect, style: Style) {
        if style.is_default() {
            return;
        }
        let id = self.pool.get_or_insert(style);
        self.rects.insert(rect, id);
    }

    /// Remove every substyle from a rectangle
    pub fn remove(&mut self, rect: &Rect) {
        self.rects.remove(rect);
    }

    pub fn rects(&self) -> &RectStorage<StyleId> {
        &self.rects
    }

    pub fn rects_mut(&mut self) -> &mut RectStorage<StyleId> {
        &mut self.rects
    }

    pub fn pool(&self) -> &StylePool {
        &self.pool
    }

    pub fn undo_data(&self, rect: &Rect) -> RectUndo<StyleId> {
        self.rects.undo_data(rect)
    }

    pub fn restore(&mut self, undo: &RectUndo<StyleId>) -> RectUndo<StyleId> {
        self.rects.restore(undo)
    }

    /// Copy of the substyles inside `rect`, renumbered; shares the pool contents
    pub fn sub_storage(&self, rect: &Rect) -> Self {
        Self {
            pool: self.pool.clone(),
            rects: self.rects.sub_storage(rect),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substyle_overlay() {
        let mut storage = StyleStorage::new();
        storage.insert(
            Rect::new(1, 1, 4, 4),
            Style::new().with_bold(true).with_font_size(10),
        );
        storage.insert(Rect::new(2, 2, 2, 2), Style::new().with_font_size(14));

        let style = storage.get(Position::new(2, 2));
        assert_eq!(style.bold, Some(true));
        assert_eq!(style.font_size, Some(14));

        let style = storage.get(Position::new(1, 1));
        assert_eq!(style.font_size, Some(10));

        assert!(storage.get(Position::new(9, 9)).is_default());
    }

    #[test]
    fn test_pool_deduplicates() {
        let mut pool = StylePool::new();
        let a = pool.get_or_insert(Style::new().with_italic(true));
        let b = pool.get_or_insert(Style::new().with_italic(true));
        let c = pool.get_or_insert(Style::new().with_italic(false));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_default_style_is_not_stored() {
        let mut storage = StyleStorage::new();
        storage.insert(Rect::new(1, 1, 1, 1), Style::new());
        assert!(storage.rects().is_empty());
        assert!(!storage.has_style(Position::new(1, 1)));
    }
}
