//! Map-level settings

/// Map-level settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapSettings {
    /// Width of columns without a custom width
    pub default_column_width: f64,
    /// Height of rows without a custom height
    pub default_row_height: f64,
    /// Whether new sheets recalculate automatically
    pub auto_calculation: bool,
    /// Smallest width or height a resize may set
    pub minimum_size: f64,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            default_column_width: 60.0,
            default_row_height: 20.0,
            auto_calculation: true,
            minimum_size: 2.0,
        }
    }
}

impl MapSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_column_width(mut self, width: f64) -> Self {
        self.default_column_width = width;
        self
    }

    pub fn with_default_row_height(mut self, height: f64) -> Self {
        self.default_row_height = height;
        self
    }

    pub fn with_auto_calculation(mut self, enabled: bool) -> Self {
        self.auto_calculation = enabled;
        self
    }

    pub fn with_minimum_size(mut self, size: f64) -> Self {
        self.minimum_size = size;
        self
    }
}
