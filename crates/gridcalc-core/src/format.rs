//! Row and column formats

use std::collections::BTreeMap;

/// Formatting of one row
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowFormat {
    /// Custom height (None = sheet default)
    pub height: Option<f64>,
    /// Row is hidden
    pub hidden: bool,
    /// Row is hidden by a filter
    pub filtered: bool,
    /// Page break before this row
    pub page_break: bool,
}

impl RowFormat {
    pub fn with_height(height: f64) -> Self {
        Self {
            height: Some(height),
            ..Default::default()
        }
    }

    /// Check if this row has any custom settings
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Hidden by the user or by a filter
    pub fn is_hidden_or_filtered(&self) -> bool {
        self.hidden || self.filtered
    }
}

/// Formatting of one column
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnFormat {
    /// Custom width (None = sheet default)
    pub width: Option<f64>,
    /// Column is hidden
    pub hidden: bool,
    /// Column is hidden by a filter
    pub filtered: bool,
    /// Page break before this column
    pub page_break: bool,
}

impl ColumnFormat {
    pub fn with_width(width: f64) -> Self {
        Self {
            width: Some(width),
            ..Default::default()
        }
    }

    /// Check if this column has any custom settings
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_hidden_or_filtered(&self) -> bool {
        self.hidden || self.filtered
    }
}

/// Non-default formats of the rows or columns of a sheet, keyed by 1-based index
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormatTable<F> {
    entries: BTreeMap<u32, F>,
    max: u32,
}

impl<F: Clone + Default + PartialEq> FormatTable<F> {
    /// Create an empty table for indices `1..=max`
    pub fn new(max: u32) -> Self {
        Self {
            entries: BTreeMap::new(),
            max,
        }
    }

    /// Format at an index, or the default format
    pub fn get(&self, index: u32) -> F {
        self.entries.get(&index).cloned().unwrap_or_default()
    }

    /// Format at an index, if it is not the default one
    pub fn non_default(&self, index: u32) -> Option<&F> {
        self.entries.get(&index)
    }

    /// Set the format of an index, returning the previous one
    ///
    /// Default formats are not stored.
    pub fn set(&mut self, index: u32, format: F) -> F {
        if index == 0 || index > self.max {
            tracing::debug!("ignoring format for out of range index {}", index);
            return F::default();
        }
        let old = if format == F::default() {
            self.entries.remove(&index)
        } else {
            self.entries.insert(index, format)
        };
        old.unwrap_or_default()
    }

    /// Shift the formats at or after `at` by `count`
    ///
    /// Returns the formats pushed past the last index.
    pub fn insert(&mut self, at: u32, count: u32) -> Vec<(u32, F)> {
        let mut dropped = Vec::new();
        if count == 0 {
            return dropped;
        }
        let tail = self.entries.split_off(&at);
        for (index, format) in tail {
            let target = index as u64 + count as u64;
            if target > self.max as u64 {
                dropped.push((index, format));
            } else {
                self.entries.insert(target as u32, format);
            }
        }
        dropped
    }

    /// Drop the formats of `[at, at + count)` and shift the rest back
    ///
    /// Returns the dropped formats.
    pub fn remove(&mut self, at: u32, count: u32) -> Vec<(u32, F)> {
        if count == 0 {
            return Vec::new();
        }
        let mut tail = self.entries.split_off(&at);
        let after = tail.split_off(&at.saturating_add(count));
        for (index, format) in after {
            self.entries.insert(index - count, format);
        }
        tail.into_iter().collect()
    }

    /// Iterate non-default formats in index order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &F)> {
        self.entries.iter().map(|(index, format)| (*index, format))
    }

    /// Last index with a non-default format
    pub fn last_index(&self) -> Option<u32> {
        self.entries.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
