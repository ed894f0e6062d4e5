//! Change notifications for the presentation layer
//!
//! Mutating operations push [`DamageEvent`]s into a [`DamageSink`]. The
//! default sink is a [`DamageQueue`] that the caller drains after each call.

use crate::region::{Region, SheetId};

/// What changed in a damaged region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DamageKind {
    /// Cell values changed
    Value,
    /// Formulas changed
    Formula,
    /// Formatting, sizes or visibility changed
    Appearance,
    /// Data bindings changed
    Binding,
    /// Rows, columns or sheets were inserted or removed
    Structure,
}

/// One change notification
#[derive(Debug, Clone, PartialEq)]
pub struct DamageEvent {
    pub sheet: SheetId,
    pub region: Region,
    pub kind: DamageKind,
}

/// Receiver of change notifications
pub trait DamageSink {
    fn add_damage(&mut self, sheet: SheetId, region: Region, kind: DamageKind);
}

/// Queue of pending change notifications
#[derive(Debug, Clone, Default)]
pub struct DamageQueue {
    events: Vec<DamageEvent>,
}

impl DamageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every pending event
    pub fn drain(&mut self) -> Vec<DamageEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[DamageEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl DamageSink for DamageQueue {
    fn add_damage(&mut self, sheet: SheetId, region: Region, kind: DamageKind) {
        if region.is_empty() {
            return;
        }
        tracing::trace!("{:?} damage on {}", kind, sheet);
        self.events.push(DamageEvent {
            sheet,
            region,
            kind,
        });
    }
}
