//! Storage-level undo data
//!
//! While recording is active, a [`CellStorage`] collects the pre-image of
//! every position (or rectangle) it mutates, one delta per attribute store.
//! Stopping the recording materializes the non-empty deltas as children of a
//! [`CompositeUndo`].

use crate::attributes::{Binding, Conditions, Database, Formula, Validity};
use crate::cell_storage::CellStorage;
use crate::position::Position;
use crate::store::{PositionKeyedStore, RectStorage, RectUndo};
use crate::style::StyleId;
use crate::value::Value;

/// Pre-images of a point store: `None` means the position was empty
#[derive(Debug, Clone, PartialEq)]
pub struct PointDelta<T> {
    entries: Vec<(Position, Option<T>)>,
}

impl<T> Default for PointDelta<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Clone> PointDelta<T> {
    pub fn record(&mut self, pos: Position, old: Option<T>) {
        self.entries.push((pos, old));
    }

    /// Record entries that were removed from the store
    pub fn record_removed(&mut self, removed: Vec<(Position, T)>) {
        self.entries
            .extend(removed.into_iter().map(|(pos, value)| (pos, Some(value))));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[(Position, Option<T>)] {
        &self.entries
    }

    /// Write the pre-images back, latest first, returning the delta that reverts this
    pub fn apply(&self, store: &mut PositionKeyedStore<T>) -> PointDelta<T> {
        let mut inverse = PointDelta::default();
        for (pos, old) in self.entries.iter().rev() {
            let current = match old {
                Some(value) => store.set(*pos, value.clone()),
                None => store.take(*pos),
            };
            inverse.entries.push((*pos, current));
        }
        inverse
    }
}

/// Pre-images of a rectangle store
#[derive(Debug, Clone, PartialEq)]
pub struct RectDelta<T> {
    entries: Vec<RectUndo<T>>,
}

impl<T> Default for RectDelta<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Clone + PartialEq> RectDelta<T> {
    pub fn record(&mut self, snapshot: RectUndo<T>) {
        self.entries.push(snapshot);
    }

    /// Record whole pairs that were dropped from the store
    pub fn record_removed(&mut self, removed: Vec<(crate::Rect, T)>) {
        for (rect, value) in removed {
            self.entries.push(RectUndo {
                rect,
                pairs: vec![(rect, value)],
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Restore the snapshots, latest first, returning the delta that reverts this
    pub fn apply(&self, storage: &mut RectStorage<T>) -> RectDelta<T> {
        let mut inverse = RectDelta::default();
        for snapshot in self.entries.iter().rev() {
            inverse.entries.push(storage.restore(snapshot));
        }
        inverse
    }
}

/// The recorded changes of one attribute store
#[derive(Debug, Clone, PartialEq)]
pub enum UndoDelta {
    Values(PointDelta<Value>),
    Formulas(PointDelta<Formula>),
    Links(PointDelta<String>),
    UserInputs(PointDelta<String>),
    RichTexts(PointDelta<String>),
    Bindings(RectDelta<Binding>),
    Comments(RectDelta<String>),
    Conditions(RectDelta<Conditions>),
    Databases(RectDelta<Database>),
    NamedAreas(RectDelta<String>),
    Fusions(RectDelta<bool>),
    Matrices(RectDelta<bool>),
    Styles(RectDelta<StyleId>),
    Validities(RectDelta<Validity>),
}

impl UndoDelta {
    /// Name of the store this delta belongs to
    pub fn store_name(&self) -> &'static str {
        match self {
            UndoDelta::Values(_) => "values",
            UndoDelta::Formulas(_) => "formulas",
            UndoDelta::Links(_) => "links",
            UndoDelta::UserInputs(_) => "user input",
            UndoDelta::RichTexts(_) => "rich text",
            UndoDelta::Bindings(_) => "bindings",
            UndoDelta::Comments(_) => "comments",
            UndoDelta::Conditions(_) => "conditions",
            UndoDelta::Databases(_) => "databases",
            UndoDelta::NamedAreas(_) => "named areas",
            UndoDelta::Fusions(_) => "fusions",
            UndoDelta::Matrices(_) => "matrices",
            UndoDelta::Styles(_) => "styles",
            UndoDelta::Validities(_) => "validities",
        }
    }
}

/// Deltas collected during one recording, one per store
#[derive(Debug, Clone, Default)]
pub(crate) struct UndoRecorder {
    pub values: PointDelta<Value>,
    pub formulas: PointDelta<Formula>,
    pub links: PointDelta<String>,
    pub user_inputs: PointDelta<String>,
    pub rich_texts: PointDelta<String>,
    pub bindings: RectDelta<Binding>,
    pub comments: RectDelta<String>,
    pub conditions: RectDelta<Conditions>,
    pub databases: RectDelta<Database>,
    pub named_areas: RectDelta<String>,
    pub fusions: RectDelta<bool>,
    pub matrices: RectDelta<bool>,
    pub styles: RectDelta<StyleId>,
    pub validities: RectDelta<Validity>,
}

impl UndoRecorder {
    /// One delta per store that actually changed
    pub fn into_children(self) -> Vec<UndoDelta> {
        let mut children = Vec::new();
        macro_rules! push_non_empty {
            ($($field:ident => $variant:ident),* $(,)?) => {
                $(
                    if !self.$field.is_empty() {
                        children.push(UndoDelta::$variant(self.$field));
                    }
                )*
            };
        }
        push_non_empty!(
            values => Values,
            formulas => Formulas,
            links => Links,
            user_inputs => UserInputs,
            rich_texts => RichTexts,
            bindings => Bindings,
            comments => Comments,
            conditions => Conditions,
            databases => Databases,
            named_areas => NamedAreas,
            fusions => Fusions,
            matrices => Matrices,
            styles => Styles,
            validities => Validities,
        );
        children
    }
}

/// A reversible group of store deltas
///
/// `undo` applies the children in reverse order and keeps their inverses;
/// `redo` applies those inverses in forward order. The children themselves
/// are never consumed, so a composite can be undone and redone repeatedly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeUndo {
    children: Vec<UndoDelta>,
    redo: Vec<UndoDelta>,
}

impl CompositeUndo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, child: UndoDelta) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[UndoDelta] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Revert the recorded changes
    pub fn undo(&mut self, storage: &mut CellStorage) {
        self.redo = self
            .children
            .iter()
            .rev()
            .map(|child| storage.apply_delta(child))
            .collect();
    }

    /// Re-apply the changes reverted by the last `undo`
    pub fn redo(&mut self, storage: &mut CellStorage) {
        for inverse in self.redo.iter().rev() {
            storage.apply_delta(inverse);
        }
        self.redo.clear();
    }
}
