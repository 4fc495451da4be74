use std::collections::HashSet;

use crate::projector::{FlatId, FlatProjector};

/// Multi-select checklist over flat rows with descendant propagation.
#[derive(Debug, Default)]
pub struct SelectionSet {
    selected: HashSet<FlatId>,
    /// Row most recently checked through `toggle`, cleared when it is unchecked.
    checked: Option<FlatId>,
}

impl SelectionSet {
    pub fn is_selected(&self, flat: FlatId) -> bool {
        self.selected.contains(&flat)
    }

    pub fn select(&mut self, flat: FlatId) {
        self.selected.insert(flat);
    }

    pub fn checked(&self) -> Option<FlatId> {
        self.checked
    }

    /// Flip `flat` and apply its new state to every descendant.
    /// Returns whether `flat` ends up selected.
    pub fn toggle(&mut self, flat: FlatId, projector: &FlatProjector) -> bool {
        let now_selected = !self.selected.remove(&flat);
        let descendants = projector.descendants(flat);
        if now_selected {
            self.selected.insert(flat);
            self.selected.extend(descendants.iter().copied());
            self.checked = Some(flat);
        } else {
            for id in descendants {
                self.selected.remove(id);
            }
            self.checked = None;
        }
        now_selected
    }

    /// Every descendant of `flat` is selected. Vacuously true for leaves.
    pub fn descendants_all_selected(&self, flat: FlatId, projector: &FlatProjector) -> bool {
        projector
            .descendants(flat)
            .iter()
            .all(|id| self.selected.contains(id))
    }

    /// Some, but not all, descendants of `flat` are selected.
    pub fn descendants_partially_selected(&self, flat: FlatId, projector: &FlatProjector) -> bool {
        let descendants = projector.descendants(flat);
        let any = descendants.iter().any(|id| self.selected.contains(id));
        any && !descendants.iter().all(|id| self.selected.contains(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = FlatId> + '_ {
        self.selected.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Forget rows the projector no longer knows.
    pub fn retain_live(&mut self, projector: &FlatProjector) {
        self.selected.retain(|id| projector.contains(*id));
        if self.checked.is_some_and(|id| !projector.contains(id)) {
            self.checked = None;
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.checked = None;
    }
}
