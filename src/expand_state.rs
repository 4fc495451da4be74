use std::collections::HashSet;

use crate::projector::{FlatId, FlatProjector};

/// Tracks which flat rows are expanded.
#[derive(Debug, Default)]
pub struct ExpansionState {
    expanded: HashSet<FlatId>,
}

impl ExpansionState {
    pub fn expand(&mut self, flat: FlatId) {
        self.expanded.insert(flat);
    }

    pub fn collapse(&mut self, flat: FlatId) {
        self.expanded.remove(&flat);
    }

    /// Flip a row. Returns whether it is expanded afterwards.
    pub fn toggle(&mut self, flat: FlatId) -> bool {
        if self.expanded.remove(&flat) {
            false
        } else {
            self.expanded.insert(flat);
            true
        }
    }

    /// Collapse this row and all its descendants.
    pub fn collapse_recursive(&mut self, flat: FlatId, projector: &FlatProjector) {
        self.expanded.remove(&flat);
        for id in projector.descendants(flat) {
            self.expanded.remove(id);
        }
    }

    pub fn expand_all(&mut self, projector: &FlatProjector) {
        self.expanded.extend(projector.order().iter().copied());
    }

    pub fn is_expanded(&self, flat: FlatId) -> bool {
        self.expanded.contains(&flat)
    }

    /// Expand every hidden row and collapse every other one.
    pub fn derive_from_hidden(&mut self, projector: &FlatProjector) {
        for (id, node) in projector.iter() {
            if node.is_hidden {
                self.expanded.insert(id);
            } else {
                self.expanded.remove(&id);
            }
        }
    }

    /// Forget rows the projector no longer knows.
    pub fn retain_live(&mut self, projector: &FlatProjector) {
        self.expanded.retain(|id| projector.contains(*id));
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    /// Reset all expansions.
    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }
}
