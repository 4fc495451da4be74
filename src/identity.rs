use std::collections::HashMap;

use indextree::NodeId;
use tracing::error;

use crate::error::{CategoryError, Result};
use crate::projector::FlatId;

/// Paired lookup tables between flat rows and the nested nodes they project.
///
/// Every `(flat, nested)` pair is present in both directions or in neither.
#[derive(Debug, Default)]
pub struct IdentityMaps {
    flat_to_nested: HashMap<FlatId, NodeId>,
    nested_to_flat: HashMap<NodeId, FlatId>,
}

impl IdentityMaps {
    /// Record `flat <-> nested`. Any flat node previously standing for
    /// `nested` is unlinked and returned so the caller can drop it.
    pub fn register(&mut self, flat: FlatId, nested: NodeId) -> Option<FlatId> {
        let mut superseded = None;
        if let Some(old_flat) = self.nested_to_flat.insert(nested, flat) {
            if old_flat != flat {
                self.flat_to_nested.remove(&old_flat);
                superseded = Some(old_flat);
            }
        }
        if let Some(old_nested) = self.flat_to_nested.insert(flat, nested) {
            if old_nested != nested && self.nested_to_flat.get(&old_nested) == Some(&flat) {
                self.nested_to_flat.remove(&old_nested);
            }
        }
        superseded
    }

    pub fn nested(&self, flat: FlatId) -> Option<NodeId> {
        self.flat_to_nested.get(&flat).copied()
    }

    pub fn flat(&self, nested: NodeId) -> Option<FlatId> {
        self.nested_to_flat.get(&nested).copied()
    }

    /// Like `nested`, but an unknown handle is a contract violation.
    pub fn resolve(&self, flat: FlatId) -> Result<NodeId> {
        match self.nested(flat) {
            Some(nested) => Ok(nested),
            None => {
                error!(?flat, "flat node has no nested counterpart");
                Err(CategoryError::IdentityMismatch(flat))
            }
        }
    }

    /// Drop every pair whose nested node fails `keep`. Returns the flat ids
    /// that were unlinked.
    pub fn retain_nested(&mut self, mut keep: impl FnMut(NodeId) -> bool) -> Vec<FlatId> {
        let mut removed = Vec::new();
        self.nested_to_flat.retain(|&nested, &mut flat| {
            let kept = keep(nested);
            if !kept {
                removed.push(flat);
            }
            kept
        });
        for flat in &removed {
            self.flat_to_nested.remove(flat);
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (FlatId, NodeId)> + '_ {
        self.flat_to_nested.iter().map(|(&flat, &nested)| (flat, nested))
    }

    pub fn len(&self) -> usize {
        self.flat_to_nested.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flat_to_nested.is_empty()
    }

    pub fn clear(&mut self) {
        self.flat_to_nested.clear();
        self.nested_to_flat.clear();
    }

    /// Both tables hold exactly the same pairs.
    pub fn is_consistent(&self) -> bool {
        self.flat_to_nested.len() == self.nested_to_flat.len()
            && self
                .flat_to_nested
                .iter()
                .all(|(flat, nested)| self.nested_to_flat.get(nested) == Some(flat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indextree::Arena;

    fn handles(n: usize) -> Vec<NodeId> {
        let mut arena = Arena::new();
        (0..n).map(|i| arena.new_node(i)).collect()
    }

    #[test]
    fn test_register_and_lookup() {
        let nodes = handles(2);
        let mut maps = IdentityMaps::default();

        assert_eq!(maps.register(FlatId::new(1), nodes[0]), None);
        assert_eq!(maps.register(FlatId::new(2), nodes[1]), None);

        assert_eq!(maps.nested(FlatId::new(1)), Some(nodes[0]));
        assert_eq!(maps.flat(nodes[1]), Some(FlatId::new(2)));
        assert!(maps.is_consistent());
    }

    #[test]
    fn test_replacing_flat_for_nested_unlinks_old() {
        let nodes = handles(1);
        let mut maps = IdentityMaps::default();
        maps.register(FlatId::new(1), nodes[0]);

        let superseded = maps.register(FlatId::new(7), nodes[0]);

        assert_eq!(superseded, Some(FlatId::new(1)));
        assert_eq!(maps.nested(FlatId::new(1)), None);
        assert_eq!(maps.len(), 1);
        assert!(maps.is_consistent());
    }

    #[test]
    fn test_resolve_unknown_is_mismatch() {
        let maps = IdentityMaps::default();
        let err = maps.resolve(FlatId::new(3)).unwrap_err();
        assert!(matches!(err, CategoryError::IdentityMismatch(id) if id == FlatId::new(3)));
    }

    #[test]
    fn test_retain_nested() {
        let nodes = handles(3);
        let mut maps = IdentityMaps::default();
        for (i, node) in nodes.iter().enumerate() {
            maps.register(FlatId::new(i as u64), *node);
        }

        let removed = maps.retain_nested(|n| n != nodes[1]);

        assert_eq!(removed, vec![FlatId::new(1)]);
        assert_eq!(maps.len(), 2);
        assert!(maps.is_consistent());
    }
}
