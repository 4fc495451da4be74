use std::collections::{HashMap, HashSet};

use indextree::NodeId;
use tracing::debug;

use crate::error::Result;
use crate::expand_state::ExpansionState;
use crate::identity::IdentityMaps;
use crate::node::CategoryId;
use crate::tree::CategoryTree;

/// Handle of a flat row. Allocated monotonically, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlatId(u64);

impl FlatId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// One row of the linear view of the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFlatNode {
    pub category_id: CategoryId,
    pub parent_category_id: CategoryId,
    pub category_name: String,
    pub is_hidden: bool,
    /// Nesting depth, 0 for top-level categories.
    pub level: usize,
    /// The nested node had children when it was projected.
    pub expandable: bool,
}

/// Projects a `CategoryTree` into pre-order flat rows, reusing a row's handle
/// across projections as long as the nested node keeps its name.
#[derive(Debug, Default)]
pub struct FlatProjector {
    nodes: HashMap<FlatId, CategoryFlatNode>,
    order: Vec<FlatId>,
    positions: HashMap<FlatId, usize>,
    identity: IdentityMaps,
    next_flat: u64,
}

impl FlatProjector {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> FlatId {
        let id = FlatId(self.next_flat);
        self.next_flat += 1;
        id
    }

    /// Re-derive the flat rows from `tree`.
    pub fn project(&mut self, tree: &CategoryTree) -> &[FlatId] {
        let walked = tree.walk();
        let mut order = Vec::with_capacity(walked.len());
        let mut live = HashSet::with_capacity(walked.len());
        let mut allocated = 0usize;

        for (nested, level) in walked {
            let Some(data) = tree.get(nested) else {
                continue;
            };
            let expandable = tree.has_children(nested);

            let reusable = self.identity.flat(nested).filter(|flat| {
                self.nodes
                    .get(flat)
                    .is_some_and(|existing| existing.category_name == data.category_name)
            });

            let flat_id = match reusable {
                Some(flat_id) => {
                    if let Some(existing) = self.nodes.get_mut(&flat_id) {
                        existing.category_id = data.category_id;
                        existing.parent_category_id = data.parent_category_id;
                        existing.is_hidden = data.is_hidden;
                        existing.level = level;
                        existing.expandable = expandable;
                    }
                    flat_id
                }
                None => {
                    let flat_id = self.allocate();
                    allocated += 1;
                    self.nodes.insert(
                        flat_id,
                        CategoryFlatNode {
                            category_id: data.category_id,
                            parent_category_id: data.parent_category_id,
                            category_name: data.category_name.clone(),
                            is_hidden: data.is_hidden,
                            level,
                            expandable,
                        },
                    );
                    flat_id
                }
            };

            if let Some(superseded) = self.identity.register(flat_id, nested) {
                self.nodes.remove(&superseded);
            }
            live.insert(nested);
            order.push(flat_id);
        }

        for stale in self.identity.retain_nested(|nested| live.contains(&nested)) {
            self.nodes.remove(&stale);
        }

        self.positions = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        self.order = order;
        debug!(rows = self.order.len(), allocated, "projected category tree");
        &self.order
    }

    pub fn order(&self) -> &[FlatId] {
        &self.order
    }

    /// Rows in projection order. Calling it again restarts from the first row.
    pub fn iter(&self) -> impl Iterator<Item = (FlatId, &CategoryFlatNode)> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.nodes.get(id).map(|node| (*id, node)))
    }

    pub fn get(&self, flat: FlatId) -> Option<&CategoryFlatNode> {
        self.nodes.get(&flat)
    }

    pub fn contains(&self, flat: FlatId) -> bool {
        self.positions.contains_key(&flat)
    }

    pub fn position(&self, flat: FlatId) -> Option<usize> {
        self.positions.get(&flat).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn identity(&self) -> &IdentityMaps {
        &self.identity
    }

    pub fn resolve_nested(&self, flat: FlatId) -> Result<NodeId> {
        self.identity.resolve(flat)
    }

    pub fn flat_for(&self, nested: NodeId) -> Option<FlatId> {
        self.identity.flat(nested)
    }

    /// The rows following `flat` with a deeper level, up to the next row at
    /// the same or a shallower level. Empty for unknown handles.
    pub fn descendants(&self, flat: FlatId) -> &[FlatId] {
        let (Some(start), Some(node)) = (self.position(flat), self.get(flat)) else {
            return &[];
        };
        let level = node.level;
        let tail = &self.order[start + 1..];
        let end = tail
            .iter()
            .position(|id| self.nodes.get(id).map_or(true, |n| n.level <= level))
            .unwrap_or(tail.len());
        &tail[..end]
    }

    pub fn parent_of(&self, flat: FlatId) -> Option<FlatId> {
        let start = self.position(flat)?;
        let level = self.get(flat)?.level;
        if level == 0 {
            return None;
        }
        self.order[..start]
            .iter()
            .rev()
            .find(|id| self.nodes.get(id).is_some_and(|n| n.level < level))
            .copied()
    }

    /// Rows a flat tree view would show: a row is visible when every ancestor
    /// is expanded. With `show_hidden` off, hidden rows and everything below
    /// them are skipped.
    pub fn visible(&self, expansion: &ExpansionState, show_hidden: bool) -> Vec<FlatId> {
        let mut rows = Vec::new();
        let mut skip_below: Option<usize> = None;

        for (id, node) in self.iter() {
            if let Some(level) = skip_below {
                if node.level > level {
                    continue;
                }
                skip_below = None;
            }
            if node.is_hidden && !show_hidden {
                skip_below = Some(node.level);
                continue;
            }
            rows.push(id);
            if node.expandable && !expansion.is_expanded(id) {
                skip_below = Some(node.level);
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::CategoryNode;
    use crate::seed;

    fn names(projector: &FlatProjector, ids: &[FlatId]) -> Vec<String> {
        ids.iter()
            .map(|id| projector.get(*id).unwrap().category_name.clone())
            .collect()
    }

    fn school() -> CategoryTree {
        CategoryTree::from_nodes(&[
            CategoryNode::new(1, 0, "Staffs").with_children(vec![
                CategoryNode::new(2, 1, "Teachers")
                    .with_children(vec![CategoryNode::new(4, 2, "Maths")]),
                CategoryNode::new(3, 1, "Security"),
            ]),
            CategoryNode::new(5, 0, "Students")
                .hidden(true)
                .with_children(vec![CategoryNode::new(6, 5, "Alumni")]),
        ])
    }

    #[test]
    fn test_projection_levels_and_expandable() {
        let tree = CategoryTree::from_nodes(&seed::tree_data());
        let mut projector = FlatProjector::new();
        projector.project(&tree);

        let rows: Vec<(String, usize, bool)> = projector
            .iter()
            .map(|(_, n)| (n.category_name.clone(), n.level, n.expandable))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Staffs".to_string(), 0, true),
                ("Teachers".to_string(), 1, false),
                ("Security".to_string(), 1, false),
            ]
        );
    }

    #[test]
    fn test_reprojection_reuses_handles() {
        let tree = school();
        let mut projector = FlatProjector::new();
        let first = projector.project(&tree).to_vec();
        let second = projector.project(&tree).to_vec();

        assert_eq!(first, second);
        assert_eq!(projector.identity().len(), tree.len());
        assert!(projector.identity().is_consistent());
    }

    #[test]
    fn test_rename_allocates_new_handle_only_for_renamed() {
        let mut tree = school();
        let mut projector = FlatProjector::new();
        let before = projector.project(&tree).to_vec();

        let teachers = tree.find_by_id(2).unwrap();
        tree.rename(teachers, "Tutors");
        let after = projector.project(&tree).to_vec();

        for (i, (old, new)) in before.iter().zip(&after).enumerate() {
            if i == 1 {
                assert_ne!(old, new);
            } else {
                assert_eq!(old, new);
            }
        }
        assert!(projector.get(before[1]).is_none());
        assert!(projector.resolve_nested(before[1]).is_err());
        assert_eq!(projector.resolve_nested(after[1]).unwrap(), teachers);
        assert!(projector.identity().is_consistent());
    }

    #[test]
    fn test_hidden_flag_updates_in_place() {
        let mut tree = school();
        let mut projector = FlatProjector::new();
        let before = projector.project(&tree).to_vec();

        let staffs = tree.find_by_id(1).unwrap();
        tree.set_hidden(staffs, true);
        let after = projector.project(&tree).to_vec();

        assert_eq!(before, after);
        assert!(projector.get(after[0]).unwrap().is_hidden);
    }

    #[test]
    fn test_replaced_tree_drops_old_rows() {
        let mut tree = school();
        let mut projector = FlatProjector::new();
        let before = projector.project(&tree).to_vec();

        tree.replace(&seed::tree_data());
        let after = projector.project(&tree).to_vec();

        assert_eq!(after.len(), 3);
        assert!(before.iter().all(|id| !projector.contains(*id)));
        assert_eq!(projector.identity().len(), 3);
        assert!(projector.identity().is_consistent());
    }

    #[test]
    fn test_descendants_and_parent() {
        let tree = school();
        let mut projector = FlatProjector::new();
        let order = projector.project(&tree).to_vec();

        assert_eq!(
            names(&projector, projector.descendants(order[0])),
            vec!["Teachers", "Maths", "Security"]
        );
        assert_eq!(names(&projector, projector.descendants(order[1])), vec!["Maths"]);
        assert!(projector.descendants(order[3]).is_empty());
        assert_eq!(projector.parent_of(order[2]), Some(order[1]));
        assert_eq!(projector.parent_of(order[3]), Some(order[0]));
        assert_eq!(projector.parent_of(order[4]), None);
        assert!(projector.descendants(FlatId::new(999)).is_empty());
    }

    #[test]
    fn test_visible_respects_expansion_and_hidden() {
        let tree = school();
        let mut projector = FlatProjector::new();
        let order = projector.project(&tree).to_vec();
        let mut expansion = ExpansionState::default();

        assert_eq!(
            names(&projector, &projector.visible(&expansion, true)),
            vec!["Staffs", "Students"]
        );
        assert_eq!(names(&projector, &projector.visible(&expansion, false)), vec!["Staffs"]);

        expansion.expand(order[0]);
        expansion.expand(order[4]);
        assert_eq!(
            names(&projector, &projector.visible(&expansion, true)),
            vec!["Staffs", "Teachers", "Security", "Students", "Alumni"]
        );
        assert_eq!(
            names(&projector, &projector.visible(&expansion, false)),
            vec!["Staffs", "Teachers", "Security"]
        );
    }
}
