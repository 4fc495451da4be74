use indextree::{Arena, NodeEdge, NodeId};
use tracing::debug;

use crate::node::{CategoryId, CategoryNode, ROOT_PARENT_ID};

/// Scalar data held by each arena slot. Children live in the arena links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub category_id: CategoryId,
    pub parent_category_id: CategoryId,
    pub category_name: String,
    pub is_hidden: bool,
}

impl Category {
    fn from_node(node: &CategoryNode) -> Self {
        Self {
            category_id: node.category_id,
            parent_category_id: node.parent_category_id,
            category_name: node.category_name.clone(),
            is_hidden: node.is_hidden,
        }
    }
}

/// Live category taxonomy stored in an arena under a hidden sentinel root.
///
/// The top-level categories are the sentinel's children. A `NodeId` is the
/// identity of a nested node for as long as it stays attached. Replaced
/// subtrees are freed; a stale handle keeps its old stamp, so it never
/// resolves to whatever later reuses its slot.
pub struct CategoryTree {
    arena: Arena<Category>,
    root: NodeId,
}

impl Default for CategoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryTree {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(Category {
            category_id: ROOT_PARENT_ID,
            parent_category_id: ROOT_PARENT_ID,
            category_name: String::new(),
            is_hidden: false,
        });
        Self { arena, root }
    }

    pub fn from_nodes(nodes: &[CategoryNode]) -> Self {
        let mut tree = Self::new();
        for node in nodes {
            tree.attach_subtree(tree.root, node);
        }
        tree
    }

    /// Swap in a whole new top-level sequence. Every previously issued handle
    /// stops being part of the tree and the old subtrees are freed.
    pub fn replace(&mut self, nodes: &[CategoryNode]) {
        let old: Vec<NodeId> = self.root.children(&self.arena).collect();
        for id in old {
            id.remove_subtree(&mut self.arena);
        }
        for node in nodes {
            self.attach_subtree(self.root, node);
        }
        debug!(top_level = nodes.len(), "category tree replaced");
    }

    fn attach_subtree(&mut self, parent: NodeId, node: &CategoryNode) -> NodeId {
        let id = self.arena.new_node(Category::from_node(node));
        parent.append(id, &mut self.arena);
        for child in &node.children {
            self.attach_subtree(id, child);
        }
        id
    }

    /// True while `node` is attached below the sentinel root.
    pub fn contains(&self, node: NodeId) -> bool {
        if self.arena.get(node).is_none() || node == self.root {
            return false;
        }
        node.ancestors(&self.arena).any(|ancestor| ancestor == self.root)
    }

    pub fn get(&self, node: NodeId) -> Option<&Category> {
        if !self.contains(node) {
            return None;
        }
        self.arena.get(node).map(|n| n.get())
    }

    pub fn top_level(&self) -> Vec<NodeId> {
        self.root.children(&self.arena).collect()
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        if !self.contains(node) {
            return Vec::new();
        }
        node.children(&self.arena).collect()
    }

    pub fn has_children(&self, node: NodeId) -> bool {
        self.arena.get(node).and_then(|n| n.first_child()).is_some()
    }

    /// Every attached node with its depth, depth-first pre-order. Top-level
    /// categories are at depth 0.
    pub fn walk(&self) -> Vec<(NodeId, usize)> {
        let mut out = Vec::new();
        let mut depth = 0usize;
        for edge in self.root.traverse(&self.arena) {
            match edge {
                NodeEdge::Start(id) if id != self.root => {
                    out.push((id, depth));
                    depth += 1;
                }
                NodeEdge::End(id) if id != self.root => {
                    depth -= 1;
                }
                _ => {}
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.root.descendants(&self.arena).count() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.root.children(&self.arena).next().is_none()
    }

    /// First node carrying `id`, in pre-order.
    pub fn find_by_id(&self, id: CategoryId) -> Option<NodeId> {
        self.root
            .descendants(&self.arena)
            .skip(1)
            .find(|&node| self.arena[node].get().category_id == id)
    }

    /// Next free id: one past the largest id in use.
    pub fn next_id(&self) -> CategoryId {
        self.root
            .descendants(&self.arena)
            .skip(1)
            .map(|node| self.arena[node].get().category_id)
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Append a child under `parent`.
    ///
    /// The child inherits the parent's `category_id`, `parent_category_id`
    /// and hidden flag. Reusing the parent's id is a known faulty default kept
    /// for compatibility with existing data; callers wanting unique ids must
    /// assign one afterwards. Returns `None` when `parent` is not attached.
    pub fn insert_child(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        let template = self.get(parent)?.clone();
        let child = self.arena.new_node(Category {
            category_id: template.category_id,
            parent_category_id: template.parent_category_id,
            category_name: name.to_string(),
            is_hidden: template.is_hidden,
        });
        parent.append(child, &mut self.arena);
        debug!(parent = template.category_id, name, "inserted child category");
        Some(child)
    }

    pub fn append_top_level(&mut self, name: &str) -> NodeId {
        let category_id = self.next_id();
        let node = self.arena.new_node(Category {
            category_id,
            parent_category_id: ROOT_PARENT_ID,
            category_name: name.to_string(),
            is_hidden: false,
        });
        self.root.append(node, &mut self.arena);
        debug!(category_id, name, "appended top-level category");
        node
    }

    /// Rename in place. Returns false when `node` is not attached.
    pub fn rename(&mut self, node: NodeId, name: &str) -> bool {
        if !self.contains(node) {
            return false;
        }
        self.arena[node].get_mut().category_name = name.to_string();
        true
    }

    pub fn set_hidden(&mut self, node: NodeId, is_hidden: bool) -> bool {
        if !self.contains(node) {
            return false;
        }
        self.arena[node].get_mut().is_hidden = is_hidden;
        true
    }

    /// Copy the live tree out as owned nested values.
    pub fn snapshot(&self) -> Vec<CategoryNode> {
        self.root
            .children(&self.arena)
            .map(|id| self.snapshot_recursive(id))
            .collect()
    }

    fn snapshot_recursive(&self, node: NodeId) -> CategoryNode {
        let data = self.arena[node].get();
        CategoryNode {
            category_id: data.category_id,
            parent_category_id: data.parent_category_id,
            category_name: data.category_name.clone(),
            is_hidden: data.is_hidden,
            children: node
                .children(&self.arena)
                .map(|child| self.snapshot_recursive(child))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    #[test]
    fn test_tree_basic() {
        let tree = CategoryTree::from_nodes(&seed::tree_data());

        assert_eq!(tree.len(), 3);
        assert_eq!(tree.top_level().len(), 1);
        assert_eq!(tree.next_id(), 4);
        assert_eq!(tree.snapshot(), seed::tree_data());
    }

    #[test]
    fn test_walk_is_preorder_with_depth() {
        let tree = CategoryTree::from_nodes(&[
            CategoryNode::new(1, 0, "A").with_children(vec![
                CategoryNode::new(2, 1, "A1").with_children(vec![CategoryNode::new(3, 2, "A1a")]),
                CategoryNode::new(4, 1, "A2"),
            ]),
            CategoryNode::new(5, 0, "B"),
        ]);

        let walked: Vec<(String, usize)> = tree
            .walk()
            .into_iter()
            .map(|(id, depth)| (tree.get(id).unwrap().category_name.clone(), depth))
            .collect();

        assert_eq!(
            walked,
            vec![
                ("A".to_string(), 0),
                ("A1".to_string(), 1),
                ("A1a".to_string(), 2),
                ("A2".to_string(), 1),
                ("B".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_insert_child_inherits_parent_fields() {
        let mut tree = CategoryTree::from_nodes(&seed::tree_data());
        let staffs = tree.find_by_id(1).unwrap();
        tree.set_hidden(staffs, true);

        let child = tree.insert_child(staffs, "Cleaners").unwrap();
        let data = tree.get(child).unwrap();

        assert_eq!(data.category_id, 1);
        assert_eq!(data.parent_category_id, 0);
        assert!(data.is_hidden);
        assert_eq!(tree.children(staffs).last(), Some(&child));
    }

    #[test]
    fn test_insert_under_detached_node_is_noop() {
        let mut tree = CategoryTree::from_nodes(&seed::tree_data());
        let staffs = tree.find_by_id(1).unwrap();
        tree.replace(&[CategoryNode::new(9, 0, "Fresh")]);

        assert!(!tree.contains(staffs));
        assert!(tree.insert_child(staffs, "Lost").is_none());
        assert!(!tree.rename(staffs, "Lost"));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_append_top_level_assigns_next_id() {
        let mut tree = CategoryTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.next_id(), 1);

        let first = tree.append_top_level("One");
        let second = tree.append_top_level("Two");

        assert_eq!(tree.get(first).unwrap().category_id, 1);
        assert_eq!(tree.get(second).unwrap().category_id, 2);
        assert_eq!(tree.top_level(), vec![first, second]);
    }

    #[test]
    fn test_replace_frees_old_subtrees() {
        let mut tree = CategoryTree::from_nodes(&seed::tree_data());
        let staffs = tree.find_by_id(1).unwrap();
        let teachers = tree.find_by_id(2).unwrap();

        for _ in 0..1000 {
            tree.replace(&seed::tree_data());
        }

        assert_eq!(tree.len(), 3);
        // Sentinel plus at most one generation of freed slots awaiting reuse.
        assert!(tree.arena.count() <= 1 + 2 * 3, "arena grew to {}", tree.arena.count());
        for stale in [staffs, teachers] {
            assert!(!tree.contains(stale));
            assert!(tree.get(stale).is_none());
            assert!(tree.children(stale).is_empty());
        }
        assert_ne!(tree.find_by_id(1), Some(staffs));
    }

    #[test]
    fn test_rename_in_place_keeps_handle() {
        let mut tree = CategoryTree::from_nodes(&seed::tree_data());
        let teachers = tree.find_by_id(2).unwrap();

        assert!(tree.rename(teachers, "Tutors"));
        assert_eq!(tree.find_by_id(2), Some(teachers));
        assert_eq!(tree.get(teachers).unwrap().category_name, "Tutors");
    }
}
