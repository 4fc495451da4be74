//! Pure value-level edits and conversions between the nested and the
//! parent-linked flat shape of a taxonomy.

use std::collections::HashSet;

use tracing::warn;

use crate::node::{CategoryId, CategoryNode, CategoryRecord};

/// Rebuild `tree` with every node whose id is `target_id` renamed.
///
/// A matching node is shallow-copied with the new name and its children are
/// carried over untouched, so a descendant sharing the id keeps its name.
/// When nothing matches the result equals the input.
pub fn rename_by_id(
    tree: &[CategoryNode],
    target_id: CategoryId,
    new_name: &str,
) -> Vec<CategoryNode> {
    tree.iter()
        .map(|node| {
            if node.category_id == target_id {
                CategoryNode {
                    category_name: new_name.to_string(),
                    ..node.clone()
                }
            } else if !node.children.is_empty() {
                CategoryNode {
                    category_id: node.category_id,
                    parent_category_id: node.parent_category_id,
                    category_name: node.category_name.clone(),
                    is_hidden: node.is_hidden,
                    children: rename_by_id(&node.children, target_id, new_name),
                }
            } else {
                node.clone()
            }
        })
        .collect()
}

/// Post-order listing: each node's descendants come before the node itself.
pub fn flatten(tree: &[CategoryNode]) -> Vec<CategoryRecord> {
    let mut out = Vec::new();
    for node in tree {
        flatten_into(node, &mut out);
    }
    out
}

fn flatten_into(node: &CategoryNode, out: &mut Vec<CategoryRecord>) {
    for child in &node.children {
        flatten_into(child, out);
    }
    out.push(CategoryRecord::from_node(node));
}

/// Group parent-linked records back into a tree rooted at `root_parent_id`.
///
/// Siblings keep their relative order from `records`. A record that would
/// reappear inside its own subtree is dropped, so cyclic input terminates.
pub fn nest(records: &[CategoryRecord], root_parent_id: CategoryId) -> Vec<CategoryNode> {
    let mut path = HashSet::new();
    nest_level(records, root_parent_id, &mut path)
}

fn nest_level(
    records: &[CategoryRecord],
    parent_id: CategoryId,
    path: &mut HashSet<CategoryId>,
) -> Vec<CategoryNode> {
    let mut nodes = Vec::new();
    for record in records.iter().filter(|r| r.parent_category_id == parent_id) {
        if !path.insert(record.category_id) {
            warn!(
                category_id = record.category_id,
                parent_category_id = parent_id,
                "cycle in category records, skipping"
            );
            continue;
        }
        let children = nest_level(records, record.category_id, path);
        path.remove(&record.category_id);

        nodes.push(CategoryNode {
            category_id: record.category_id,
            parent_category_id: record.parent_category_id,
            category_name: record.category_name.clone(),
            is_hidden: record.is_hidden,
            children,
        });
    }
    nodes
}
