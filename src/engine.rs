//! The category engine: owns the live tree and everything derived from it,
//! and runs the mutate, publish, re-project cycle for each user action.

use std::sync::mpsc::Receiver;

use indextree::NodeId;
use tracing::{debug, info, warn};

use crate::broadcast::{SubscriptionId, TreeChannel, TreeSnapshot};
use crate::error::{CategoryError, Result};
use crate::expand_state::ExpansionState;
use crate::node::{CategoryNode, CategoryRecord};
use crate::projector::{CategoryFlatNode, FlatId, FlatProjector};
use crate::seed;
use crate::selection::SelectionSet;
use crate::tree::{Category, CategoryTree};

pub struct CategoryEngine {
    tree: CategoryTree,
    projector: FlatProjector,
    selection: SelectionSet,
    expansion: ExpansionState,
    channel: TreeChannel,
    show_hidden: bool,
    initialized: bool,
}

impl Default for CategoryEngine {
    fn default() -> Self {
        Self::new(seed::tree_data())
    }
}

/// Names are stored exactly as given; only all-blank input is refused.
fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        warn!("rejected blank category name");
        return Err(CategoryError::BlankName);
    }
    Ok(())
}

impl CategoryEngine {
    /// Build an engine over `seed`. Nothing is projected or published until
    /// `initialize` runs; subscribers attached before that see an empty tree.
    pub fn new(seed: Vec<CategoryNode>) -> Self {
        Self {
            tree: CategoryTree::from_nodes(&seed),
            projector: FlatProjector::new(),
            selection: SelectionSet::default(),
            expansion: ExpansionState::default(),
            channel: TreeChannel::default(),
            show_hidden: false,
            initialized: false,
        }
    }

    pub fn initialize(&mut self) {
        self.commit("initialize");
        self.initialized = true;
        info!(categories = self.tree.len(), "category engine initialized");
    }

    /// Detach every subscriber and drop transient view state. The tree itself
    /// is kept so a later `initialize` republishes it.
    pub fn teardown(&mut self) {
        self.channel.clear_subscribers();
        self.selection.clear();
        self.expansion.collapse_all();
        self.initialized = false;
        info!("category engine torn down");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn commit(&mut self, action: &str) {
        self.channel.publish(self.tree.snapshot());
        self.projector.project(&self.tree);
        self.selection.retain_live(&self.projector);
        self.expansion.retain_live(&self.projector);
        debug!(action, rows = self.projector.len(), "committed tree change");
    }

    // --- input operations ---

    /// Append a new top-level category with the next free id.
    pub fn add_top_level_category(&mut self, name: &str) -> Result<NodeId> {
        validate_name(name)?;
        let node = self.tree.append_top_level(name);
        self.commit("add top-level category");
        Ok(node)
    }

    /// Append a child under the category shown by `parent` and expand it.
    /// Returns `None` when the parent is no longer part of the tree.
    pub fn add_subcategory(&mut self, parent: FlatId, name: &str) -> Result<Option<NodeId>> {
        validate_name(name)?;
        let nested = self.projector.resolve_nested(parent)?;
        let child = self.tree.insert_child(nested, name);
        if child.is_none() {
            debug!(?parent, "subcategory parent is detached, nothing inserted");
        }
        self.commit("add subcategory");
        if let Some(flat) = self.projector.flat_for(nested) {
            self.expansion.expand(flat);
        }
        Ok(child)
    }

    /// Rename in place. The row gets a fresh flat handle afterwards.
    pub fn rename_category(&mut self, flat: FlatId, new_name: &str) -> Result<()> {
        validate_name(new_name)?;
        let nested = self.projector.resolve_nested(flat)?;
        self.tree.rename(nested, new_name);
        self.commit("rename category");
        Ok(())
    }

    /// Check or uncheck a row together with its descendants.
    pub fn toggle_selection(&mut self, flat: FlatId) -> Result<bool> {
        self.projector.resolve_nested(flat)?;
        Ok(self.selection.toggle(flat, &self.projector))
    }

    /// Mark every selected category hidden and every other one visible.
    ///
    /// Returns the affected categories as flat records. For compatibility with
    /// existing consumers each record's `category_name` carries the stringified
    /// `category_id`, not the name; read names from the published tree instead.
    pub fn toggle_hidden_for_selection(&mut self) -> Vec<CategoryRecord> {
        let mut records = Vec::with_capacity(self.projector.len());
        for (flat, node) in self.projector.iter() {
            let Some(nested) = self.projector.identity().nested(flat) else {
                continue;
            };
            let is_hidden = self.selection.is_selected(flat);
            self.tree.set_hidden(nested, is_hidden);
            records.push(CategoryRecord {
                category_id: node.category_id,
                category_name: node.category_id.to_string(),
                expandable: node.expandable,
                is_hidden,
                parent_category_id: node.parent_category_id,
            });
        }
        self.commit("toggle hidden for selection");
        records
    }

    /// Turning the flag on also expands every hidden row and collapses the rest.
    pub fn set_show_hidden(&mut self, show_hidden: bool) {
        self.show_hidden = show_hidden;
        if show_hidden {
            self.expansion.derive_from_hidden(&self.projector);
        }
        debug!(show_hidden, "show hidden changed");
    }

    pub fn toggle_expanded(&mut self, flat: FlatId) -> bool {
        if self.expansion.is_expanded(flat) {
            self.expansion.collapse_recursive(flat, &self.projector);
            false
        } else {
            self.expansion.expand(flat);
            true
        }
    }

    pub fn expand_all(&mut self) {
        self.expansion.expand_all(&self.projector);
    }

    /// Load a whole new taxonomy. Every flat handle issued before is retired.
    pub fn replace_tree(&mut self, nodes: Vec<CategoryNode>) {
        self.tree.replace(&nodes);
        self.commit("replace tree");
    }

    // --- output stream ---

    pub fn subscribe(&mut self, callback: impl FnMut(&TreeSnapshot) + 'static) -> SubscriptionId {
        self.channel.subscribe(callback)
    }

    pub fn subscribe_channel(&mut self) -> (SubscriptionId, Receiver<TreeSnapshot>) {
        self.channel.subscribe_channel()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.channel.unsubscribe(id)
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        self.channel.current()
    }

    // --- queries ---

    pub fn is_expandable(&self, flat: FlatId) -> bool {
        self.projector.get(flat).is_some_and(|n| n.expandable)
    }

    pub fn is_selected(&self, flat: FlatId) -> bool {
        self.selection.is_selected(flat)
    }

    pub fn is_expanded(&self, flat: FlatId) -> bool {
        self.expansion.is_expanded(flat)
    }

    pub fn descendants_all_selected(&self, flat: FlatId) -> bool {
        self.selection.descendants_all_selected(flat, &self.projector)
    }

    pub fn descendants_partially_selected(&self, flat: FlatId) -> bool {
        self.selection.descendants_partially_selected(flat, &self.projector)
    }

    pub fn resolve_nested(&self, flat: FlatId) -> Result<NodeId> {
        self.projector.resolve_nested(flat)
    }

    pub fn nested(&self, flat: FlatId) -> Result<&Category> {
        let nested = self.projector.resolve_nested(flat)?;
        self.tree
            .get(nested)
            .ok_or(CategoryError::IdentityMismatch(flat))
    }

    pub fn flat_for(&self, nested: NodeId) -> Option<FlatId> {
        self.projector.flat_for(nested)
    }

    pub fn flat_node(&self, flat: FlatId) -> Option<&CategoryFlatNode> {
        self.projector.get(flat)
    }

    pub fn flat_nodes(&self) -> impl Iterator<Item = (FlatId, &CategoryFlatNode)> + '_ {
        self.projector.iter()
    }

    pub fn visible_rows(&self) -> Vec<FlatId> {
        self.projector.visible(&self.expansion, self.show_hidden)
    }

    pub fn checked_category(&self) -> Option<FlatId> {
        self.selection.checked()
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    /// Row of the nearest enclosing category, `None` for top-level rows.
    pub fn parent_of(&self, flat: FlatId) -> Option<FlatId> {
        self.projector.parent_of(flat)
    }
}
