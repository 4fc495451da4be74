use serde::{Deserialize, Serialize};

pub type CategoryId = u64;

/// Parent id carried by top-level categories.
pub const ROOT_PARENT_ID: CategoryId = 0;

/// A category and its subcategories, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub category_id: CategoryId,
    #[serde(default)]
    pub parent_category_id: CategoryId,
    pub category_name: String,
    #[serde(default, rename = "isHidden", alias = "ishidden")]
    pub is_hidden: bool,
    #[serde(default)]
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    pub fn new(
        category_id: CategoryId,
        parent_category_id: CategoryId,
        name: impl Into<String>,
    ) -> Self {
        Self {
            category_id,
            parent_category_id,
            category_name: name.into(),
            is_hidden: false,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<CategoryNode>) -> Self {
        self.children = children;
        self
    }

    pub fn hidden(mut self, is_hidden: bool) -> Self {
        self.is_hidden = is_hidden;
        self
    }

    /// Id equality, independent of name, flags or children.
    pub fn same_id(&self, other: &CategoryNode) -> bool {
        self.category_id == other.category_id
    }
}

/// Single-level form used by `flatten` and `nest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub category_id: CategoryId,
    pub category_name: String,
    #[serde(default)]
    pub expandable: bool,
    #[serde(default, rename = "isHidden", alias = "ishidden")]
    pub is_hidden: bool,
    #[serde(default)]
    pub parent_category_id: CategoryId,
}

impl CategoryRecord {
    pub fn from_node(node: &CategoryNode) -> Self {
        Self {
            category_id: node.category_id,
            category_name: node.category_name.clone(),
            expandable: !node.children.is_empty(),
            is_hidden: node.is_hidden,
            parent_category_id: node.parent_category_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_defaults_and_legacy_hidden_key() {
        let json = r#"[
            {"category_id": 1, "category_name": "Staffs", "ishidden": true,
             "children": [{"category_id": 2, "parent_category_id": 1, "category_name": "Teachers"}]}
        ]"#;
        let nodes: Vec<CategoryNode> = serde_json::from_str(json).unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].parent_category_id, ROOT_PARENT_ID);
        assert!(nodes[0].is_hidden);
        assert!(!nodes[0].children[0].is_hidden);
        assert!(nodes[0].children[0].children.is_empty());
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let json = r#"{"category_name": "Nameless"}"#;
        assert!(serde_json::from_str::<CategoryNode>(json).is_err());
    }

    #[test]
    fn test_serializes_hidden_as_camel_case() {
        let node = CategoryNode::new(5, 0, "Archive").hidden(true);
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("\"isHidden\":true"));
    }

    #[test]
    fn test_same_id_ignores_content() {
        let a = CategoryNode::new(4, 0, "Old");
        let b = CategoryNode::new(4, 1, "New").hidden(true);
        assert!(a.same_id(&b));
        assert_ne!(a, b);
    }
}
