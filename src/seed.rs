//! Bootstrap data for a fresh taxonomy.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{CategoryError, Result};
use crate::node::{CategoryNode, CategoryRecord};

/// Built-in nested seed: "Staffs" with "Teachers" and "Security" below it.
pub fn tree_data() -> Vec<CategoryNode> {
    vec![CategoryNode::new(1, 0, "Staffs").with_children(vec![
        CategoryNode::new(2, 1, "Teachers"),
        CategoryNode::new(3, 1, "Security"),
    ])]
}

/// The same taxonomy as parent-linked flat records, ready for `nest`.
pub fn flat_data() -> Vec<CategoryRecord> {
    [(1, 0, "Staffs"), (2, 1, "Teachers"), (3, 1, "Security")]
        .into_iter()
        .map(|(category_id, parent_category_id, name)| CategoryRecord {
            category_id,
            category_name: name.to_string(),
            expandable: false,
            is_hidden: false,
            parent_category_id,
        })
        .collect()
}

/// Read a nested JSON seed. Missing `parent_category_id`, `isHidden` and
/// `children` fall back to their defaults; a missing `category_id` is an error.
pub fn load_json(path: &Path) -> Result<Vec<CategoryNode>> {
    let content = fs::read_to_string(path)?;
    let nodes: Vec<CategoryNode> =
        serde_json::from_str(&content).map_err(|source| CategoryError::Seed {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), top_level = nodes.len(), "loaded seed data");
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::nest;
    use std::io::Write;

    #[test]
    fn test_flat_seed_nests_into_tree_seed() {
        assert_eq!(nest(&flat_data(), 0), tree_data());
    }

    #[test]
    fn test_load_json_seed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"category_id": 1, "category_name": "Staffs", "ishidden": false,
                 "children": [
                   {{"category_id": 2, "parent_category_id": 1, "category_name": "Teachers"}},
                   {{"category_id": 3, "parent_category_id": 1, "category_name": "Security"}}
                 ]}}]"#
        )
        .unwrap();

        let nodes = load_json(file.path()).unwrap();
        assert_eq!(nodes, tree_data());
    }

    #[test]
    fn test_load_json_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"category_name": "No id"}}]"#).unwrap();

        let err = load_json(file.path()).unwrap_err();
        assert!(matches!(err, CategoryError::Seed { .. }));
    }

    #[test]
    fn test_load_json_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_json(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, CategoryError::Io(_)));
    }
}
