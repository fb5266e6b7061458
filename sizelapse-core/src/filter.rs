use crate::models::{FilterConfig, NodeKind, TreeNode};

pub const IMAGE_EXTENSIONS: [&str; 8] = [
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".bmp", ".ico",
];

/// Return a copy of `tree` without the files hidden by `filters`.
///
/// Directories left without children are dropped as well. If nothing
/// survives, an empty root is returned instead.
pub fn apply_filters(tree: &TreeNode, filters: &FilterConfig) -> TreeNode {
    filter_node(tree, filters).unwrap_or_else(TreeNode::empty_root)
}

fn filter_node(node: &TreeNode, filters: &FilterConfig) -> Option<TreeNode> {
    match &node.kind {
        NodeKind::File { .. } => {
            if is_hidden(&node.name, filters) {
                None
            } else {
                Some(node.clone())
            }
        }
        NodeKind::Directory { children } => {
            let children: Vec<TreeNode> = children
                .iter()
                .filter_map(|child| filter_node(child, filters))
                .collect();

            if children.is_empty() {
                None
            } else {
                Some(TreeNode::directory(node.name.clone(), children))
            }
        }
    }
}

pub fn is_hidden(name: &str, filters: &FilterConfig) -> bool {
    let name = name.to_lowercase();
    (filters.hide_json && name.ends_with(".json"))
        || (filters.hide_images && IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)))
}
