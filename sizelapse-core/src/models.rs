use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Name carried by the synthetic node at the top of every commit tree.
pub const ROOT_NAME: &str = "root";

/// One path segment of a commit's file tree.
///
/// A node is either a directory (`children`) or a file (`value`, its size in
/// bytes). The two shapes serialize as `{"name", "children"}` and
/// `{"name", "value"}` respectively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct TreeNode {
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NodeKind {
    Directory { children: Vec<TreeNode> },
    File { value: u64 },
}

/// Wire form of a node before the exactly-one-of check.
#[derive(Deserialize)]
struct RawNode {
    name: String,
    children: Option<Vec<TreeNode>>,
    value: Option<u64>,
}

impl TryFrom<RawNode> for TreeNode {
    type Error = String;

    fn try_from(raw: RawNode) -> std::result::Result<Self, Self::Error> {
        match (raw.children, raw.value) {
            (Some(children), None) => Ok(TreeNode::directory(raw.name, children)),
            (None, Some(value)) => Ok(TreeNode::file(raw.name, value)),
            (Some(_), Some(_)) => Err(format!(
                "node \"{}\" has both \"children\" and \"value\"",
                raw.name
            )),
            (None, None) => Err(format!(
                "node \"{}\" has neither \"children\" nor \"value\"",
                raw.name
            )),
        }
    }
}

impl TreeNode {
    pub fn directory(name: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Directory { children },
        }
    }

    pub fn file(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::File { value },
        }
    }

    pub fn empty_root() -> Self {
        Self::directory(ROOT_NAME, Vec::new())
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    pub fn children(&self) -> &[TreeNode] {
        match &self.kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } => &[],
        }
    }

    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children().iter().find(|c| c.name == name)
    }

    /// Sum of every leaf value below (or at) this node.
    pub fn aggregate_size(&self) -> u64 {
        match &self.kind {
            NodeKind::File { value } => *value,
            NodeKind::Directory { children } => children.iter().map(TreeNode::aggregate_size).sum(),
        }
    }

    pub fn file_count(&self) -> usize {
        match &self.kind {
            NodeKind::File { .. } => 1,
            NodeKind::Directory { children } => children.iter().map(TreeNode::file_count).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSnapshot {
    pub hash: String,
    pub author: String,
    pub message: String,
    pub commit_number: usize,
    pub tree: TreeNode,
}

impl CommitSnapshot {
    pub fn short_hash(&self) -> &str {
        self.hash.get(..7).unwrap_or(&self.hash)
    }
}

/// Oldest commit first, `commit_number` counting up from 1.
pub type HistoryList = Vec<CommitSnapshot>;

/// Commit metadata as reported by the repository walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMeta {
    pub hash: String,
    pub author: String,
    pub message: String,
}

/// The single JSON value handed from the extractor to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryResponse {
    History(HistoryList),
    Failure { error: String },
}

impl HistoryResponse {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, HistoryResponse::Failure { .. })
    }

    pub fn into_result(self) -> Result<HistoryList> {
        match self {
            HistoryResponse::History(history) => Ok(history),
            HistoryResponse::Failure { error } => Err(Error::HistoryUnavailable(error)),
        }
    }
}

impl From<Result<HistoryList>> for HistoryResponse {
    fn from(result: Result<HistoryList>) -> Self {
        match result {
            Ok(history) => HistoryResponse::History(history),
            Err(e) => HistoryResponse::Failure {
                error: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub hide_json: bool,
    #[serde(default)]
    pub hide_images: bool,
}
