use serde::{Deserialize, Serialize};
use std::fmt;

const SEPARATOR: char = '/';

/// Path-derived identity of a node, stable across commits.
///
/// Formed by joining the names from the root (sentinel included) down to the
/// node, e.g. `root/src/main.rs`. Two commits that both contain `src/main.rs`
/// produce the same key whatever else changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayoutKey(String);

impl LayoutKey {
    pub fn root(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn child(&self, name: &str) -> Self {
        Self(format!("{}{}{}", self.0, SEPARATOR, name))
    }

    /// Key of the enclosing directory, `None` for the root.
    pub fn parent(&self) -> Option<LayoutKey> {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| LayoutKey(parent.to_string()))
    }

    /// Iterates from the parent up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = LayoutKey> {
        std::iter::successors(self.parent(), LayoutKey::parent)
    }

    pub fn depth(&self) -> usize {
        self.0.matches(SEPARATOR).count()
    }

    /// The key without its root segment: the file's path in the repository.
    pub fn display_path(&self) -> &str {
        self.0
            .split_once(SEPARATOR)
            .map(|(_, rest)| rest)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayoutKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
