//! History extraction: commit walk, listing parser and tree builder.

use crate::error::{Error, Result};
use crate::models::{CommitSnapshot, HistoryList, HistoryResponse, TreeNode, ROOT_NAME};
use crate::repository::Repository;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// A regular file in one commit's tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub size: u64,
    pub path: String,
}

/// Parse a recursive long-format tree listing.
///
/// Records are `<mode> <type> <object> <size>\t<path>`, each terminated by
/// NUL (`ls-tree -z`). Paths may contain newlines. Records whose size is not
/// numeric (submodule links report `-`) are dropped.
pub fn parse_ls_tree(listing: &str) -> Vec<FileEntry> {
    listing
        .split('\0')
        .filter(|record| !record.trim().is_empty())
        .filter_map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> Option<FileEntry> {
    let (meta, path) = record.split_once('\t')?;
    let size = meta.split_whitespace().nth(3)?.parse::<u64>().ok()?;
    if path.is_empty() {
        return None;
    }

    Some(FileEntry {
        size,
        path: path.to_string(),
    })
}

enum Pending {
    Directory(BTreeMap<String, Pending>),
    File(u64),
}

/// Fold flat `(size, path)` entries into a rooted tree.
///
/// Directories sharing a prefix merge into one subtree. Children come out
/// ordered by name.
pub fn build_tree<I>(entries: I) -> TreeNode
where
    I: IntoIterator<Item = FileEntry>,
{
    let mut root = BTreeMap::new();
    for entry in entries {
        insert(&mut root, &entry);
    }
    TreeNode::directory(ROOT_NAME, into_children(root))
}

fn insert(root: &mut BTreeMap<String, Pending>, entry: &FileEntry) {
    let segments: Vec<&str> = entry.path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((leaf, dirs)) = segments.split_last() else {
        return;
    };

    let mut current = root;
    for segment in dirs {
        let node = current
            .entry(segment.to_string())
            .or_insert_with(|| Pending::Directory(BTreeMap::new()));
        match node {
            Pending::Directory(children) => current = children,
            Pending::File(_) => {
                warn!(path = %entry.path, "Skipping entry nested under a file");
                return;
            }
        }
    }

    match current.get(*leaf) {
        Some(Pending::Directory(_)) => {
            warn!(path = %entry.path, "Skipping file that collides with a directory");
        }
        Some(Pending::File(previous)) => {
            warn!(
                path = %entry.path,
                previous = *previous,
                size = entry.size,
                "Duplicate file entry, keeping the last one"
            );
            current.insert(leaf.to_string(), Pending::File(entry.size));
        }
        None => {
            current.insert(leaf.to_string(), Pending::File(entry.size));
        }
    }
}

fn into_children(children: BTreeMap<String, Pending>) -> Vec<TreeNode> {
    children
        .into_iter()
        .map(|(name, pending)| match pending {
            Pending::File(size) => TreeNode::file(name, size),
            Pending::Directory(grandchildren) => {
                TreeNode::directory(name, into_children(grandchildren))
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Number of tree listings fetched at once. Output order never depends on it.
    pub concurrency: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

pub struct HistoryExtractor<R> {
    repo: R,
    options: ExtractOptions,
    progress: Option<ProgressFn>,
}

impl<R: Repository> HistoryExtractor<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            options: ExtractOptions::default(),
            progress: None,
        }
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Called with `(processed, total)` after every commit.
    pub fn with_progress(mut self, progress: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Walk every commit oldest first and build its size tree.
    ///
    /// Any repository failure aborts the whole walk.
    pub async fn extract(&self) -> Result<HistoryList> {
        if !self.repo.is_repository().await? {
            return Err(Error::NotARepository(self.repo.location()));
        }

        let mut commits = self.repo.list_commits().await?;
        commits.reverse();
        let total = commits.len();
        info!(total, repo = %self.repo.location(), "Found commits, processing");

        let repo = &self.repo;
        let hashes: Vec<String> = commits.iter().map(|c| c.hash.clone()).collect();
        let mut listings = stream::iter(hashes)
            .map(|hash| async move { repo.list_files(&hash).await })
            .buffered(self.options.concurrency.max(1));

        let mut history = Vec::with_capacity(total);
        while let Some(listing) = listings.next().await {
            let listing = listing?;
            let commit = &commits[history.len()];
            let tree = build_tree(parse_ls_tree(&listing));
            debug!(
                commit = %commit.hash,
                files = tree.file_count(),
                bytes = tree.aggregate_size(),
                "Processed commit"
            );

            history.push(CommitSnapshot {
                hash: commit.hash.clone(),
                author: commit.author.clone(),
                message: commit.message.clone(),
                commit_number: history.len() + 1,
                tree,
            });

            if let Some(progress) = &self.progress {
                progress(history.len(), total);
            }
        }

        info!(commits = history.len(), "Processing complete");
        Ok(history)
    }

    /// Like [`extract`](Self::extract), with failures folded into the data contract.
    pub async fn extract_response(&self) -> HistoryResponse {
        match self.extract().await {
            Ok(history) => HistoryResponse::History(history),
            Err(e) => {
                error!("History extraction failed: {}", e);
                HistoryResponse::Failure {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommitMeta, NodeKind};
    use crate::repository::test_support::{git, git_available, write};
    use crate::repository::GitCli;
    use async_trait::async_trait;
    use similar_asserts::assert_eq;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn listing_line(size: &str, path: &str) -> String {
        format!("100644 blob 3b18e512dba79e4c8300dd08aeb37f8e728b8dad {:>7}\t{}\0", size, path)
    }

    #[derive(Default)]
    struct FakeRepository {
        valid: bool,
        /// Oldest first; reported newest first like a real walk.
        commits: Vec<(CommitMeta, String)>,
        delays: HashMap<String, u64>,
        broken: Option<String>,
    }

    impl FakeRepository {
        fn with_commit(mut self, hash: &str, message: &str, files: &[(&str, &str)]) -> Self {
            let listing = files
                .iter()
                .map(|(size, path)| listing_line(size, path))
                .collect::<String>();
            self.commits.push((
                CommitMeta {
                    hash: hash.to_string(),
                    author: "Ada".to_string(),
                    message: message.to_string(),
                },
                listing,
            ));
            self
        }
    }

    #[async_trait]
    impl Repository for FakeRepository {
        fn location(&self) -> String {
            "/fake/repo".to_string()
        }

        async fn is_repository(&self) -> Result<bool> {
            Ok(self.valid)
        }

        async fn list_commits(&self) -> Result<Vec<CommitMeta>> {
            Ok(self.commits.iter().rev().map(|(c, _)| c.clone()).collect())
        }

        async fn list_files(&self, hash: &str) -> Result<String> {
            if let Some(delay) = self.delays.get(hash) {
                tokio::time::sleep(Duration::from_millis(*delay)).await;
            }
            if self.broken.as_deref() == Some(hash) {
                return Err(Error::GitCommand {
                    command: format!("ls-tree -r --long {}", hash),
                    stderr: "fatal: not a tree object".to_string(),
                });
            }
            self.commits
                .iter()
                .find(|(c, _)| c.hash == hash)
                .map(|(_, listing)| listing.clone())
                .ok_or_else(|| Error::GitCommand {
                    command: "ls-tree".to_string(),
                    stderr: "unknown".to_string(),
                })
        }
    }

    fn two_commit_repo() -> FakeRepository {
        FakeRepository {
            valid: true,
            ..Default::default()
        }
        .with_commit("c1", "add a", &[("10", "a.txt")])
        .with_commit("c2", "add b", &[("10", "a.txt"), ("20", "b/b.txt")])
    }

    #[test]
    fn test_parse_ls_tree() {
        let listing = format!(
            "{}{}160000 commit 1111111111111111111111111111111111111111       -\tvendor/lib\0",
            listing_line("42", "src/main.rs"),
            listing_line("7", "dir with space/file name.txt"),
        );

        let entries = parse_ls_tree(&listing);
        assert_eq!(
            entries,
            vec![
                FileEntry {
                    size: 42,
                    path: "src/main.rs".to_string()
                },
                FileEntry {
                    size: 7,
                    path: "dir with space/file name.txt".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_malformed_line_is_dropped() {
        let listing = "100644 blob abc  notanumber\tbad.txt\0\
                       garbage without tab\0\
                       100644 blob def       5\tgood.txt\0";

        let tree = build_tree(parse_ls_tree(listing));
        assert!(tree.child("bad.txt").is_none());
        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.child("good.txt").unwrap().aggregate_size(), 5);
    }

    #[test]
    fn test_build_tree_merges_prefixes() {
        let tree = build_tree(vec![
            FileEntry {
                size: 1,
                path: "src/a.rs".to_string(),
            },
            FileEntry {
                size: 2,
                path: "src/nested/b.rs".to_string(),
            },
            FileEntry {
                size: 3,
                path: "src/c.rs".to_string(),
            },
        ]);

        assert_eq!(tree.name, "root");
        assert_eq!(tree.children().len(), 1);
        let src = tree.child("src").unwrap();
        assert_eq!(src.children().len(), 3);
        assert_eq!(src.aggregate_size(), 6);
        assert!(src.child("nested").unwrap().child("b.rs").unwrap().is_leaf());
    }

    #[test]
    fn test_duplicate_leaf_last_write_wins() {
        let tree = build_tree(vec![
            FileEntry {
                size: 1,
                path: "dup.txt".to_string(),
            },
            FileEntry {
                size: 9,
                path: "dup.txt".to_string(),
            },
        ]);

        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.child("dup.txt").unwrap().kind, NodeKind::File { value: 9 });
    }

    #[test]
    fn test_file_directory_collision_is_skipped() {
        let tree = build_tree(vec![
            FileEntry {
                size: 1,
                path: "thing".to_string(),
            },
            FileEntry {
                size: 2,
                path: "thing/inner.txt".to_string(),
            },
        ]);

        assert_eq!(tree.child("thing").unwrap().kind, NodeKind::File { value: 1 });
        assert_eq!(tree.aggregate_size(), 1);
    }

    #[test]
    fn test_internal_aggregates_match_leaf_sums() {
        let entries: Vec<FileEntry> = (0..40u64)
            .map(|i| FileEntry {
                size: i * 3 + 1,
                path: format!("d{}/e{}/f{}.txt", i % 3, i % 5, i),
            })
            .collect();
        let expected: u64 = entries.iter().map(|e| e.size).sum();
        let tree = build_tree(entries);

        fn check(node: &TreeNode) {
            if !node.is_leaf() {
                assert!(!node.children().is_empty());
                let sum: u64 = node.children().iter().map(TreeNode::aggregate_size).sum();
                assert_eq!(sum, node.aggregate_size());
                node.children().iter().for_each(check);
            }
        }

        check(&tree);
        assert_eq!(tree.aggregate_size(), expected);
    }

    #[tokio::test]
    async fn test_two_commit_history() {
        let history = HistoryExtractor::new(two_commit_repo()).extract().await.unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].commit_number, 1);
        assert_eq!(history[0].hash, "c1");
        assert_eq!(history[1].commit_number, 2);

        let root = &history[1].tree;
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.child("a.txt").unwrap().kind, NodeKind::File { value: 10 });
        let b = root.child("b").unwrap();
        assert_eq!(b.children().len(), 1);
        assert_eq!(b.child("b.txt").unwrap().kind, NodeKind::File { value: 20 });
        assert_eq!(root.aggregate_size(), 30);
    }

    #[tokio::test]
    async fn test_extraction_is_idempotent() {
        let extractor = HistoryExtractor::new(two_commit_repo());
        let first = extractor.extract().await.unwrap();
        let second = extractor.extract().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_not_a_repository() {
        let extractor = HistoryExtractor::new(FakeRepository::default());

        let err = extractor.extract().await.unwrap_err();
        assert!(matches!(err, Error::NotARepository(_)));

        let response = extractor.extract_response().await;
        assert_eq!(
            response,
            HistoryResponse::Failure {
                error: "The path \"/fake/repo\" is not a valid Git repository.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_whole_history() {
        let mut repo = two_commit_repo();
        repo.broken = Some("c2".to_string());

        let response = HistoryExtractor::new(repo).extract_response().await;
        match response {
            HistoryResponse::Failure { error } => assert!(error.contains("not a tree object")),
            HistoryResponse::History(_) => panic!("expected a failure"),
        }
    }

    #[tokio::test]
    async fn test_empty_repository_yields_empty_history() {
        let repo = FakeRepository {
            valid: true,
            ..Default::default()
        };

        let history = HistoryExtractor::new(repo).extract().await.unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_newline_in_path_survives() {
        let listing = format!("{}{}", listing_line("4", "a\nb.txt"), listing_line("2", "c.txt"));

        let tree = build_tree(parse_ls_tree(&listing));
        let names: Vec<&str> = tree.children().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a\nb.txt", "c.txt"]);
        assert_eq!(tree.aggregate_size(), 6);
    }

    #[tokio::test]
    async fn test_git_history_with_newline_in_file_name() {
        if !git_available() {
            return;
        }

        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        git(dir, &["init", "-q"]);
        write(dir, "a\nb.txt", 12);
        write(dir, "plain.txt", 3);
        git(dir, &["add", "."]);
        git(dir, &["commit", "-q", "-m", "odd names"]);

        let history = HistoryExtractor::new(GitCli::new(dir)).extract().await.unwrap();
        assert_eq!(history.len(), 1);
        let names: Vec<&str> = history[0]
            .tree
            .children()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["a\nb.txt", "plain.txt"]);
        assert_eq!(history[0].tree.aggregate_size(), 15);
    }

    #[tokio::test]
    async fn test_extraction_runs_on_spawned_task() {
        let extractor = HistoryExtractor::new(two_commit_repo())
            .with_options(ExtractOptions { concurrency: 2 });

        let history = tokio::spawn(async move { extractor.extract().await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(history.len(), 2);

        let missing = HistoryExtractor::new(GitCli::new("/nonexistent/sizelapse"));
        let response = tokio::spawn(async move { missing.extract_response().await })
            .await
            .unwrap();
        assert!(response.is_failure());
    }

    #[tokio::test]
    async fn test_concurrent_extraction_preserves_order() {
        let mut repo = FakeRepository {
            valid: true,
            ..Default::default()
        };
        for i in 0..6 {
            let file = format!("f{}.txt", i);
            repo = repo.with_commit(&format!("c{}", i), "step", &[("1", file.as_str())]);
            repo.delays.insert(format!("c{}", i), (6 - i) * 5);
        }

        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = std::sync::Arc::clone(&seen);
        let history = HistoryExtractor::new(repo)
            .with_options(ExtractOptions { concurrency: 4 })
            .with_progress(move |done, total| seen_clone.lock().unwrap().push((done, total)))
            .extract()
            .await
            .unwrap();

        let hashes: Vec<&str> = history.iter().map(|s| s.hash.as_str()).collect();
        assert_eq!(hashes, vec!["c0", "c1", "c2", "c3", "c4", "c5"]);
        let numbers: Vec<usize> = history.iter().map(|s| s.commit_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(seen.lock().unwrap().last(), Some(&(6, 6)));
    }
}
