use crate::error::{Error, Result};
use crate::models::CommitMeta;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Separates hash, author and subject in the commit walk output.
const FIELD_SEPARATOR: char = '\u{1f}';

/// Read-only view of a repository's committed history.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Human readable location, used in error messages.
    fn location(&self) -> String;

    async fn is_repository(&self) -> Result<bool>;

    /// Every commit reachable from any ref, newest first.
    async fn list_commits(&self) -> Result<Vec<CommitMeta>>;

    /// Raw recursive long-format listing of the files in `hash`.
    async fn list_files(&self, hash: &str) -> Result<String>;
}

/// [`Repository`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
    git_binary: PathBuf,
}

impl GitCli {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            git_binary: PathBuf::from("git"),
        }
    }

    pub fn with_git_binary(mut self, git_binary: impl Into<PathBuf>) -> Self {
        self.git_binary = git_binary.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!(repo = %self.root.display(), "git {}", args.join(" "));

        let output = Command::new(&self.git_binary)
            .current_dir(&self.root)
            .args(args)
            .output()
            .await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(Error::GitCommand {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl Repository for GitCli {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    async fn is_repository(&self) -> Result<bool> {
        if !self.root.is_dir() {
            return Ok(false);
        }

        match self.run(&["rev-parse", "--git-dir"]).await {
            Ok(_) => Ok(true),
            Err(Error::GitCommand { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list_commits(&self) -> Result<Vec<CommitMeta>> {
        let output = self
            .run(&["log", "--all", "--pretty=format:%H%x1f%an%x1f%s"])
            .await?;
        Ok(parse_log(&output))
    }

    async fn list_files(&self, hash: &str) -> Result<String> {
        self.run(&["ls-tree", "-r", "--long", "-z", "--full-tree", hash])
            .await
    }
}

/// Parse `%H<US>%an<US>%s` lines into commit metadata.
pub fn parse_log(output: &str) -> Vec<CommitMeta> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, FIELD_SEPARATOR);
            let hash = fields.next()?.trim();
            if hash.is_empty() {
                return None;
            }

            Some(CommitMeta {
                hash: hash.to_string(),
                author: fields.next().unwrap_or_default().to_string(),
                message: fields.next().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::process::Command;

    pub fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    pub fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .current_dir(dir)
            .args([
                "-c",
                "user.name=Test Author",
                "-c",
                "user.email=test@example.com",
                "-c",
                "commit.gpgsign=false",
            ])
            .args(args)
            .output()
            .unwrap();
        assert!(
            status.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&status.stderr)
        );
    }

    pub fn write(dir: &Path, path: &str, bytes: usize) {
        let full = dir.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, vec![b'x'; bytes]).unwrap();
    }
}
