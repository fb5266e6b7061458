pub mod extract;
pub mod log;
pub mod play;
pub mod render;
pub mod serve;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use sizelapse_core::{
    GitCli, HistoryExtractor, HistoryResponse, LoadState, Timeline, ViewConfig,
};
use sizelapse_sdk::HistoryClient;
use std::path::PathBuf;

/// Where a command reads its history from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Repository to read (defaults to current directory)
    #[arg(default_value = ".")]
    pub repo: PathBuf,

    /// Read the history from a file written by `sizelapse extract`
    #[arg(long, conflicts_with = "server")]
    pub input: Option<PathBuf>,

    /// Fetch the history from a running sizelapse server
    #[arg(long)]
    pub server: Option<String>,
}

impl SourceArgs {
    pub async fn fetch(&self) -> Result<HistoryResponse> {
        if let Some(path) = &self.input {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {:?}", path))?;
            let response = HistoryResponse::from_json(&text)
                .with_context(|| format!("{:?} does not contain sizelapse history", path))?;
            return Ok(response);
        }

        if let Some(url) = &self.server {
            let client = HistoryClient::new(url.clone());
            let response = tokio::task::spawn_blocking(move || client.fetch_response()).await?;
            return Ok(response);
        }

        Ok(HistoryExtractor::new(GitCli::new(&self.repo))
            .extract_response()
            .await)
    }

    pub async fn load(&self, config: ViewConfig) -> Result<LoadState> {
        Ok(LoadState::from_response(self.fetch().await?, config))
    }
}

/// Unwrap a ready timeline, reporting empty history or bailing on failure.
pub fn require_timeline(state: LoadState) -> Result<Option<Timeline>> {
    let text = state.status_text();
    match state {
        LoadState::Ready(timeline) => Ok(Some(timeline)),
        LoadState::NoData => {
            println!("{}", text.unwrap_or_default().yellow());
            Ok(None)
        }
        LoadState::Failed(message) => {
            eprintln!("{}", text.unwrap_or_default().red());
            anyhow::bail!(message)
        }
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[tokio::test]
    async fn test_load_from_input_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(
            &path,
            r#"[{"hash":"abc","author":"Ada","message":"init","commitNumber":1,
                "tree":{"name":"root","children":[{"name":"a.txt","value":3}]}}]"#,
        )
        .unwrap();

        let source = SourceArgs {
            repo: PathBuf::from("."),
            input: Some(path),
            server: None,
        };
        let state = source.load(ViewConfig::default()).await.unwrap();
        let timeline = require_timeline(state).unwrap().unwrap();
        assert_eq!(timeline.len(), 1);
    }

    #[tokio::test]
    async fn test_load_error_from_input_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, r#"{"error":"boom"}"#).unwrap();

        let source = SourceArgs {
            repo: PathBuf::from("."),
            input: Some(path),
            server: None,
        };
        let state = source.load(ViewConfig::default()).await.unwrap();
        let Err(error) = require_timeline(state) else {
            panic!("expected the stored error to surface");
        };
        assert_eq!(error.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_load_from_non_repository() {
        let dir = TempDir::new().unwrap();
        let source = SourceArgs {
            repo: dir.path().to_path_buf(),
            input: None,
            server: None,
        };

        let state = source.load(ViewConfig::default()).await.unwrap();
        assert!(matches!(state, LoadState::Failed(_)));
    }

    #[tokio::test]
    async fn test_empty_history_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "[]").unwrap();

        let source = SourceArgs {
            repo: PathBuf::from("."),
            input: Some(path),
            server: None,
        };
        let state = source.load(ViewConfig::default()).await.unwrap();
        assert!(require_timeline(state).unwrap().is_none());
    }
}
