use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("The path \"{0}\" is not a valid Git repository.")]
    NotARepository(String),

    #[error("Git command failed: git {command}: {stderr}")]
    GitCommand { command: String, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Commit not found: {0}")]
    CommitNotFound(usize),

    #[error("{0}")]
    HistoryUnavailable(String),
}
