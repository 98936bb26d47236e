//! Source control interface used by the command dispatcher.
pub mod client;

use async_trait::async_trait;
use thiserror::Error;

pub use client::GitHubClient;

pub type GitHubResult<T> = Result<T, GitHubError>;

/// Errors surfaced by the GitHub client.
///
/// Expected outcomes (branch exists, not found) are modelled as variants so the
/// dispatcher can word them for the user instead of printing a raw status.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("Could not find main or master branch")]
    NoBaseBranch,
    #[error("Branch '{0}' already exists")]
    AlreadyExists(String),
    #[error("Branch '{0}' not found")]
    NotFound(String),
    #[error("Invalid branch name '{0}'")]
    InvalidName(String),
    #[error("{0}")]
    Rejected(String),
    #[error("GitHub API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("GitHub request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub sha: String,
}

impl Branch {
    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }
}

/// Whether `name` is usable as a branch under `refs/heads/`.
///
/// Follows `git check-ref-format`, and additionally rejects `%` and `#` so a
/// name can never change the shape of the request URL it is placed in.
pub fn is_valid_branch_name(name: &str) -> bool {
    if name.is_empty()
        || name == "@"
        || name.starts_with(['-', '/'])
        || name.ends_with(['/', '.'])
        || name.contains("..")
        || name.contains("//")
        || name.contains("@{")
    {
        return false;
    }
    let forbidden = |c: char| {
        c.is_ascii_control()
            || matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\' | '%' | '#')
    };
    if name.contains(forbidden) {
        return false;
    }
    name.split('/')
        .all(|part| !part.starts_with('.') && !part.ends_with(".lock"))
}

#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Create `name` from the tip of the default base branch.
    ///
    /// Returns the name of the base branch that was used.
    async fn create_branch(&self, name: &str) -> GitHubResult<String>;

    async fn list_branches(&self) -> GitHubResult<Vec<Branch>>;

    async fn delete_branch(&self, name: &str) -> GitHubResult<()>;
}
