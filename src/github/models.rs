//! Wire payloads of the GitHub REST API, reduced to the fields used.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::data::intent::{ChangeKind, FileChange};
use crate::data::repository::{Fork, OwnerKind, Repository};

/// Account that owns a repository.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnerPayload {
    /// Account login.
    pub login: String,
    /// `User` or `Organization`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Repository as returned by the listing endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryPayload {
    /// Repository name.
    pub name: String,
    /// `owner/name`.
    pub full_name: String,
    /// Owning account.
    pub owner: OwnerPayload,
    /// Whether the repository is a fork.
    #[serde(default)]
    pub fork: bool,
    /// Whether the repository is private.
    #[serde(default)]
    pub private: bool,
    /// Browser URL.
    pub html_url: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Default branch.
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last metadata update.
    pub updated_at: DateTime<Utc>,
    /// Last push.
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
}

fn default_branch() -> String {
    "main".to_string()
}

impl RepositoryPayload {
    /// Owner kind reported by the API.
    pub fn owner_kind(&self) -> OwnerKind {
        OwnerKind::from_api(self.owner.kind.as_deref())
    }

    /// Converts a fork listing entry, tagging it with its origin.
    pub fn into_fork(self, origin: &str) -> Fork {
        let kind = self.owner_kind();
        Fork::from_repository(self.into(), kind, origin)
    }
}

impl From<RepositoryPayload> for Repository {
    fn from(payload: RepositoryPayload) -> Self {
        Self {
            owner: payload.owner.login,
            name: payload.name,
            full_name: payload.full_name,
            is_fork: payload.fork,
            private: payload.private,
            html_url: payload.html_url,
            description: payload.description,
            default_branch: payload.default_branch,
            created_at: payload.created_at,
            updated_at: payload.updated_at,
            pushed_at: payload.pushed_at,
            stars: payload.stargazers_count,
            watchers: payload.watchers_count,
            open_issues: payload.open_issues_count,
        }
    }
}

/// Organization member entry.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberPayload {
    /// Member login.
    pub login: String,
}

/// Result of the compare endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonPayload {
    /// Commits in head not in base.
    pub ahead_by: u32,
    /// Commits in base not in head.
    pub behind_by: u32,
    /// Commits in head not in base, oldest first.
    #[serde(default)]
    pub commits: Vec<ComparisonCommit>,
    /// Files changed between base and head.
    #[serde(default)]
    pub files: Vec<ComparisonFile>,
}

impl ComparisonPayload {
    /// First line of each commit message, in API order, blank titles skipped.
    pub fn commit_titles(&self, limit: usize) -> Vec<String> {
        self.commits
            .iter()
            .take(limit)
            .filter_map(|c| c.commit.message.lines().next())
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Commit entry of a comparison.
#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonCommit {
    /// Git commit data.
    pub commit: CommitDetail,
}

/// Git-level commit data.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    /// Full commit message.
    #[serde(default)]
    pub message: String,
}

/// One changed file in a comparison.
#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonFile {
    /// Repository-relative path.
    pub filename: String,
    /// Change status.
    #[serde(default)]
    pub status: String,
    /// Lines added.
    #[serde(default)]
    pub additions: u64,
    /// Lines deleted.
    #[serde(default)]
    pub deletions: u64,
}

impl From<ComparisonFile> for FileChange {
    fn from(file: ComparisonFile) -> Self {
        let kind = ChangeKind::from_api(&file.status);
        Self::new(file.filename, kind).with_lines(file.additions, file.deletions)
    }
}

/// README contents endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadmePayload {
    /// Encoded file contents.
    #[serde(default)]
    pub content: String,
    /// Content encoding, normally `base64`.
    #[serde(default)]
    pub encoding: String,
}
