//! Repository and fork snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable snapshot of a repository, fetched once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Owner login.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// `owner/name`.
    pub full_name: String,
    /// Whether the repository is itself a fork.
    pub is_fork: bool,
    /// Whether the repository is private.
    pub private: bool,
    /// Browser URL.
    pub html_url: String,
    /// Repository description, if any.
    pub description: Option<String>,
    /// Default branch name.
    pub default_branch: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last metadata update.
    pub updated_at: DateTime<Utc>,
    /// Last push, absent for repositories never pushed to.
    pub pushed_at: Option<DateTime<Utc>>,
    /// Stargazer count.
    pub stars: u64,
    /// Watcher count.
    pub watchers: u64,
    /// Open issues and pull requests.
    pub open_issues: u64,
}

/// Kind of account owning a fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OwnerKind {
    /// An individual account.
    #[default]
    User,
    /// An organization account.
    Organization,
}

impl OwnerKind {
    /// Maps the API `type` field; anything that is not an organization is a user.
    pub fn from_api(kind: Option<&str>) -> Self {
        match kind {
            Some(k) if k.eq_ignore_ascii_case("organization") => Self::Organization,
            _ => Self::User,
        }
    }

    /// Returns the API spelling of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Organization => "Organization",
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A repository created from an origin.
///
/// The origin is referenced by full name, not owned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fork {
    /// The fork's own repository snapshot.
    pub repository: Repository,
    /// Full name of the origin repository.
    pub origin: String,
    /// When the fork was created.
    pub forked_at: DateTime<Utc>,
    /// Owner login.
    pub owner: String,
    /// Owner account kind.
    pub owner_kind: OwnerKind,
}

impl Fork {
    /// Builds a fork from its repository snapshot and the origin it was listed under.
    pub fn from_repository(repository: Repository, owner_kind: OwnerKind, origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            forked_at: repository.created_at,
            owner: repository.owner.clone(),
            owner_kind,
            repository,
        }
    }

    /// `owner/name` of the fork.
    pub fn full_name(&self) -> &str {
        &self.repository.full_name
    }

    /// Last update time of the fork.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.repository.updated_at
    }

    /// Browser URL of the fork.
    pub fn html_url(&self) -> &str {
        &self.repository.html_url
    }

    /// Browser URL of the fork owner's profile, derived from the fork URL.
    pub fn owner_url(&self) -> String {
        self.repository
            .html_url
            .rsplit_once('/')
            .map_or_else(|| self.repository.html_url.clone(), |(base, _)| base.to_string())
    }
}
