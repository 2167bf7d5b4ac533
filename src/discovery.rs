//! Repository and fork enumeration for one organization.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::data::repository::{Fork, Repository};
use crate::github::models::{MemberPayload, RepositoryPayload};
use crate::github::{GitHubClient, GitHubError};

/// Forks split by owner membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForkPartition {
    /// Forks owned by organization members.
    pub internal: Vec<Fork>,
    /// Forks owned by anyone else.
    pub external: Vec<Fork>,
}

/// Splits forks into internal and external, preserving order.
#[must_use]
pub fn partition_forks(forks: Vec<Fork>, members: &HashSet<String>) -> ForkPartition {
    let (internal, external) = forks
        .into_iter()
        .partition(|fork| members.contains(&fork.owner.to_lowercase()));
    ForkPartition { internal, external }
}

/// Enumerates repositories and forks of one organization.
///
/// Membership is fetched once and cached for the lifetime of the value, so
/// changes to the organization during a run are not observed.
#[derive(Debug)]
pub struct RepoDiscovery<'a> {
    client: &'a GitHubClient,
    organization: String,
    members: Option<HashSet<String>>,
}

impl<'a> RepoDiscovery<'a> {
    /// Creates a discovery for `organization`.
    pub fn new(client: &'a GitHubClient, organization: impl Into<String>) -> Self {
        Self {
            client,
            organization: organization.into(),
            members: None,
        }
    }

    /// Every repository of the organization visible to the credentials.
    pub async fn list_repositories(&self) -> Result<Vec<Repository>, GitHubError> {
        let path = format!("/orgs/{}/repos", self.organization);
        let payloads: Vec<RepositoryPayload> =
            self.client.paginate(&path, &[("type", "all")]).await?;
        let repositories: Vec<Repository> = payloads.into_iter().map(Repository::from).collect();
        info!(
            organization = %self.organization,
            count = repositories.len(),
            "Listed repositories"
        );
        Ok(repositories)
    }

    /// Every fork of `repository`, newest first.
    pub async fn list_forks(&self, repository: &Repository) -> Result<Vec<Fork>, GitHubError> {
        let path = format!("/repos/{}/forks", repository.full_name);
        let payloads: Vec<RepositoryPayload> =
            self.client.paginate(&path, &[("sort", "newest")]).await?;
        let forks: Vec<Fork> = payloads
            .into_iter()
            .map(|payload| payload.into_fork(&repository.full_name))
            .collect();
        debug!(repository = %repository.full_name, count = forks.len(), "Listed forks");
        Ok(forks)
    }

    /// Lowercased logins of the organization's members, fetched on first use.
    pub async fn members(&mut self) -> Result<&HashSet<String>, GitHubError> {
        if self.members.is_none() {
            if !self.client.is_authenticated() {
                return Err(GitHubError::CredentialRequired {
                    operation: format!("Listing members of {}", self.organization),
                });
            }
            let path = format!("/orgs/{}/members", self.organization);
            let payloads: Vec<MemberPayload> = self.client.paginate(&path, &[]).await?;
            let members: HashSet<String> = payloads
                .into_iter()
                .map(|m| m.login.to_lowercase())
                .collect();
            info!(
                organization = %self.organization,
                count = members.len(),
                "Fetched organization members"
            );
            self.members = Some(members);
        }
        Ok(self.members.get_or_insert_with(HashSet::new))
    }

    /// Forks of `repository` split by membership. Membership is not looked up
    /// for a repository without forks.
    pub async fn external_forks(
        &mut self,
        repository: &Repository,
    ) -> Result<ForkPartition, GitHubError> {
        let forks = self.list_forks(repository).await?;
        if forks.is_empty() {
            return Ok(ForkPartition::default());
        }
        let members = self.members().await?;
        Ok(partition_forks(forks, members))
    }
}
