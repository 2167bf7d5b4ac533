//! Commit divergence and README drift between a fork and its origin.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, warn};

use crate::commits::COMMIT_SAMPLE;
use crate::data::divergence::DivergenceRecord;
use crate::data::intent::FileChange;
use crate::data::repository::{Fork, Repository};
use crate::github::models::{ComparisonPayload, ReadmePayload};
use crate::github::{ApiResponse, GitHubClient, GitHubError};

/// A divergence record with the files and commits the comparison reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkDivergence {
    /// Ahead/behind counts and activity.
    pub record: DivergenceRecord,
    /// Changed files; empty when the comparison was unavailable.
    pub changes: Vec<FileChange>,
    /// Titles of the first commits the fork adds, in comparison order.
    pub commit_titles: Vec<String>,
}

impl ForkDivergence {
    fn unavailable(origin: &Repository, fork: &Fork) -> Self {
        Self {
            record: DivergenceRecord::unavailable(&origin.full_name, fork.full_name()),
            changes: Vec::new(),
            commit_titles: Vec::new(),
        }
    }
}

/// Computes divergence through the shared client.
#[derive(Debug, Clone, Copy)]
pub struct DivergenceCalculator<'a> {
    client: &'a GitHubClient,
}

impl<'a> DivergenceCalculator<'a> {
    /// Creates a calculator.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Ahead/behind counts and activity of `fork` relative to `origin`.
    pub async fn compute(
        &self,
        origin: &Repository,
        fork: &Fork,
    ) -> Result<DivergenceRecord, GitHubError> {
        Ok(self.compute_with_changes(origin, fork).await?.record)
    }

    /// Like [`compute`](Self::compute), also returning the changed files and commit titles.
    ///
    /// A missing branch (404), an empty repository (409) and unrelated
    /// histories (422) yield an unavailable record rather than an error.
    pub async fn compute_with_changes(
        &self,
        origin: &Repository,
        fork: &Fork,
    ) -> Result<ForkDivergence, GitHubError> {
        let path = comparison_path(origin, fork);
        debug!(origin = %origin.full_name, fork = %fork.full_name(), "Comparing fork");

        let response = match self.client.get_json::<ComparisonPayload>(&path, &[]).await {
            Ok(response) => response,
            Err(GitHubError::Rejected {
                status: status @ (409 | 422),
                ..
            }) => {
                warn!(
                    origin = %origin.full_name,
                    fork = %fork.full_name(),
                    status,
                    "Branches cannot be compared, recording zero divergence"
                );
                return Ok(ForkDivergence::unavailable(origin, fork));
            }
            Err(err) => return Err(err),
        };
        let comparison = match response {
            ApiResponse::Found(payload) => payload,
            ApiResponse::Absent => {
                warn!(
                    origin = %origin.full_name,
                    fork = %fork.full_name(),
                    "Comparison unavailable, recording zero divergence"
                );
                return Ok(ForkDivergence::unavailable(origin, fork));
            }
        };

        let record = DivergenceRecord::new(
            &origin.full_name,
            fork.full_name(),
            comparison.ahead_by,
            comparison.behind_by,
            fork.forked_at,
            fork.updated_at(),
        );
        let commit_titles = comparison.commit_titles(COMMIT_SAMPLE);
        let changes: Vec<FileChange> = comparison.files.into_iter().map(FileChange::from).collect();
        debug!(
            fork = %fork.full_name(),
            ahead_by = record.ahead_by(),
            behind_by = record.behind_by(),
            files = changes.len(),
            active = record.is_active(),
            "Computed divergence"
        );

        Ok(ForkDivergence {
            record,
            changes,
            commit_titles,
        })
    }

    /// Decoded README of `full_name`, or `None` when the repository has none.
    pub async fn readme(&self, full_name: &str) -> Result<Option<String>, GitHubError> {
        let path = format!("/repos/{full_name}/readme");
        let response: ApiResponse<ReadmePayload> = self.client.get_json(&path, &[]).await?;
        response
            .into_option()
            .map(|payload| decode_readme(&path, &payload))
            .transpose()
    }
}

/// `/repos/{origin}/compare/{origin_branch}...{fork_owner}:{fork_branch}`.
fn comparison_path(origin: &Repository, fork: &Fork) -> String {
    format!(
        "/repos/{}/compare/{}...{}:{}",
        origin.full_name, origin.default_branch, fork.owner, fork.repository.default_branch
    )
}

fn decode_readme(path: &str, payload: &ReadmePayload) -> Result<String, GitHubError> {
    if !payload.encoding.is_empty() && !payload.encoding.eq_ignore_ascii_case("base64") {
        return Err(GitHubError::MalformedResponse {
            path: path.to_string(),
            message: format!("unsupported README encoding '{}'", payload.encoding),
        });
    }
    let compact: String = payload
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| GitHubError::MalformedResponse {
            path: path.to_string(),
            message: format!("invalid README content: {e}"),
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
