//! Run outcome records.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use serde::Serialize;

use crate::data::changes::{ChangeFootprint, CommitAnalysis};
use crate::data::divergence::DivergenceRecord;
use crate::data::intent::{CategoryHistogram, IntentSummary};
use crate::github::GitHubError;

/// Kind of unit that was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// A repository whose forks could not be listed.
    Repository,
    /// A fork whose divergence could not be analyzed.
    Fork,
}

/// Why a unit was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Retries were exhausted on 5xx or network errors.
    TransientFailure,
    /// The response had an unexpected shape.
    MalformedResponse,
    /// The platform rejected the request.
    Rejected,
}

impl SkipReason {
    /// Maps a unit-level error; fatal errors have no skip reason.
    pub fn from_error(error: &GitHubError) -> Option<Self> {
        match error {
            GitHubError::TransientFailure { .. } => Some(Self::TransientFailure),
            GitHubError::MalformedResponse { .. } => Some(Self::MalformedResponse),
            GitHubError::Rejected { .. } => Some(Self::Rejected),
            GitHubError::AuthorizationFailure { .. }
            | GitHubError::CredentialRequired { .. }
            | GitHubError::Configuration(_) => None,
        }
    }

    /// Label used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TransientFailure => "transient-failure",
            Self::MalformedResponse => "malformed-response",
            Self::Rejected => "rejected",
        }
    }
}

/// A repository or fork that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedUnit {
    /// Repository or fork.
    pub kind: UnitKind,
    /// Full name of the unit.
    pub name: String,
    /// Skip cause.
    pub reason: SkipReason,
    /// Error message.
    pub message: String,
}

/// Totals for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Organization analyzed.
    pub organization: String,
    /// Repositories listed.
    pub repositories_scanned: usize,
    /// Forks listed across all repositories.
    pub forks_discovered: usize,
    /// Forks owned by organization members.
    pub internal_forks_excluded: usize,
    /// External forks dropped by the processing limit.
    pub forks_truncated: usize,
    /// Forks analyzed successfully.
    pub forks_processed: usize,
    /// Processed forks that are active.
    pub active_forks: usize,
    /// Units skipped, in the order they failed.
    pub skipped: Vec<SkippedUnit>,
    /// Time spent blocked on the request quota, in seconds.
    pub quota_wait_seconds: f64,
    /// Number of quota waits.
    pub quota_waits: u32,
    /// Requests sent to the platform.
    pub api_requests: u64,
    /// Wall time of the run, in seconds.
    pub elapsed_seconds: f64,
    /// The run was interrupted before all repositories or forks were processed.
    pub cancelled: bool,
}

impl RunReport {
    /// Creates an empty report for `organization`.
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            ..Self::default()
        }
    }

    /// Records a skipped unit. Returns false for fatal errors, which are not skips.
    pub fn record_skip(&mut self, kind: UnitKind, name: &str, error: &GitHubError) -> bool {
        let Some(reason) = SkipReason::from_error(error) else {
            return false;
        };
        self.skipped.push(SkippedUnit {
            kind,
            name: name.to_string(),
            reason,
            message: error.to_string(),
        });
        true
    }

    /// Number of skipped units per reason.
    #[must_use]
    pub fn skip_breakdown(&self) -> BTreeMap<SkipReason, usize> {
        let mut breakdown = BTreeMap::new();
        for unit in &self.skipped {
            *breakdown.entry(unit.reason).or_insert(0) += 1;
        }
        breakdown
    }

    /// Stores the quota wait totals.
    pub fn set_quota_wait(&mut self, total: Duration, waits: u32) {
        self.quota_wait_seconds = total.as_secs_f64();
        self.quota_waits = waits;
    }

    /// Renders the operator-facing summary.
    #[must_use]
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Organization: {}", self.organization);
        let _ = writeln!(out, "Repositories scanned: {}", self.repositories_scanned);
        let _ = writeln!(
            out,
            "Forks discovered: {} ({} internal excluded, {} beyond limit)",
            self.forks_discovered, self.internal_forks_excluded, self.forks_truncated
        );
        let _ = writeln!(
            out,
            "Forks processed: {} ({} active)",
            self.forks_processed, self.active_forks
        );
        let _ = writeln!(out, "Units skipped: {}", self.skipped.len());
        for (reason, count) in self.skip_breakdown() {
            let _ = writeln!(out, "  {}: {count}", reason.as_str());
        }
        let _ = writeln!(
            out,
            "Quota wait: {:.1}s over {} wait(s)",
            self.quota_wait_seconds, self.quota_waits
        );
        let _ = writeln!(out, "API requests: {}", self.api_requests);
        let _ = writeln!(out, "Elapsed: {:.1}s", self.elapsed_seconds);
        if self.cancelled {
            let _ = writeln!(out, "Run cancelled: partial results");
        }
        out
    }
}

/// Everything the pipeline produced for one fork.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForkInsight {
    /// Intent summary for the downstream report generator.
    pub summary: IntentSummary,
    /// Commit divergence.
    pub divergence: DivergenceRecord,
    /// Category histogram of changed files.
    pub histogram: CategoryHistogram,
    /// New, removed and heavily edited files, plus extension counts.
    pub footprint: ChangeFootprint,
    /// Feature phrases and themes from commit titles.
    pub commits: CommitAnalysis,
    /// The fork's description differs from the origin's.
    pub description_changed: bool,
}

/// Output document of an insights run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightsOutput {
    /// Per-fork insights, in processing order.
    pub insights: Vec<ForkInsight>,
    /// Run totals.
    pub report: RunReport,
}
