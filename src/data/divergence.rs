//! Divergence between a fork and its origin.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Returns true if a fork counts as active.
///
/// Both conditions are required: the histories differ, and the fork was
/// updated strictly after it was created. An update timestamp equal to the
/// creation timestamp means the only activity was the fork operation itself.
#[must_use]
pub fn is_active_fork(
    total_difference: u64,
    forked_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> bool {
    total_difference > 0 && updated_at > forked_at
}

/// Commit divergence of one fork relative to its origin.
///
/// Fields are private so `total_difference` and `is_active` always agree
/// with the counts they are derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DivergenceRecord {
    origin: String,
    fork: String,
    ahead_by: u32,
    behind_by: u32,
    total_difference: u64,
    is_active: bool,
    comparison_available: bool,
}

impl DivergenceRecord {
    /// Builds a record from comparison counts and the fork's timestamps.
    pub fn new(
        origin: impl Into<String>,
        fork: impl Into<String>,
        ahead_by: u32,
        behind_by: u32,
        forked_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let total_difference = u64::from(ahead_by) + u64::from(behind_by);
        Self {
            origin: origin.into(),
            fork: fork.into(),
            ahead_by,
            behind_by,
            total_difference,
            is_active: is_active_fork(total_difference, forked_at, updated_at),
            comparison_available: true,
        }
    }

    /// Record for a fork whose comparison could not be obtained.
    pub fn unavailable(origin: impl Into<String>, fork: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            fork: fork.into(),
            ahead_by: 0,
            behind_by: 0,
            total_difference: 0,
            is_active: false,
            comparison_available: false,
        }
    }

    /// Full name of the origin.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Full name of the fork.
    pub fn fork(&self) -> &str {
        &self.fork
    }

    /// Commits in the fork that are absent from the origin.
    pub fn ahead_by(&self) -> u32 {
        self.ahead_by
    }

    /// Commits in the origin that are absent from the fork.
    pub fn behind_by(&self) -> u32 {
        self.behind_by
    }

    /// `ahead_by + behind_by`.
    pub fn total_difference(&self) -> u64 {
        self.total_difference
    }

    /// Whether the fork is active.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Whether the platform produced a comparison for this pair.
    pub fn comparison_available(&self) -> bool {
        self.comparison_available
    }
}

/// README presence and drift between origin and fork.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadmeComparison {
    /// The origin has a README.
    pub origin_has_readme: bool,
    /// The fork has a README.
    pub fork_has_readme: bool,
    /// The README differs (or exists on one side only).
    pub readme_changed: bool,
    /// Relative size change of the README, in percent, two decimals.
    pub readme_change_percentage: f64,
}

impl ReadmeComparison {
    /// Compares decoded README contents; `None` means the README is absent.
    #[must_use]
    pub fn from_contents(origin: Option<&str>, fork: Option<&str>) -> Self {
        let (readme_changed, readme_change_percentage) = match (origin, fork) {
            (Some(o), Some(f)) => {
                let origin_len = o.chars().count();
                let fork_len = f.chars().count();
                let pct = if origin_len == 0 {
                    0.0
                } else {
                    origin_len.abs_diff(fork_len) as f64 / origin_len as f64 * 100.0
                };
                (o != f, (pct * 100.0).round() / 100.0)
            }
            (Some(_), None) | (None, Some(_)) => (true, 100.0),
            (None, None) => (false, 0.0),
        };

        Self {
            origin_has_readme: origin.is_some(),
            fork_has_readme: fork.is_some(),
            readme_changed,
            readme_change_percentage,
        }
    }
}
