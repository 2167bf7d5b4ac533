//! Change categories, histograms and intent summaries.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::repository::OwnerKind;

/// Semantic bucket assigned to a changed file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeCategory {
    /// Containers, CI workflows, deployment descriptors.
    Infrastructure,
    /// Routes, controllers, endpoints.
    Api,
    /// Models, schemas, migrations.
    Database,
    /// Authentication, tokens, cryptography, permissions.
    Security,
    /// Components, styles, markup.
    Frontend,
    /// Tests and specs.
    Testing,
    /// Configuration and settings files.
    Configuration,
    /// READMEs and docs.
    Documentation,
    /// Matched no rule.
    Other,
}

impl ChangeCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Infrastructure,
        Self::Api,
        Self::Database,
        Self::Security,
        Self::Frontend,
        Self::Testing,
        Self::Configuration,
        Self::Documentation,
        Self::Other,
    ];

    /// Order used to pick a development focus when counts tie.
    pub const FOCUS_PRECEDENCE: [Self; 9] = [
        Self::Security,
        Self::Database,
        Self::Api,
        Self::Infrastructure,
        Self::Frontend,
        Self::Testing,
        Self::Configuration,
        Self::Documentation,
        Self::Other,
    ];

    /// Lowercase name of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Infrastructure => "infrastructure",
            Self::Api => "api",
            Self::Database => "database",
            Self::Security => "security",
            Self::Frontend => "frontend",
            Self::Testing => "testing",
            Self::Configuration => "configuration",
            Self::Documentation => "documentation",
            Self::Other => "other",
        }
    }

    /// Position in [`Self::FOCUS_PRECEDENCE`]; lower wins.
    pub fn focus_rank(self) -> usize {
        Self::FOCUS_PRECEDENCE
            .iter()
            .position(|c| *c == self)
            .unwrap_or(Self::FOCUS_PRECEDENCE.len())
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a file changed between origin and fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// File exists only in the fork.
    Added,
    /// File changed in place.
    Modified,
    /// File was deleted in the fork.
    Removed,
    /// File moved.
    Renamed,
    /// Status not reported.
    #[default]
    Unknown,
}

impl ChangeKind {
    /// Maps the comparison API `status` field.
    pub fn from_api(status: &str) -> Self {
        match status {
            "added" | "copied" => Self::Added,
            "modified" | "changed" => Self::Modified,
            "removed" => Self::Removed,
            "renamed" => Self::Renamed,
            _ => Self::Unknown,
        }
    }
}

/// A path touched between origin and fork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Repository-relative path.
    pub path: String,
    /// Kind of change.
    pub kind: ChangeKind,
    /// Lines added.
    pub additions: u64,
    /// Lines deleted.
    pub deletions: u64,
}

impl FileChange {
    /// Creates a file change with no line counts.
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            additions: 0,
            deletions: 0,
        }
    }

    /// Sets the line counts.
    #[must_use]
    pub fn with_lines(mut self, additions: u64, deletions: u64) -> Self {
        self.additions = additions;
        self.deletions = deletions;
        self
    }

    /// `additions + deletions`.
    pub fn lines_changed(&self) -> u64 {
        self.additions + self.deletions
    }
}

/// Per-category file counts for one fork.
///
/// A file in two categories increments both, so the counts may sum to more
/// than [`files`](Self::files).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryHistogram {
    counts: BTreeMap<ChangeCategory, usize>,
    files: usize,
}

impl CategoryHistogram {
    /// Builds a histogram from explicit counts.
    pub fn from_counts(
        counts: impl IntoIterator<Item = (ChangeCategory, usize)>,
        files: usize,
    ) -> Self {
        Self {
            counts: counts.into_iter().filter(|(_, n)| *n > 0).collect(),
            files,
        }
    }

    /// Adds one file with the categories it matched.
    pub fn record(&mut self, categories: &BTreeSet<ChangeCategory>) {
        self.files += 1;
        for category in categories {
            *self.counts.entry(*category).or_insert(0) += 1;
        }
    }

    /// Number of files attributed to `category`.
    pub fn count(&self, category: ChangeCategory) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// Whether any file was attributed to `category`.
    pub fn contains(&self, category: ChangeCategory) -> bool {
        self.count(category) > 0
    }

    /// Number of files classified.
    pub fn files(&self) -> usize {
        self.files
    }

    /// Nonzero counts keyed by category.
    pub fn counts(&self) -> &BTreeMap<ChangeCategory, usize> {
        &self.counts
    }

    /// Whether no file was classified.
    pub fn is_empty(&self) -> bool {
        self.files == 0
    }

    /// Categories with a nonzero count, sorted by name, without duplicates.
    #[must_use]
    pub fn technical_areas(&self) -> Vec<ChangeCategory> {
        let mut areas: Vec<_> = self.counts.keys().copied().collect();
        areas.sort_by_key(|c| c.as_str());
        areas
    }

    /// The `limit` categories with the most files, ties to the higher
    /// precedence, returned sorted by name.
    #[must_use]
    pub fn dominant_areas(&self, limit: usize) -> Vec<ChangeCategory> {
        let mut ranked: Vec<(ChangeCategory, usize)> =
            self.counts.iter().map(|(c, n)| (*c, *n)).collect();
        ranked.sort_by_key(|(category, count)| (Reverse(*count), category.focus_rank()));
        let mut areas: Vec<ChangeCategory> =
            ranked.into_iter().take(limit).map(|(c, _)| c).collect();
        areas.sort_by_key(|c| c.as_str());
        areas
    }
}

/// Dominant kind of work in a fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DevelopmentFocus {
    /// Security work dominates.
    Security,
    /// Data model work dominates.
    Database,
    /// API work dominates.
    Api,
    /// Infrastructure work dominates.
    Infrastructure,
    /// Frontend work dominates.
    Frontend,
    /// Testing work dominates.
    Testing,
    /// Configuration work dominates.
    Configuration,
    /// Documentation work dominates.
    Documentation,
    /// Unclassified work dominates.
    Other,
    /// No category cleared the focus threshold.
    GeneralImprovement,
}

impl DevelopmentFocus {
    /// Label used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Database => "database",
            Self::Api => "api",
            Self::Infrastructure => "infrastructure",
            Self::Frontend => "frontend",
            Self::Testing => "testing",
            Self::Configuration => "configuration",
            Self::Documentation => "documentation",
            Self::Other => "other",
            Self::GeneralImprovement => "general-improvement",
        }
    }
}

impl From<ChangeCategory> for DevelopmentFocus {
    fn from(category: ChangeCategory) -> Self {
        match category {
            ChangeCategory::Security => Self::Security,
            ChangeCategory::Database => Self::Database,
            ChangeCategory::Api => Self::Api,
            ChangeCategory::Infrastructure => Self::Infrastructure,
            ChangeCategory::Frontend => Self::Frontend,
            ChangeCategory::Testing => Self::Testing,
            ChangeCategory::Configuration => Self::Configuration,
            ChangeCategory::Documentation => Self::Documentation,
            ChangeCategory::Other => Self::Other,
        }
    }
}

impl fmt::Display for DevelopmentFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inferred strategic purpose of a fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategicDirection {
    /// Adapting the software for the fork owner's production environment.
    #[serde(rename = "production-adaptation")]
    ProductionAdaptation,
    /// Hardening for enterprise or compliance requirements.
    #[serde(rename = "enterprise-hardening")]
    EnterpriseHardening,
    /// Extending backend surfaces to integrate with other systems.
    #[serde(rename = "integration-strategy")]
    IntegrationStrategy,
    /// Repositioning the project under a new identity.
    #[serde(rename = "rebranding/productization")]
    RebrandingProductization,
    /// General upkeep and modernization.
    #[serde(rename = "modernization")]
    Modernization,
}

impl StrategicDirection {
    /// Label used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProductionAdaptation => "production-adaptation",
            Self::EnterpriseHardening => "enterprise-hardening",
            Self::IntegrationStrategy => "integration-strategy",
            Self::RebrandingProductization => "rebranding/productization",
            Self::Modernization => "modernization",
        }
    }
}

impl fmt::Display for StrategicDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable interpretation of one fork's divergence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentSummary {
    /// Full name of the fork.
    pub fork: String,
    /// Browser URL of the fork.
    pub fork_url: String,
    /// Fork owner login.
    pub owner: String,
    /// Fork owner kind.
    pub owner_kind: OwnerKind,
    /// Full name of the origin.
    pub origin: String,
    /// Dominant kind of work.
    pub development_focus: DevelopmentFocus,
    /// Inferred strategic purpose.
    pub strategic_direction: StrategicDirection,
    /// Templated narrative paragraph.
    pub narrative: String,
    /// Categories with a nonzero count, sorted.
    pub technical_areas: Vec<ChangeCategory>,
    /// Number of files changed.
    pub files_modified: usize,
}
