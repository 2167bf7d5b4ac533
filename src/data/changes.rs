//! File-level footprint of a fork's changes and themes of its commit titles.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::intent::{ChangeKind, FileChange};

/// A file is a major change above this many added plus deleted lines.
pub const MAJOR_CHANGE_LINES: u64 = 50;

/// Number of file extensions reported as key areas.
pub const KEY_AREAS: usize = 3;

/// A file touched by more than [`MAJOR_CHANGE_LINES`] lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MajorChange {
    /// Path relative to the repository root.
    pub path: String,
    /// Kind of change.
    pub kind: ChangeKind,
    /// Lines added.
    pub additions: u64,
    /// Lines deleted.
    pub deletions: u64,
}

/// What the changed files of one fork look like.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFootprint {
    /// Files the comparison reported.
    pub files_changed: usize,
    /// Paths added by the fork.
    pub new_files: Vec<String>,
    /// Paths the fork deleted.
    pub removed_files: Vec<String>,
    /// Large edits, in comparison order.
    pub major_changes: Vec<MajorChange>,
    /// Changed files per lowercase extension, e.g. `.py`.
    pub files_by_extension: BTreeMap<String, usize>,
    /// Most frequent extensions, most common first.
    pub key_areas: Vec<String>,
}

impl ChangeFootprint {
    /// Builds the footprint of a comparison's file list.
    pub fn from_changes(changes: &[FileChange]) -> Self {
        let mut footprint = Self {
            files_changed: changes.len(),
            ..Self::default()
        };
        // Extensions in first-seen order; ties in the ranking keep it.
        let mut seen: Vec<String> = Vec::new();

        for change in changes {
            match change.kind {
                ChangeKind::Added => footprint.new_files.push(change.path.clone()),
                ChangeKind::Removed => footprint.removed_files.push(change.path.clone()),
                ChangeKind::Modified | ChangeKind::Renamed | ChangeKind::Unknown => {}
            }
            if change.lines_changed() > MAJOR_CHANGE_LINES {
                footprint.major_changes.push(MajorChange {
                    path: change.path.clone(),
                    kind: change.kind,
                    additions: change.additions,
                    deletions: change.deletions,
                });
            }
            if let Some(extension) = extension_of(&change.path) {
                let count = footprint
                    .files_by_extension
                    .entry(extension.clone())
                    .or_insert(0);
                if *count == 0 {
                    seen.push(extension);
                }
                *count += 1;
            }
        }

        let mut ranked: Vec<(usize, String)> = seen
            .into_iter()
            .map(|ext| {
                let count = footprint.files_by_extension.get(&ext).copied().unwrap_or(0);
                (count, ext)
            })
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        footprint.key_areas = ranked
            .into_iter()
            .take(KEY_AREAS)
            .map(|(_, ext)| ext)
            .collect();
        footprint
    }
}

/// `.ext` in lowercase; dotfiles and extensionless files have none.
fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

/// Development theme suggested by commit titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitTheme {
    /// New features and capabilities.
    NewCapabilities,
    /// Enhancements to existing behavior.
    Improvements,
    /// Fixes.
    BugFixes,
    /// Tailoring to a specific environment.
    Customization,
    /// Connecting to other systems.
    Integration,
    /// Security work.
    Security,
    /// Speed and scale.
    Performance,
    /// Restructuring.
    Refactoring,
}

impl CommitTheme {
    /// All themes, in scoring order.
    pub const ALL: [Self; 8] = [
        Self::NewCapabilities,
        Self::Improvements,
        Self::BugFixes,
        Self::Customization,
        Self::Integration,
        Self::Security,
        Self::Performance,
        Self::Refactoring,
    ];

    /// Phrases whose occurrences in lowercase commit titles count toward the theme.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::NewCapabilities => &[
                "add support",
                "implement",
                "introduce",
                "new feature",
                "enable",
                "allow",
            ],
            Self::Improvements => &[
                "improve",
                "enhance",
                "optimize",
                "better",
                "upgrade",
                "modernize",
            ],
            Self::BugFixes => &["fix", "resolve", "patch", "correct", "repair"],
            Self::Customization => &["customize", "adapt", "tailor", "modify for", "adjust"],
            Self::Integration => &["integrate", "connect", "link", "bridge", "compatible"],
            Self::Security => &["security", "secure", "vulnerability", "auth", "permission"],
            Self::Performance => &["performance", "faster", "speed", "efficiency", "scale"],
            Self::Refactoring => &["refactor", "restructure", "reorganize", "clean up"],
        }
    }

    /// Label used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewCapabilities => "new_capabilities",
            Self::Improvements => "improvements",
            Self::BugFixes => "bug_fixes",
            Self::Customization => "customization",
            Self::Integration => "integration",
            Self::Security => "security",
            Self::Performance => "performance",
            Self::Refactoring => "refactoring",
        }
    }
}

impl fmt::Display for CommitTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a fork's commit titles say about it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAnalysis {
    /// Titles that were analyzed, in API order.
    pub commit_sample: Vec<String>,
    /// Phrases following verbs like "add" or "implement".
    pub key_features: Vec<String>,
    /// Highest-scoring themes, strongest first.
    pub themes: Vec<CommitTheme>,
}
