//! Tabular fork export and the activity filter that consumes it.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::data::divergence::{is_active_fork, DivergenceRecord, ReadmeComparison};
use crate::data::repository::{Fork, Repository};

/// Placeholder written for a fork that was never pushed to.
pub const NEVER: &str = "Never";

/// One row of the fork discovery export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForkExportRow {
    /// Origin full name.
    pub original_repo: String,
    /// Origin browser URL.
    #[serde(default)]
    pub original_url: String,
    /// Fork owner login.
    pub fork_owner: String,
    /// Fork owner profile URL.
    #[serde(default)]
    pub fork_owner_url: String,
    /// `User` or `Organization`.
    #[serde(default)]
    pub fork_owner_type: String,
    /// Fork repository name.
    pub fork_name: String,
    /// Fork browser URL.
    #[serde(default)]
    pub fork_url: String,
    /// Fork creation time, RFC 3339.
    pub forked_at: String,
    /// Fork last update, RFC 3339.
    pub fork_updated_at: String,
    /// Fork last push, RFC 3339 or `Never`.
    #[serde(default)]
    pub fork_pushed_at: String,
    /// Fork stargazers.
    #[serde(default)]
    pub fork_stars: u64,
    /// Fork watchers.
    #[serde(default)]
    pub fork_watchers: u64,
    /// Fork open issues.
    #[serde(default)]
    pub fork_open_issues: u64,
    /// Origin description.
    #[serde(default)]
    pub original_description: String,
    /// Fork description.
    #[serde(default)]
    pub fork_description: String,
    /// Descriptions differ.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub description_changed: bool,
    /// Commits only in the fork.
    #[serde(default)]
    pub commits_ahead: u64,
    /// Commits only in the origin.
    #[serde(default)]
    pub commits_behind: u64,
    /// `commits_ahead + commits_behind`.
    #[serde(default)]
    pub total_commits_difference: u64,
    /// Origin has a README.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub original_has_readme: bool,
    /// Fork has a README.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub fork_has_readme: bool,
    /// READMEs differ.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub readme_changed: bool,
    /// Relative README size change, percent.
    #[serde(default)]
    pub readme_change_percentage: f64,
}

impl ForkExportRow {
    /// Assembles a row from the discovery and divergence results.
    pub fn from_parts(
        origin: &Repository,
        fork: &Fork,
        divergence: &DivergenceRecord,
        readme: &ReadmeComparison,
    ) -> Self {
        let original_description = origin.description.clone().unwrap_or_default();
        let fork_description = fork.repository.description.clone().unwrap_or_default();

        Self {
            original_repo: origin.full_name.clone(),
            original_url: origin.html_url.clone(),
            fork_owner: fork.owner.clone(),
            fork_owner_url: fork.owner_url(),
            fork_owner_type: fork.owner_kind.as_str().to_string(),
            fork_name: fork.repository.name.clone(),
            fork_url: fork.html_url().to_string(),
            forked_at: fork.forked_at.to_rfc3339(),
            fork_updated_at: fork.updated_at().to_rfc3339(),
            fork_pushed_at: fork
                .repository
                .pushed_at
                .map_or_else(|| NEVER.to_string(), |t| t.to_rfc3339()),
            fork_stars: fork.repository.stars,
            fork_watchers: fork.repository.watchers,
            fork_open_issues: fork.repository.open_issues,
            description_changed: original_description != fork_description,
            original_description,
            fork_description,
            commits_ahead: u64::from(divergence.ahead_by()),
            commits_behind: u64::from(divergence.behind_by()),
            total_commits_difference: divergence.total_difference(),
            original_has_readme: readme.origin_has_readme,
            fork_has_readme: readme.fork_has_readme,
            readme_changed: readme.readme_changed,
            readme_change_percentage: readme.readme_change_percentage,
        }
    }

    /// Applies the activity policy to the exported values.
    pub fn is_active(&self) -> bool {
        is_active_fork(
            self.total_commits_difference,
            parse_timestamp(&self.forked_at),
            parse_timestamp(&self.fork_updated_at),
        )
    }

    /// `owner/name` of the fork.
    pub fn fork_full_name(&self) -> String {
        format!("{}/{}", self.fork_owner, self.fork_name)
    }
}

/// Parses an exported timestamp; `Never`, blanks and garbage sort first.
#[must_use]
pub fn parse_timestamp(value: &str) -> DateTime<Utc> {
    let value = value.trim();
    if value.is_empty() || value == NEVER {
        return DateTime::<Utc>::MIN_UTC;
    }
    DateTime::parse_from_rfc3339(value).map_or(DateTime::<Utc>::MIN_UTC, |t| t.with_timezone(&Utc))
}

/// Accepts `true`/`false` in any case, plus `1`/`0`; blanks are false.
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean flag, found '{other}'"
        ))),
    }
}

/// Writes rows as CSV with a header line.
pub fn write_csv<W: Write>(rows: &[ForkExportRow], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer
            .serialize(row)
            .with_context(|| format!("Failed to write export row for {}", row.fork_full_name()))?;
    }
    csv_writer.flush().context("Failed to flush CSV export")?;
    Ok(())
}

/// Reads rows from CSV; columns are matched by header name.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<ForkExportRow>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    csv_reader
        .deserialize()
        .enumerate()
        .map(|(index, row)| row.with_context(|| format!("Invalid fork export row {}", index + 1)))
        .collect()
}

/// Reads an export file.
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<ForkExportRow>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open fork export: {}", path.display()))?;
    read_csv(file)
}

/// Keeps only the rows describing active forks, preserving order.
#[must_use]
pub fn filter_active(rows: Vec<ForkExportRow>) -> Vec<ForkExportRow> {
    rows.into_iter().filter(ForkExportRow::is_active).collect()
}

/// Summary statistics over a set of active forks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityStatistics {
    /// Rows read.
    pub total_forks: usize,
    /// Rows that passed the filter.
    pub active_forks: usize,
    /// Mean commits ahead among active forks.
    pub average_commits_ahead: f64,
    /// Active forks with a changed description.
    pub description_changes: usize,
    /// Active forks with a changed README.
    pub readme_changes: usize,
    /// Active forks owned by users.
    pub user_forks: usize,
    /// Active forks owned by organizations.
    pub organization_forks: usize,
    /// Up to five active forks with the most commits ahead: (full name, commits ahead, url).
    pub most_active: Vec<(String, u64, String)>,
}

impl ActivityStatistics {
    /// Computes statistics over `active`, out of `total_forks` rows read.
    #[must_use]
    pub fn compute(total_forks: usize, active: &[ForkExportRow]) -> Self {
        let total_ahead: u64 = active.iter().map(|r| r.commits_ahead).sum();
        let average_commits_ahead = if active.is_empty() {
            0.0
        } else {
            total_ahead as f64 / active.len() as f64
        };

        let mut ranked: Vec<&ForkExportRow> = active.iter().collect();
        ranked.sort_by(|a, b| b.commits_ahead.cmp(&a.commits_ahead));

        Self {
            total_forks,
            active_forks: active.len(),
            average_commits_ahead,
            description_changes: active.iter().filter(|r| r.description_changed).count(),
            readme_changes: active.iter().filter(|r| r.readme_changed).count(),
            user_forks: active.iter().filter(|r| r.fork_owner_type == "User").count(),
            organization_forks: active
                .iter()
                .filter(|r| r.fork_owner_type == "Organization")
                .count(),
            most_active: ranked
                .into_iter()
                .take(5)
                .map(|r| (r.fork_full_name(), r.commits_ahead, r.fork_url.clone()))
                .collect(),
        }
    }
}

/// Totals over a complete fork export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// External forks exported.
    pub external_forks: usize,
    /// Forks with commits the origin lacks.
    pub forks_ahead: usize,
    /// Forks with a changed description.
    pub description_changes: usize,
    /// Forks with a changed README.
    pub readme_changes: usize,
    /// Commits ahead summed over all forks.
    pub total_commits_ahead: u64,
    /// Stars summed over all forks.
    pub total_stars: u64,
    /// Open issues summed over all forks.
    pub total_open_issues: u64,
    /// Forks owned by users.
    pub user_forks: usize,
    /// Forks owned by organizations.
    pub organization_forks: usize,
    /// Up to ten forks with the most commits ahead: (full name, commits ahead, url).
    pub top_forks: Vec<(String, u64, String)>,
}

impl ExportSummary {
    /// Forks listed in [`top_forks`](Self::top_forks).
    pub const TOP: usize = 10;

    /// Summarizes `rows`; equal commit counts keep export order.
    pub fn compute(rows: &[ForkExportRow]) -> Self {
        let mut ranked: Vec<&ForkExportRow> = rows.iter().collect();
        ranked.sort_by(|a, b| b.commits_ahead.cmp(&a.commits_ahead));

        Self {
            external_forks: rows.len(),
            forks_ahead: rows.iter().filter(|r| r.commits_ahead > 0).count(),
            description_changes: rows.iter().filter(|r| r.description_changed).count(),
            readme_changes: rows.iter().filter(|r| r.readme_changed).count(),
            total_commits_ahead: rows.iter().map(|r| r.commits_ahead).sum(),
            total_stars: rows.iter().map(|r| r.fork_stars).sum(),
            total_open_issues: rows.iter().map(|r| r.fork_open_issues).sum(),
            user_forks: rows.iter().filter(|r| r.fork_owner_type == "User").count(),
            organization_forks: rows
                .iter()
                .filter(|r| r.fork_owner_type == "Organization")
                .count(),
            top_forks: ranked
                .into_iter()
                .take(Self::TOP)
                .map(|r| (r.fork_full_name(), r.commits_ahead, r.fork_url.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::repository::fixtures::{fork, repository};

    fn row(owner: &str, total: u64, forked_at: &str, updated_at: &str) -> ForkExportRow {
        ForkExportRow {
            original_repo: "acme/widgets".to_string(),
            original_url: "https://github.com/acme/widgets".to_string(),
            fork_owner: owner.to_string(),
            fork_owner_url: format!("https://github.com/{owner}"),
            fork_owner_type: "User".to_string(),
            fork_name: "widgets".to_string(),
            fork_url: format!("https://github.com/{owner}/widgets"),
            forked_at: forked_at.to_string(),
            fork_updated_at: updated_at.to_string(),
            fork_pushed_at: NEVER.to_string(),
            fork_stars: 0,
            fork_watchers: 0,
            fork_open_issues: 0,
            original_description: String::new(),
            fork_description: String::new(),
            description_changed: false,
            commits_ahead: total,
            commits_behind: 0,
            total_commits_difference: total,
            original_has_readme: true,
            fork_has_readme: true,
            readme_changed: false,
            readme_change_percentage: 0.0,
        }
    }

    #[test]
    fn filter_keeps_only_active_rows() {
        let rows = vec![
            row("a", 3, "2024-01-01T00:00:00Z", "2024-02-01T00:00:00Z"),
            row("b", 0, "2024-01-01T00:00:00Z", "2024-02-01T00:00:00Z"),
            row("c", 5, "2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z"),
            row("d", 5, "2024-01-01T00:00:00Z", "Never"),
        ];
        let active = filter_active(rows);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].fork_owner, "a");
    }

    #[test]
    fn unparseable_timestamps_sort_first() {
        assert_eq!(parse_timestamp("Never"), DateTime::<Utc>::MIN_UTC);
        assert_eq!(parse_timestamp(""), DateTime::<Utc>::MIN_UTC);
        assert_eq!(parse_timestamp("yesterday"), DateTime::<Utc>::MIN_UTC);
        assert_eq!(
            parse_timestamp("2024-01-01T00:00:00+00:00").timestamp(),
            1_704_067_200
        );
    }

    #[test]
    fn csv_written_then_read_back() {
        let rows = vec![
            row("a", 3, "2024-01-01T00:00:00Z", "2024-02-01T00:00:00Z"),
            row("b", 0, "2024-01-01T00:00:00Z", "2024-02-01T00:00:00Z"),
        ];
        let mut buffer = Vec::new();
        write_csv(&rows, &mut buffer).unwrap();

        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("original_repo,original_url,fork_owner,"));

        let parsed = read_csv(buffer.as_slice()).unwrap();
        assert_eq!(parsed, rows);
    }

    #[test]
    fn reads_capitalized_flags_and_extra_columns() {
        let csv_text = "\
commits_ahead,fork_name,fork_owner,fork_stars,fork_updated_at,forked_at,original_repo,readme_changed,total_commits_difference
4,widgets,jdoe,12,2024-05-01T00:00:00Z,2024-01-01T00:00:00Z,acme/widgets,True,4
";
        let rows = read_csv(csv_text.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fork_stars, 12);
        assert_eq!(rows[0].fork_open_issues, 0);
        assert!(rows[0].readme_changed);
        assert!(!rows[0].description_changed);
        assert!(rows[0].is_active());
    }

    #[test]
    fn invalid_flag_is_an_error() {
        let csv_text = "\
original_repo,fork_owner,fork_name,forked_at,fork_updated_at,readme_changed
acme/widgets,jdoe,widgets,2024-01-01T00:00:00Z,2024-05-01T00:00:00Z,maybe
";
        assert!(read_csv(csv_text.as_bytes()).is_err());
    }

    #[test]
    fn row_from_parts() {
        let origin = repository("acme/widgets");
        let mut fork = fork(
            "acme/widgets",
            "jdoe/widgets",
            "2024-01-01T00:00:00Z",
            "2024-03-01T00:00:00Z",
        );
        fork.repository.description = Some("Widgets for ACME Corp".to_string());
        fork.repository.pushed_at = None;
        fork.repository.stars = 7;
        fork.repository.open_issues = 2;
        let divergence = DivergenceRecord::new(
            "acme/widgets",
            "jdoe/widgets",
            4,
            2,
            fork.forked_at,
            fork.updated_at(),
        );
        let readme = ReadmeComparison::from_contents(Some("a"), Some("a"));

        let row = ForkExportRow::from_parts(&origin, &fork, &divergence, &readme);

        assert_eq!(row.original_repo, "acme/widgets");
        assert_eq!(row.fork_owner_url, "https://github.com/jdoe");
        assert_eq!(row.fork_pushed_at, NEVER);
        assert_eq!(row.fork_stars, 7);
        assert_eq!(row.fork_open_issues, 2);
        assert!(row.description_changed);
        assert_eq!(row.total_commits_difference, 6);
        assert!(row.is_active());
    }

    #[test]
    fn statistics_rank_most_active() {
        let mut org_row = row("big", 40, "2024-01-01T00:00:00Z", "2024-02-01T00:00:00Z");
        org_row.fork_owner_type = "Organization".to_string();
        org_row.readme_changed = true;
        let active = vec![
            row("small", 2, "2024-01-01T00:00:00Z", "2024-02-01T00:00:00Z"),
            org_row,
        ];

        let stats = ActivityStatistics::compute(5, &active);

        assert_eq!(stats.total_forks, 5);
        assert_eq!(stats.active_forks, 2);
        assert!((stats.average_commits_ahead - 21.0).abs() < f64::EPSILON);
        assert_eq!(stats.organization_forks, 1);
        assert_eq!(stats.user_forks, 1);
        assert_eq!(stats.readme_changes, 1);
        assert_eq!(stats.most_active[0].0, "big/widgets");
    }

    #[test]
    fn export_summary_totals_and_top_ten() {
        let mut rows: Vec<ForkExportRow> = (0..12)
            .map(|i| row(&format!("u{i}"), i, "2024-01-01T00:00:00Z", "2024-02-01T00:00:00Z"))
            .collect();
        rows[3].fork_stars = 5;
        rows[4].fork_stars = 1;
        rows[4].fork_open_issues = 3;
        rows[5].description_changed = true;
        rows[6].fork_owner_type = "Organization".to_string();
        // Ties with u11 and keeps export order behind it.
        rows[0].commits_ahead = 11;

        let summary = ExportSummary::compute(&rows);

        assert_eq!(summary.external_forks, 12);
        assert_eq!(summary.forks_ahead, 12);
        assert_eq!(summary.description_changes, 1);
        assert_eq!(summary.total_commits_ahead, 11 + (1..12).sum::<u64>());
        assert_eq!(summary.total_stars, 6);
        assert_eq!(summary.total_open_issues, 3);
        assert_eq!(summary.user_forks, 11);
        assert_eq!(summary.organization_forks, 1);
        assert_eq!(summary.top_forks.len(), ExportSummary::TOP);
        assert_eq!(summary.top_forks[0].0, "u0/widgets");
        assert_eq!(summary.top_forks[1].0, "u11/widgets");
        assert_eq!(summary.top_forks[9].1, 3);
    }
}
