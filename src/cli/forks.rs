//! `forks` command: tabular export of external forks.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::cli::{cancellation_flag, GitHubArgs};
use crate::data::export::{write_csv, ExportSummary};
use crate::pipeline::{Pipeline, PipelineOptions};

/// Export command options.
#[derive(Parser)]
pub struct ForksCommand {
    /// Connection options.
    #[command(flatten)]
    pub github: GitHubArgs,

    /// Maximum number of external forks to analyze.
    #[arg(long)]
    pub max_forks: Option<usize>,

    /// CSV file to write (defaults to stdout).
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Text file for the export summary (defaults to stderr).
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

impl ForksCommand {
    /// Executes the forks command.
    pub async fn execute(self) -> Result<()> {
        let (client, organization) = self.github.connect()?;
        let options = PipelineOptions {
            max_forks: self.max_forks,
            active_only: false,
        };
        let cancel = cancellation_flag();

        let output = Pipeline::new(&client, organization.as_str(), options)
            .run_export(&cancel)
            .await
            .with_context(|| format!("Fork discovery for {organization} aborted"))?;

        match &self.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                write_csv(&output.rows, file)?;
                info!(path = %path.display(), rows = output.rows.len(), "Wrote fork export");
            }
            None => write_csv(&output.rows, io::stdout().lock())?,
        }

        let summary = render_export_summary(&organization, &ExportSummary::compute(&output.rows));
        match &self.summary {
            Some(path) => {
                fs::write(path, &summary)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!(path = %path.display(), "Wrote export summary");
            }
            None => eprint!("{summary}"),
        }

        eprint!("{}", output.report.render_summary());
        Ok(())
    }
}

/// Plain-text summary of an export.
pub fn render_export_summary(organization: &str, summary: &ExportSummary) -> String {
    let rule = "-".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "Fork export summary for {organization}");
    let _ = writeln!(
        out,
        "External forks analyzed: {} (member forks excluded)",
        summary.external_forks
    );
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Forks with commits ahead: {}", summary.forks_ahead);
    let _ = writeln!(out, "Description changes: {}", summary.description_changes);
    let _ = writeln!(out, "README changes: {}", summary.readme_changes);
    let _ = writeln!(out, "Total commits ahead: {}", summary.total_commits_ahead);
    let _ = writeln!(out, "Total stars: {}", summary.total_stars);
    let _ = writeln!(out, "Total open issues: {}", summary.total_open_issues);
    let _ = writeln!(
        out,
        "Owners: {} user(s), {} organization(s)",
        summary.user_forks, summary.organization_forks
    );
    if summary.top_forks.is_empty() {
        return out;
    }
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Top forks by commits ahead:");
    for (rank, (name, ahead, url)) in summary.top_forks.iter().enumerate() {
        let _ = writeln!(out, "{}. {name}: {ahead} commit(s) ahead", rank + 1);
        let _ = writeln!(out, "   {url}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_totals_and_ranked_forks() {
        let summary = ExportSummary {
            external_forks: 2,
            forks_ahead: 1,
            description_changes: 0,
            readme_changes: 1,
            total_commits_ahead: 9,
            total_stars: 4,
            total_open_issues: 1,
            user_forks: 2,
            organization_forks: 0,
            top_forks: vec![
                ("jdoe/widgets".to_string(), 9, "https://github.com/jdoe/widgets".to_string()),
                ("idle/widgets".to_string(), 0, "https://github.com/idle/widgets".to_string()),
            ],
        };

        let text = render_export_summary("acme", &summary);

        assert!(text.starts_with("Fork export summary for acme\n"));
        assert!(text.contains("Total stars: 4\n"));
        assert!(text.contains("1. jdoe/widgets: 9 commit(s) ahead\n   https://github.com/jdoe/widgets\n"));
        assert!(text.contains("2. idle/widgets: 0 commit(s) ahead"));
    }

    #[test]
    fn empty_export_has_no_ranking() {
        let summary = ExportSummary::compute(&[]);
        let text = render_export_summary("acme", &summary);
        assert!(text.contains("External forks analyzed: 0"));
        assert!(!text.contains("Top forks"));
    }
}
