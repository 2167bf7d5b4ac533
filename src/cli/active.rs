//! `active` command: filters a fork export down to active forks.

use std::fmt::Write as _;
use std::fs::File;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::data::export::{filter_active, load_csv, write_csv, ActivityStatistics};

/// Filter command options.
#[derive(Parser)]
pub struct ActiveCommand {
    /// Fork export written by the `forks` command.
    pub input: PathBuf,

    /// CSV file to write (defaults to stdout).
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl ActiveCommand {
    /// Executes the active command.
    pub fn execute(self) -> Result<()> {
        let rows = load_csv(&self.input)?;
        let total = rows.len();
        let active = filter_active(rows);

        match &self.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                write_csv(&active, file)?;
            }
            None => write_csv(&active, io::stdout().lock())?,
        }

        eprint!("{}", render_statistics(&ActivityStatistics::compute(total, &active)));
        Ok(())
    }
}

/// Human-readable statistics block.
pub fn render_statistics(stats: &ActivityStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Forks read: {}", stats.total_forks);
    let _ = writeln!(out, "Active forks: {}", stats.active_forks);
    if stats.active_forks == 0 {
        return out;
    }
    let _ = writeln!(
        out,
        "Average commits ahead: {:.1}",
        stats.average_commits_ahead
    );
    let _ = writeln!(out, "Description changes: {}", stats.description_changes);
    let _ = writeln!(out, "README changes: {}", stats.readme_changes);
    let _ = writeln!(
        out,
        "Owners: {} user(s), {} organization(s)",
        stats.user_forks, stats.organization_forks
    );
    let _ = writeln!(out, "Most active:");
    for (name, ahead, url) in &stats.most_active {
        let _ = writeln!(out, "  {name}: {ahead} commit(s) ahead ({url})");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_statistics_stop_after_counts() {
        let text = render_statistics(&ActivityStatistics::compute(4, &[]));
        assert_eq!(text, "Forks read: 4\nActive forks: 0\n");
    }
}
