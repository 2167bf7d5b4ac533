//! `insights` command: intent summaries for external forks.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::cli::{cancellation_flag, GitHubArgs};
use crate::data::output::{render, write_document, OutputFormat};
use crate::pipeline::{Pipeline, PipelineOptions};

/// Insights command options.
#[derive(Parser)]
pub struct InsightsCommand {
    /// Connection options.
    #[command(flatten)]
    pub github: GitHubArgs,

    /// Maximum number of external forks to analyze.
    #[arg(long)]
    pub max_forks: Option<usize>,

    /// Also summarize forks that are not active.
    #[arg(long)]
    pub include_inactive: bool,

    /// Output format: yaml or json.
    #[arg(long, default_value = "yaml")]
    pub format: String,

    /// File to write (defaults to stdout).
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl InsightsCommand {
    /// Executes the insights command.
    pub async fn execute(self) -> Result<()> {
        let format: OutputFormat = self.format.parse()?;
        let (client, organization) = self.github.connect()?;
        let options = PipelineOptions {
            max_forks: self.max_forks,
            active_only: !self.include_inactive,
        };
        let cancel = cancellation_flag();

        let output = Pipeline::new(&client, organization.as_str(), options)
            .run_insights(&cancel)
            .await
            .with_context(|| format!("Fork analysis for {organization} aborted"))?;

        let document = render(&output, format)?;
        write_document(&document, self.output.as_deref())?;

        eprint!("{}", output.report.render_summary());
        Ok(())
    }
}
