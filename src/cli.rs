//! CLI interface for forkscope.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use crate::github::client::DEFAULT_PER_PAGE;
use crate::github::retry::DEFAULT_MAX_ATTEMPTS;
use crate::github::{ClientConfig, GitHubClient, RetryPolicy, DEFAULT_API_URL};
use crate::utils::settings::{Settings, API_URL_VAR, ORG_VAR};

pub mod active;
pub mod forks;
pub mod insights;

/// forkscope: explains how an organization's repositories are being forked.
#[derive(Parser)]
#[command(name = "forkscope")]
#[command(
    about = "Discovers external forks of an organization's repositories and explains how they diverged",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Exports every external fork with its divergence as CSV.
    Forks(forks::ForksCommand),
    /// Filters a fork export down to active forks.
    Active(active::ActiveCommand),
    /// Classifies external forks and writes intent summaries.
    Insights(insights::InsightsCommand),
}

impl Cli {
    /// Executes the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Forks(cmd) => cmd.execute().await,
            Commands::Active(cmd) => cmd.execute(),
            Commands::Insights(cmd) => cmd.execute().await,
        }
    }
}

/// Connection options shared by the commands that call the API.
#[derive(Args, Debug, Clone)]
pub struct GitHubArgs {
    /// Organization login (falls back to GITHUB_ORG).
    #[arg(long, env = ORG_VAR)]
    pub org: Option<String>,

    /// API root, for GitHub Enterprise (falls back to GITHUB_API_URL).
    #[arg(long, env = API_URL_VAR)]
    pub api_url: Option<String>,

    /// Items requested per listing page (1-100).
    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    pub per_page: u32,

    /// Attempts per request before a transient failure skips the unit.
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
}

impl GitHubArgs {
    /// Resolves the organization and builds the client.
    ///
    /// The token comes from GITHUB_TOKEN or the settings file; without one the
    /// client runs unauthenticated.
    pub fn connect(&self) -> Result<(GitHubClient, String)> {
        let settings = Settings::load()?;

        let organization = self
            .org
            .clone()
            .filter(|o| !o.trim().is_empty())
            .or_else(|| settings.get_env_var(ORG_VAR));
        let Some(organization) = organization else {
            bail!("No organization given. Pass --org or set {ORG_VAR}");
        };

        let base_url = self
            .api_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| settings.get_env_var(API_URL_VAR))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let token = settings.token();
        if token.is_none() {
            warn!("GITHUB_TOKEN is not set; running unauthenticated with a reduced quota");
        }

        let config = ClientConfig {
            per_page: self.per_page,
            retry: RetryPolicy {
                max_attempts: self.max_attempts.max(1),
                ..RetryPolicy::default()
            },
            ..ClientConfig::new(base_url, token)
        };
        let client = GitHubClient::new(config).context("Failed to create GitHub client")?;
        Ok((client, organization.trim().to_string()))
    }
}

/// Returns a flag set on the first Ctrl-C; a second Ctrl-C exits immediately.
pub(crate) fn cancellation_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    drop(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupt received, finishing the current fork");
        handler_flag.store(true, Ordering::SeqCst);
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    }));
    flag
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_insights_options() {
        let cli = Cli::try_parse_from([
            "forkscope",
            "insights",
            "--org",
            "acme",
            "--max-forks",
            "5",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Insights(cmd) => {
                assert_eq!(cmd.github.org.as_deref(), Some("acme"));
                assert_eq!(cmd.max_forks, Some(5));
                assert_eq!(cmd.format, "json");
                assert_eq!(cmd.github.per_page, DEFAULT_PER_PAGE);
            }
            _ => panic!("expected insights command"),
        }
    }

    #[test]
    fn parses_active_input() {
        let cli = Cli::try_parse_from(["forkscope", "active", "forks.csv"]).unwrap();
        assert!(matches!(cli.command, Commands::Active(_)));
    }
}
