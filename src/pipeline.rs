//! Drives discovery, divergence, classification and aggregation for one organization.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::classify::ChangeClassifier;
use crate::commits::CommitAnalyzer;
use crate::data::changes::ChangeFootprint;
use crate::data::divergence::ReadmeComparison;
use crate::data::export::ForkExportRow;
use crate::data::report::{ForkInsight, InsightsOutput, RunReport, UnitKind};
use crate::data::repository::{Fork, Repository};
use crate::discovery::RepoDiscovery;
use crate::divergence::DivergenceCalculator;
use crate::github::{GitHubClient, GitHubError};
use crate::intent::IntentAggregator;

/// Run settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Upper bound on external forks analyzed; the rest are dropped before any comparison.
    pub max_forks: Option<usize>,
    /// Emit insights for active forks only.
    pub active_only: bool,
}

/// Output of the discovery export run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutput {
    /// One row per analyzed fork.
    pub rows: Vec<ForkExportRow>,
    /// Run totals.
    pub report: RunReport,
}

/// Sequential pipeline over one organization.
///
/// Every request goes through the one client, so its quota state covers the whole run.
#[derive(Debug)]
pub struct Pipeline<'a> {
    client: &'a GitHubClient,
    organization: String,
    options: PipelineOptions,
    classifier: ChangeClassifier,
    commit_analyzer: CommitAnalyzer,
    aggregator: IntentAggregator,
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline with the built-in classification rules.
    pub fn new(
        client: &'a GitHubClient,
        organization: impl Into<String>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            client,
            organization: organization.into(),
            options,
            classifier: ChangeClassifier::new(),
            commit_analyzer: CommitAnalyzer::new(),
            aggregator: IntentAggregator::new(),
        }
    }

    /// Produces an intent summary for each external fork.
    ///
    /// Unit-level failures are recorded in the report and skipped; fatal
    /// errors abort the run without output.
    pub async fn run_insights(&self, cancel: &AtomicBool) -> Result<InsightsOutput, GitHubError> {
        let started = self.client.clock().now();
        let mut report = RunReport::new(&self.organization);
        let candidates = self.discover(&mut report, cancel).await?;
        let calculator = DivergenceCalculator::new(self.client);
        let mut insights = Vec::new();

        for (origin, fork) in candidates {
            if cancel.load(Ordering::SeqCst) {
                info!("Cancellation requested, stopping before {}", fork.full_name());
                report.cancelled = true;
                break;
            }

            let divergence = match calculator.compute_with_changes(&origin, &fork).await {
                Ok(divergence) => divergence,
                Err(err) => {
                    self.skip_or_abort(&mut report, UnitKind::Fork, fork.full_name(), err)?;
                    continue;
                }
            };

            report.forks_processed += 1;
            if divergence.record.is_active() {
                report.active_forks += 1;
            } else if self.options.active_only {
                debug!(fork = %fork.full_name(), "Inactive fork left out of insights");
                continue;
            }

            let histogram = self
                .classifier
                .classify(divergence.changes.iter().map(|change| change.path.as_str()));
            let summary = self
                .aggregator
                .summarize(&fork, &divergence.record, &histogram);
            info!(
                fork = %fork.full_name(),
                focus = %summary.development_focus,
                direction = %summary.strategic_direction,
                "Summarized fork"
            );

            insights.push(ForkInsight {
                summary,
                footprint: ChangeFootprint::from_changes(&divergence.changes),
                commits: self.commit_analyzer.analyze(&divergence.commit_titles),
                divergence: divergence.record,
                histogram,
                description_changed: description_changed(&origin, &fork),
            });
        }

        self.finish(&mut report, started);
        Ok(InsightsOutput { insights, report })
    }

    /// Produces the tabular discovery export, one row per external fork.
    ///
    /// Each origin README is fetched once and reused for all of its forks.
    pub async fn run_export(&self, cancel: &AtomicBool) -> Result<ExportOutput, GitHubError> {
        let started = self.client.clock().now();
        let mut report = RunReport::new(&self.organization);
        let candidates = self.discover(&mut report, cancel).await?;
        let calculator = DivergenceCalculator::new(self.client);
        let mut rows = Vec::new();
        let mut origin_readmes: HashMap<String, Option<String>> = HashMap::new();

        for (origin, fork) in candidates {
            if cancel.load(Ordering::SeqCst) {
                info!("Cancellation requested, stopping before {}", fork.full_name());
                report.cancelled = true;
                break;
            }

            let analyzed = async {
                let record = calculator.compute(&origin, &fork).await?;
                let origin_readme = match origin_readmes.get(&origin.full_name) {
                    Some(cached) => cached.clone(),
                    None => {
                        let fetched = calculator.readme(&origin.full_name).await?;
                        origin_readmes.insert(origin.full_name.clone(), fetched.clone());
                        fetched
                    }
                };
                let fork_readme = calculator.readme(fork.full_name()).await?;
                let readme = ReadmeComparison::from_contents(
                    origin_readme.as_deref(),
                    fork_readme.as_deref(),
                );
                Ok::<_, GitHubError>((record, readme))
            }
            .await;
            let (record, readme) = match analyzed {
                Ok(pair) => pair,
                Err(err) => {
                    self.skip_or_abort(&mut report, UnitKind::Fork, fork.full_name(), err)?;
                    continue;
                }
            };

            report.forks_processed += 1;
            if record.is_active() {
                report.active_forks += 1;
            }
            rows.push(ForkExportRow::from_parts(&origin, &fork, &record, &readme));
        }

        self.finish(&mut report, started);
        Ok(ExportOutput { rows, report })
    }

    /// Lists repositories and their external forks, applying the fork limit.
    ///
    /// On cancellation the forks found so far are returned and the report is
    /// marked cancelled; the caller then stops before its first fork.
    async fn discover(
        &self,
        report: &mut RunReport,
        cancel: &AtomicBool,
    ) -> Result<Vec<(Repository, Fork)>, GitHubError> {
        let mut discovery = RepoDiscovery::new(self.client, self.organization.as_str());
        let repositories = discovery.list_repositories().await?;
        report.repositories_scanned = repositories.len();

        let mut candidates = Vec::new();
        for repository in repositories {
            if cancel.load(Ordering::SeqCst) {
                info!(
                    "Cancellation requested, stopping discovery before {}",
                    repository.full_name
                );
                report.cancelled = true;
                break;
            }
            let partition = match discovery.external_forks(&repository).await {
                Ok(partition) => partition,
                Err(err) => {
                    self.skip_or_abort(report, UnitKind::Repository, &repository.full_name, err)?;
                    continue;
                }
            };
            report.forks_discovered += partition.internal.len() + partition.external.len();
            report.internal_forks_excluded += partition.internal.len();
            candidates.extend(
                partition
                    .external
                    .into_iter()
                    .map(|fork| (repository.clone(), fork)),
            );
        }

        if let Some(max) = self.options.max_forks {
            if candidates.len() > max {
                report.forks_truncated = candidates.len() - max;
                info!(
                    limit = max,
                    dropped = report.forks_truncated,
                    "Truncating external forks to the processing limit"
                );
                candidates.truncate(max);
            }
        }

        info!(
            repositories = report.repositories_scanned,
            external_forks = candidates.len(),
            "Discovery complete"
        );
        Ok(candidates)
    }

    fn skip_or_abort(
        &self,
        report: &mut RunReport,
        kind: UnitKind,
        name: &str,
        err: GitHubError,
    ) -> Result<(), GitHubError> {
        if !report.record_skip(kind, name, &err) {
            return Err(err);
        }
        warn!(unit = name, error = %err, "Skipping unit");
        Ok(())
    }

    fn finish(&self, report: &mut RunReport, started: DateTime<Utc>) {
        let quota = self.client.rate_limit_snapshot();
        report.set_quota_wait(quota.total_wait(), quota.wait_count());
        report.api_requests = self.client.request_count();
        report.elapsed_seconds = (self.client.clock().now() - started)
            .to_std()
            .map_or(0.0, |d| d.as_secs_f64());
    }
}

fn description_changed(origin: &Repository, fork: &Fork) -> bool {
    origin.description.as_deref().unwrap_or_default()
        != fork.repository.description.as_deref().unwrap_or_default()
}
