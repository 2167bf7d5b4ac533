//! Turns a fork's divergence and category histogram into an intent summary.

use std::cmp::Reverse;

use crate::data::divergence::DivergenceRecord;
use crate::data::intent::{
    CategoryHistogram, ChangeCategory, DevelopmentFocus, IntentSummary, StrategicDirection,
};
use crate::data::repository::{Fork, OwnerKind};

/// A category with at least this many files is eligible as the focus.
pub const MIN_FOCUS_FILES: usize = 2;

/// A category with at least this share of the files, in percent, is eligible as the focus.
pub const MIN_FOCUS_PERCENT: usize = 10;

/// Divergence above which infrastructure work reads as production adaptation.
pub const PRODUCTION_DIVERGENCE: u64 = 10;

/// File count above which API or data work reads as an integration strategy.
pub const INTEGRATION_FILES: usize = 20;

/// File count up to which documentation-only work reads as rebranding.
pub const REBRANDING_MAX_FILES: usize = 5;

/// Number of technical areas named in the narrative.
const NARRATIVE_AREAS: usize = 3;

/// Deterministic rule-based aggregator. Performs no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentAggregator;

impl IntentAggregator {
    /// Creates an aggregator.
    pub fn new() -> Self {
        Self
    }

    /// Builds the intent summary for one fork.
    #[must_use]
    pub fn summarize(
        &self,
        fork: &Fork,
        divergence: &DivergenceRecord,
        histogram: &CategoryHistogram,
    ) -> IntentSummary {
        let development_focus = self.development_focus(histogram);
        let strategic_direction = self.strategic_direction(development_focus, histogram, divergence);
        let technical_areas = histogram.technical_areas();
        let narrative = render_narrative(
            &fork.owner,
            fork.owner_kind,
            &fork.origin,
            &histogram.dominant_areas(NARRATIVE_AREAS),
            histogram.files(),
            development_focus,
            strategic_direction,
        );

        IntentSummary {
            fork: fork.full_name().to_string(),
            fork_url: fork.html_url().to_string(),
            owner: fork.owner.clone(),
            owner_kind: fork.owner_kind,
            origin: fork.origin.clone(),
            development_focus,
            strategic_direction,
            narrative,
            technical_areas,
            files_modified: histogram.files(),
        }
    }

    /// The eligible category with the most files; ties go to the higher precedence.
    #[must_use]
    pub fn development_focus(&self, histogram: &CategoryHistogram) -> DevelopmentFocus {
        let files = histogram.files();
        histogram
            .counts()
            .iter()
            .filter(|(_, count)| {
                **count >= MIN_FOCUS_FILES || **count * 100 >= files * MIN_FOCUS_PERCENT
            })
            .min_by_key(|(category, count)| (Reverse(**count), category.focus_rank()))
            .map_or(DevelopmentFocus::GeneralImprovement, |(category, _)| {
                DevelopmentFocus::from(*category)
            })
    }

    /// First matching rule of the direction table.
    #[must_use]
    pub fn strategic_direction(
        &self,
        focus: DevelopmentFocus,
        histogram: &CategoryHistogram,
        divergence: &DivergenceRecord,
    ) -> StrategicDirection {
        let hardening = focus == DevelopmentFocus::Security
            || (histogram.contains(ChangeCategory::Security)
                && histogram.contains(ChangeCategory::Testing));
        if hardening {
            return StrategicDirection::EnterpriseHardening;
        }

        let operational = matches!(
            focus,
            DevelopmentFocus::Infrastructure | DevelopmentFocus::Configuration
        );
        if operational && divergence.total_difference() > PRODUCTION_DIVERGENCE {
            return StrategicDirection::ProductionAdaptation;
        }

        let backend = matches!(focus, DevelopmentFocus::Api | DevelopmentFocus::Database);
        if backend && histogram.files() > INTEGRATION_FILES {
            return StrategicDirection::IntegrationStrategy;
        }

        let documentation_only = !histogram.is_empty()
            && histogram
                .counts()
                .keys()
                .all(|c| *c == ChangeCategory::Documentation);
        if documentation_only && histogram.files() <= REBRANDING_MAX_FILES {
            return StrategicDirection::RebrandingProductization;
        }

        StrategicDirection::Modernization
    }
}

fn render_narrative(
    owner: &str,
    owner_kind: OwnerKind,
    origin: &str,
    areas: &[ChangeCategory],
    files: usize,
    focus: DevelopmentFocus,
    direction: StrategicDirection,
) -> String {
    let who = match owner_kind {
        OwnerKind::Organization => "Organization",
        OwnerKind::User => "Developer",
    };
    let noun = if files == 1 { "file" } else { "files" };
    let areas: Vec<&str> = areas.iter().map(|c| c.as_str()).collect();

    format!(
        "{who} '{owner}' forked {origin} and modified {files} {noun}. \
         The changes concentrate on {}. \
         Development focus: {focus}. Strategic direction: {direction}.",
        join_areas(&areas)
    )
}

fn join_areas(areas: &[&str]) -> String {
    match areas {
        [] => "no classified areas".to_string(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::repository::fixtures::{fork, ts};

    fn sample_fork() -> Fork {
        fork(
            "acme/widgets",
            "jdoe/widgets",
            "2024-01-01T00:00:00Z",
            "2024-06-01T00:00:00Z",
        )
    }

    fn record(ahead: u32, behind: u32) -> DivergenceRecord {
        DivergenceRecord::new(
            "acme/widgets",
            "jdoe/widgets",
            ahead,
            behind,
            ts("2024-01-01T00:00:00Z"),
            ts("2024-06-01T00:00:00Z"),
        )
    }

    fn histogram(counts: &[(ChangeCategory, usize)], files: usize) -> CategoryHistogram {
        CategoryHistogram::from_counts(counts.iter().copied(), files)
    }

    #[test]
    fn infrastructure_dominates_container_scenario() {
        let aggregator = IntentAggregator::new();
        let h = histogram(
            &[
                (ChangeCategory::Infrastructure, 2),
                (ChangeCategory::Documentation, 1),
            ],
            3,
        );
        let summary = aggregator.summarize(&sample_fork(), &record(12, 0), &h);

        assert_eq!(summary.development_focus, DevelopmentFocus::Infrastructure);
        assert_eq!(
            summary.strategic_direction,
            StrategicDirection::ProductionAdaptation
        );
        assert_eq!(
            summary.technical_areas,
            vec![ChangeCategory::Documentation, ChangeCategory::Infrastructure]
        );
        assert_eq!(summary.files_modified, 3);
    }

    #[test]
    fn ties_break_by_precedence() {
        let aggregator = IntentAggregator::new();
        let h = histogram(
            &[
                (ChangeCategory::Frontend, 4),
                (ChangeCategory::Database, 4),
                (ChangeCategory::Api, 4),
            ],
            12,
        );
        assert_eq!(aggregator.development_focus(&h), DevelopmentFocus::Database);
    }

    #[test]
    fn small_share_is_not_eligible() {
        let aggregator = IntentAggregator::new();
        let h = histogram(&[(ChangeCategory::Security, 1)], 40);
        assert_eq!(
            aggregator.development_focus(&h),
            DevelopmentFocus::GeneralImprovement
        );
    }

    #[test]
    fn ten_percent_share_is_eligible() {
        let aggregator = IntentAggregator::new();
        let h = histogram(&[(ChangeCategory::Security, 1)], 10);
        assert_eq!(aggregator.development_focus(&h), DevelopmentFocus::Security);
    }

    #[test]
    fn empty_histogram_is_general_improvement() {
        let aggregator = IntentAggregator::new();
        let h = CategoryHistogram::default();
        let summary = aggregator.summarize(&sample_fork(), &record(0, 0), &h);
        assert_eq!(
            summary.development_focus,
            DevelopmentFocus::GeneralImprovement
        );
        assert_eq!(summary.strategic_direction, StrategicDirection::Modernization);
        assert!(summary.narrative.contains("no classified areas"));
    }

    #[test]
    fn security_with_tests_is_hardening() {
        let aggregator = IntentAggregator::new();
        let h = histogram(
            &[
                (ChangeCategory::Frontend, 10),
                (ChangeCategory::Security, 1),
                (ChangeCategory::Testing, 1),
            ],
            30,
        );
        let focus = aggregator.development_focus(&h);
        assert_eq!(focus, DevelopmentFocus::Frontend);
        assert_eq!(
            aggregator.strategic_direction(focus, &h, &record(3, 0)),
            StrategicDirection::EnterpriseHardening
        );
    }

    #[test]
    fn small_infrastructure_divergence_is_modernization() {
        let aggregator = IntentAggregator::new();
        let h = histogram(&[(ChangeCategory::Infrastructure, 3)], 3);
        let focus = aggregator.development_focus(&h);
        assert_eq!(
            aggregator.strategic_direction(focus, &h, &record(10, 0)),
            StrategicDirection::Modernization
        );
        assert_eq!(
            aggregator.strategic_direction(focus, &h, &record(10, 1)),
            StrategicDirection::ProductionAdaptation
        );
    }

    #[test]
    fn large_api_change_is_integration() {
        let aggregator = IntentAggregator::new();
        let h = histogram(
            &[(ChangeCategory::Api, 15), (ChangeCategory::Other, 8)],
            21,
        );
        let focus = aggregator.development_focus(&h);
        assert_eq!(focus, DevelopmentFocus::Api);
        assert_eq!(
            aggregator.strategic_direction(focus, &h, &record(5, 0)),
            StrategicDirection::IntegrationStrategy
        );
    }

    #[test]
    fn documentation_only_is_rebranding() {
        let aggregator = IntentAggregator::new();
        let h = histogram(&[(ChangeCategory::Documentation, 2)], 2);
        let focus = aggregator.development_focus(&h);
        assert_eq!(
            aggregator.strategic_direction(focus, &h, &record(2, 0)),
            StrategicDirection::RebrandingProductization
        );

        let larger = histogram(&[(ChangeCategory::Documentation, 6)], 6);
        assert_eq!(
            aggregator.strategic_direction(focus, &larger, &record(2, 0)),
            StrategicDirection::Modernization
        );
    }

    #[test]
    fn narrative_template() {
        let aggregator = IntentAggregator::new();
        let h = histogram(
            &[
                (ChangeCategory::Infrastructure, 2),
                (ChangeCategory::Documentation, 1),
            ],
            3,
        );
        let summary = aggregator.summarize(&sample_fork(), &record(12, 0), &h);
        insta::assert_snapshot!(
            summary.narrative,
            @"Developer 'jdoe' forked acme/widgets and modified 3 files. The changes concentrate on documentation and infrastructure. Development focus: infrastructure. Strategic direction: production-adaptation."
        );
    }

    #[test]
    fn narrative_names_at_most_three_areas() {
        let mut organization_fork = sample_fork();
        organization_fork.owner_kind = OwnerKind::Organization;
        let h = histogram(
            &[
                (ChangeCategory::Testing, 1),
                (ChangeCategory::Api, 1),
                (ChangeCategory::Security, 1),
                (ChangeCategory::Frontend, 1),
            ],
            1,
        );
        let summary = IntentAggregator::new().summarize(&organization_fork, &record(1, 0), &h);

        assert!(summary
            .narrative
            .starts_with("Organization 'jdoe' forked acme/widgets and modified 1 file."));
        assert!(summary
            .narrative
            .contains("concentrate on api, frontend and security."));
        assert_eq!(summary.technical_areas.len(), 4);
    }

    #[test]
    fn narrative_keeps_the_dominant_area() {
        let h = histogram(
            &[
                (ChangeCategory::Infrastructure, 6),
                (ChangeCategory::Api, 1),
                (ChangeCategory::Configuration, 1),
                (ChangeCategory::Documentation, 1),
            ],
            8,
        );
        let summary = IntentAggregator::new().summarize(&sample_fork(), &record(20, 0), &h);

        assert_eq!(summary.development_focus, DevelopmentFocus::Infrastructure);
        assert!(summary
            .narrative
            .contains("concentrate on api, configuration and infrastructure."));
        assert_eq!(summary.technical_areas.len(), 4);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let aggregator = IntentAggregator::new();
        let h = histogram(
            &[
                (ChangeCategory::Security, 3),
                (ChangeCategory::Testing, 2),
                (ChangeCategory::Configuration, 1),
            ],
            5,
        );
        let first = aggregator.summarize(&sample_fork(), &record(4, 1), &h);
        let second = aggregator.summarize(&sample_fork(), &record(4, 1), &h);
        assert_eq!(first, second);
        assert_eq!(first.narrative.as_bytes(), second.narrative.as_bytes());
    }
}
