//! Feature phrases and development themes from commit titles.

use std::sync::LazyLock;

use regex::Regex;

use crate::data::changes::{CommitAnalysis, CommitTheme};

/// Commits considered per fork, in comparison order.
pub const COMMIT_SAMPLE: usize = 20;

const MATCHES_PER_PATTERN: usize = 3;
const KEY_FEATURES: usize = 5;
const THEMES: usize = 3;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "with", "tests", "test",
];

// Verb, then the next one to three words.
const FEATURE_SOURCES: [&str; 6] = [
    r"add(?:ed|ing)?\s+(\w+(?:\s+\w+){0,2})",
    r"implement(?:ed|ing)?\s+(\w+(?:\s+\w+){0,2})",
    r"support\s+for\s+(\w+(?:\s+\w+){0,2})",
    r"new\s+(\w+(?:\s+\w+){0,2})",
    r"enabled?\s+(\w+(?:\s+\w+){0,2})",
    r"integrated?\s+(\w+(?:\s+\w+){0,2})",
];

static FEATURE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    FEATURE_SOURCES
        .iter()
        .filter_map(|source| Regex::new(source).ok())
        .collect()
});

/// Reads commit titles for what a fork adds and what kind of work it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitAnalyzer;

impl CommitAnalyzer {
    /// Creates an analyzer.
    pub fn new() -> Self {
        Self
    }

    /// Analyzes up to [`COMMIT_SAMPLE`] titles.
    pub fn analyze(&self, titles: &[String]) -> CommitAnalysis {
        let commit_sample: Vec<String> = titles
            .iter()
            .map(|title| title.trim())
            .filter(|title| !title.is_empty())
            .take(COMMIT_SAMPLE)
            .map(str::to_string)
            .collect();
        if commit_sample.is_empty() {
            return CommitAnalysis::default();
        }

        let text = commit_sample.join(" ").to_lowercase();
        CommitAnalysis {
            key_features: key_features(&text),
            themes: themes(&text),
            commit_sample,
        }
    }
}

fn key_features(text: &str) -> Vec<String> {
    FEATURE_PATTERNS
        .iter()
        .flat_map(|pattern| {
            pattern
                .captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .take(MATCHES_PER_PATTERN)
                .map(|m| m.as_str().trim().to_string())
                .collect::<Vec<_>>()
        })
        .take(KEY_FEATURES)
        .filter(|phrase| phrase.len() > 3 && !STOP_WORDS.contains(&phrase.as_str()))
        .collect()
}

/// Themes with a positive keyword count, strongest first; ties keep [`CommitTheme::ALL`] order.
fn themes(text: &str) -> Vec<CommitTheme> {
    let mut scored: Vec<(CommitTheme, usize)> = CommitTheme::ALL
        .iter()
        .map(|&theme| {
            let score = theme
                .keywords()
                .iter()
                .map(|keyword| text.matches(keyword).count())
                .sum();
            (theme, score)
        })
        .filter(|&(_, score)| score > 0)
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.into_iter().take(THEMES).map(|(theme, _)| theme).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn every_feature_pattern_compiles() {
        assert_eq!(FEATURE_PATTERNS.len(), FEATURE_SOURCES.len());
    }

    #[test]
    fn extracts_feature_phrases() {
        let analysis = CommitAnalyzer::new().analyze(&titles(&[
            "Add Helm chart for staging",
            "Implement SAML login",
            "Added support for Postgres replicas",
        ]));

        assert_eq!(
            analysis.key_features,
            vec![
                "helm chart for",
                "support for postgres",
                "saml login added",
                "postgres replicas",
            ]
        );
    }

    #[test]
    fn short_and_stop_word_phrases_are_dropped() {
        let analyzer = CommitAnalyzer::new();

        let stop_word = analyzer.analyze(&titles(&["Added tests"]));
        assert!(stop_word.key_features.is_empty());
        assert_eq!(stop_word.commit_sample, vec!["Added tests"]);

        let short = analyzer.analyze(&titles(&["Enable TLS"]));
        assert!(short.key_features.is_empty());
    }

    #[test]
    fn themes_rank_by_keyword_count() {
        let analysis = CommitAnalyzer::new().analyze(&titles(&[
            "Fix crash on startup",
            "Fix typo",
            "Improve logging",
            "Refactor config loader",
            "Secure the admin endpoint",
        ]));

        // bug_fixes 2; improvements, security and refactoring 1 each.
        assert_eq!(
            analysis.themes,
            vec![
                CommitTheme::BugFixes,
                CommitTheme::Improvements,
                CommitTheme::Security,
            ]
        );
    }

    #[test]
    fn sample_is_capped_and_skips_blank_titles() {
        let mut many: Vec<String> = (0..30).map(|i| format!("Commit {i}")).collect();
        many.insert(0, "   ".to_string());
        let analysis = CommitAnalyzer::new().analyze(&many);
        assert_eq!(analysis.commit_sample.len(), COMMIT_SAMPLE);
        assert_eq!(analysis.commit_sample[0], "Commit 0");
    }

    #[test]
    fn no_titles_no_analysis() {
        assert_eq!(CommitAnalyzer::new().analyze(&[]), CommitAnalysis::default());
    }
}
