//! Path-based change classification.

use std::collections::BTreeSet;

use crate::data::intent::{CategoryHistogram, ChangeCategory};

/// A pattern and the category it assigns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRule {
    /// Lowercase substring matched against the lowercased path.
    pub pattern: String,
    /// Category assigned on a match.
    pub category: ChangeCategory,
}

impl ClassificationRule {
    /// Creates a rule; the pattern is stored lowercase.
    pub fn new(pattern: &str, category: ChangeCategory) -> Self {
        Self {
            pattern: pattern.to_lowercase(),
            category,
        }
    }
}

/// Built-in rule table, in evaluation order.
pub const DEFAULT_RULES: &[(&str, ChangeCategory)] = &[
    ("docker", ChangeCategory::Infrastructure),
    (".github/workflows", ChangeCategory::Infrastructure),
    ("helm", ChangeCategory::Infrastructure),
    ("k8s", ChangeCategory::Infrastructure),
    ("terraform", ChangeCategory::Infrastructure),
    ("deploy", ChangeCategory::Infrastructure),
    ("api", ChangeCategory::Api),
    ("routes", ChangeCategory::Api),
    ("controller", ChangeCategory::Api),
    ("endpoint", ChangeCategory::Api),
    ("model", ChangeCategory::Database),
    ("schema", ChangeCategory::Database),
    ("migration", ChangeCategory::Database),
    ("database", ChangeCategory::Database),
    (".sql", ChangeCategory::Database),
    ("auth", ChangeCategory::Security),
    ("security", ChangeCategory::Security),
    ("token", ChangeCategory::Security),
    ("crypto", ChangeCategory::Security),
    ("permission", ChangeCategory::Security),
    ("component", ChangeCategory::Frontend),
    ("ui", ChangeCategory::Frontend),
    ("style", ChangeCategory::Frontend),
    (".css", ChangeCategory::Frontend),
    (".html", ChangeCategory::Frontend),
    ("frontend", ChangeCategory::Frontend),
    ("test", ChangeCategory::Testing),
    ("spec", ChangeCategory::Testing),
    ("__tests__", ChangeCategory::Testing),
    ("config", ChangeCategory::Configuration),
    (".env", ChangeCategory::Configuration),
    ("settings", ChangeCategory::Configuration),
    ("compose", ChangeCategory::Configuration),
    ("readme", ChangeCategory::Documentation),
    ("docs", ChangeCategory::Documentation),
    (".md", ChangeCategory::Documentation),
];

/// Multi-label classifier over file paths.
#[derive(Debug, Clone)]
pub struct ChangeClassifier {
    rules: Vec<ClassificationRule>,
}

impl Default for ChangeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeClassifier {
    /// Classifier with the built-in rules.
    pub fn new() -> Self {
        Self::with_rules(
            DEFAULT_RULES
                .iter()
                .map(|(pattern, category)| ClassificationRule::new(pattern, *category)),
        )
    }

    /// Classifier with a custom rule table.
    pub fn with_rules(rules: impl IntoIterator<Item = ClassificationRule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    /// Every category whose pattern occurs in `path`, or `{other}` when none does.
    #[must_use]
    pub fn classify_file(&self, path: &str) -> BTreeSet<ChangeCategory> {
        let path = path.to_lowercase();
        let mut categories: BTreeSet<ChangeCategory> = self
            .rules
            .iter()
            .filter(|rule| path.contains(rule.pattern.as_str()))
            .map(|rule| rule.category)
            .collect();
        if categories.is_empty() {
            let _ = categories.insert(ChangeCategory::Other);
        }
        categories
    }

    /// Builds the category histogram for a set of changed paths.
    pub fn classify<I, S>(&self, paths: I) -> CategoryHistogram
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut histogram = CategoryHistogram::default();
        for path in paths {
            histogram.record(&self.classify_file(path.as_ref()));
        }
        histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(categories: &[ChangeCategory]) -> BTreeSet<ChangeCategory> {
        categories.iter().copied().collect()
    }

    #[test]
    fn compose_file_is_infrastructure_and_configuration() {
        let classifier = ChangeClassifier::new();
        let categories = classifier.classify_file("infra/docker-compose.yml");
        assert!(categories.contains(&ChangeCategory::Infrastructure));
        assert!(categories.contains(&ChangeCategory::Configuration));
    }

    #[test]
    fn single_category_paths() {
        let classifier = ChangeClassifier::new();
        assert_eq!(
            classifier.classify_file("src/auth/login.py"),
            set(&[ChangeCategory::Security])
        );
        assert_eq!(
            classifier.classify_file("README.md"),
            set(&[ChangeCategory::Documentation])
        );
        assert_eq!(
            classifier.classify_file("random/notes.txt"),
            set(&[ChangeCategory::Other])
        );
    }

    #[test]
    fn matching_ignores_case() {
        let classifier = ChangeClassifier::new();
        assert_eq!(
            classifier.classify_file("Dockerfile"),
            set(&[ChangeCategory::Infrastructure])
        );
        assert_eq!(
            classifier.classify_file(".GitHub/Workflows/ci.yml"),
            set(&[ChangeCategory::Infrastructure])
        );
    }

    #[test]
    fn workflow_and_migration_paths() {
        let classifier = ChangeClassifier::new();
        assert!(classifier
            .classify_file("db/migrations/0001_init.sql")
            .contains(&ChangeCategory::Database));
        assert!(classifier
            .classify_file("src/__tests__/app.js")
            .contains(&ChangeCategory::Testing));
    }

    #[test]
    fn histogram_for_container_scenario() {
        let classifier = ChangeClassifier::new();
        let histogram = classifier.classify(["Dockerfile", "k8s/deploy.yaml", "README.md"]);

        assert_eq!(histogram.files(), 3);
        assert_eq!(histogram.count(ChangeCategory::Infrastructure), 2);
        assert_eq!(histogram.count(ChangeCategory::Documentation), 1);
        assert_eq!(histogram.counts().len(), 2);
    }

    #[test]
    fn empty_input_gives_empty_histogram() {
        let histogram = ChangeClassifier::new().classify(Vec::<String>::new());
        assert!(histogram.is_empty());
        assert!(histogram.technical_areas().is_empty());
    }

    #[test]
    fn custom_rules_replace_defaults() {
        let classifier = ChangeClassifier::with_rules([
            ClassificationRule::new("Proto", ChangeCategory::Api),
            ClassificationRule::new(".tf", ChangeCategory::Infrastructure),
        ]);
        assert_eq!(
            classifier.classify_file("schema/user.proto"),
            set(&[ChangeCategory::Api])
        );
        assert_eq!(
            classifier.classify_file("main.tf"),
            set(&[ChangeCategory::Infrastructure])
        );
        assert_eq!(
            classifier.classify_file("README.md"),
            set(&[ChangeCategory::Other])
        );
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn classification_is_deterministic_and_nonempty(path in "[a-zA-Z0-9_./-]{0,40}") {
                let classifier = ChangeClassifier::new();
                let first = classifier.classify_file(&path);
                prop_assert!(!first.is_empty());
                prop_assert_eq!(&first, &classifier.classify_file(&path));
            }

            #[test]
            fn other_is_exclusive(path in "[a-zA-Z0-9_./-]{0,40}") {
                let categories = ChangeClassifier::new().classify_file(&path);
                if categories.contains(&ChangeCategory::Other) {
                    prop_assert_eq!(categories.len(), 1);
                }
            }

            #[test]
            fn histogram_counts_every_file(paths in proptest::collection::vec("[a-z/.]{1,20}", 0..20)) {
                let histogram = ChangeClassifier::new().classify(&paths);
                prop_assert_eq!(histogram.files(), paths.len());
                let total: usize = histogram.counts().values().sum();
                prop_assert!(total >= paths.len());
            }
        }
    }
}
