//! Data records and their serialization.

pub mod changes;
pub mod divergence;
pub mod export;
pub mod intent;
pub mod output;
pub mod report;
pub mod repository;

pub use changes::{ChangeFootprint, CommitAnalysis, CommitTheme, MajorChange};
pub use divergence::{is_active_fork, DivergenceRecord, ReadmeComparison};
pub use export::{filter_active, ActivityStatistics, ExportSummary, ForkExportRow};
pub use intent::{
    CategoryHistogram, ChangeCategory, ChangeKind, DevelopmentFocus, FileChange, IntentSummary,
    StrategicDirection,
};
pub use output::{render, to_yaml, write_document, OutputFormat};
pub use report::{ForkInsight, InsightsOutput, RunReport, SkipReason, SkippedUnit, UnitKind};
pub use repository::{Fork, OwnerKind, Repository};
