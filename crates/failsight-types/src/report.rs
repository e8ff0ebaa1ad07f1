use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Classification of a non-passing test result.
///
/// `Review` is a first-class status from the certification format: the test
/// neither passed nor failed and requires a human decision. It is counted
/// separately and never collapsed into `Failure` or `Skip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Failure,
    Error,
    Skip,
    Review,
}

impl FailureKind {
    /// Skips are tracked but excluded from the failure list shown to AI.
    pub fn is_skip(&self) -> bool {
        matches!(self, FailureKind::Skip)
    }
}

/// One non-passing test result, normalized across all source formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub test_name: String,
    pub class_name: String,
    pub error_message: String,
    pub traceback: String,
    pub kind: FailureKind,
    pub duration_seconds: f64,
    /// Component label for multi-component sources (e.g. "neutron_ipv4").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_component: Option<String>,
    /// Relative paths of log files correlated with this failure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub correlated_log_paths: Vec<String>,
}

impl FailureRecord {
    pub fn new(
        test_name: impl Into<String>,
        class_name: impl Into<String>,
        kind: FailureKind,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            class_name: class_name.into(),
            error_message: String::new(),
            traceback: String::new(),
            kind,
            duration_seconds: 0.0,
            source_component: None,
            correlated_log_paths: Vec::new(),
        }
    }
}

/// Normalized result of parsing one report artifact.
///
/// Immutable after parsing. Skipped tests travel inside `failures` with
/// `kind = Skip`; the aggregator separates them for display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedReport {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub errors: u64,
    /// Certification-format REVIEW count; zero for other formats.
    #[serde(default)]
    pub review: u64,
    pub duration_seconds: f64,
    pub failures: Vec<FailureRecord>,
    /// Source-specific string metadata (certification ids, product info, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ParsedReport {
    /// Recompute `passed` by subtraction, floored at zero.
    ///
    /// Returns true when the naive subtraction went negative, i.e. the source
    /// counts are self-contradicting. Callers log the anomaly; it is never an
    /// error.
    pub fn reconcile_passed(&mut self) -> bool {
        let non_passing = self.failed + self.skipped + self.errors + self.review;
        if non_passing > self.total {
            self.passed = 0;
            true
        } else {
            self.passed = self.total - non_passing;
            false
        }
    }
}

/// Per-component count breakdown inside a [`TestRunSummary`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentCounts {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// Aggregate counts across one or more parsed reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestRunSummary {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub errors: u64,
    #[serde(default)]
    pub review: u64,
    pub duration_seconds: f64,
    /// Populated when the source spans several components.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, ComponentCounts>,
}

/// A matched region of a log file with surrounding context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogExcerpt {
    /// Relative path of the log file the excerpt came from.
    pub file: String,
    /// 1-based line number of the matched line.
    pub line_number: usize,
    pub matched_line: String,
    pub context: String,
}
