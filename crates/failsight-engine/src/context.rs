use crate::correlate::{extract_excerpts, extract_keywords, find_related_logs};
use failsight_types::{AnalysisContext, FailureRecord, LogExcerpt, TestRunSummary};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Knobs for failure/log correlation during context assembly
#[derive(Debug, Clone)]
pub struct CorrelationOptions {
    /// Log files attached per failure
    pub max_logs_per_failure: usize,
    /// Context lines around each excerpt match
    pub context_lines: usize,
    /// Excerpts carried into the analysis context
    pub max_excerpts: usize,
}

impl Default for CorrelationOptions {
    fn default() -> Self {
        Self {
            max_logs_per_failure: 5,
            context_lines: 5,
            max_excerpts: 5,
        }
    }
}

/// Stamp `correlated_log_paths` on each failure from a log bundle.
///
/// Skips are left untouched; a failing correlation for one record never
/// aborts the rest.
pub fn attach_correlated_logs(
    failures: &mut [FailureRecord],
    log_root: &Path,
    options: &CorrelationOptions,
) {
    for failure in failures.iter_mut() {
        if failure.kind.is_skip() {
            continue;
        }
        failure.correlated_log_paths = find_related_logs(
            log_root,
            &failure.test_name,
            &failure.error_message,
            options.max_logs_per_failure,
        );
    }
}

/// Pull a bounded set of excerpts from the top correlated log of each failure.
pub fn gather_excerpts(
    failures: &[FailureRecord],
    log_root: &Path,
    options: &CorrelationOptions,
) -> Vec<LogExcerpt> {
    let mut excerpts = Vec::new();

    for failure in failures {
        if excerpts.len() >= options.max_excerpts {
            break;
        }
        let Some(relative) = failure.correlated_log_paths.first() else {
            continue;
        };
        let keywords = extract_keywords(&failure.test_name, &failure.error_message);
        match extract_excerpts(&log_root.join(relative), &keywords, options.context_lines) {
            Ok(mut found) => {
                found.truncate(options.max_excerpts - excerpts.len());
                for excerpt in &mut found {
                    // Report-relative paths read better than absolute ones
                    excerpt.file = relative.clone();
                }
                excerpts.extend(found);
            }
            Err(e) => {
                warn!(file = %relative, error = %e, "skipping unreadable log during excerpt extraction");
            }
        }
    }

    excerpts
}

/// Assemble the context handed to an analysis backend.
pub fn build_context(
    summary: TestRunSummary,
    failures: Vec<FailureRecord>,
    skipped_tests: Vec<FailureRecord>,
    log_excerpts: Vec<LogExcerpt>,
    environment_info: Option<BTreeMap<String, String>>,
) -> AnalysisContext {
    AnalysisContext {
        failures,
        skipped_tests,
        summary,
        log_excerpts,
        environment_info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsight_types::FailureKind;
    use std::fs;
    use tempfile::TempDir;

    fn volume_failure() -> FailureRecord {
        let mut record = FailureRecord::new(
            "test_volume_attach",
            "VolumeTests",
            FailureKind::Failure,
        );
        record.error_message = "volume attach timeout".to_string();
        record
    }

    #[test]
    fn test_attach_correlated_logs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("volume.log"), "volume timeout seen\n").unwrap();

        let mut failures = vec![volume_failure()];
        attach_correlated_logs(&mut failures, dir.path(), &CorrelationOptions::default());
        assert_eq!(failures[0].correlated_log_paths, vec!["volume.log"]);
    }

    #[test]
    fn test_skips_not_correlated() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("volume.log"), "volume\n").unwrap();

        let mut skip = FailureRecord::new("test_volume_x", "C", FailureKind::Skip);
        skip.error_message = "volume".to_string();
        let mut failures = vec![skip];
        attach_correlated_logs(&mut failures, dir.path(), &CorrelationOptions::default());
        assert!(failures[0].correlated_log_paths.is_empty());
    }

    #[test]
    fn test_gather_excerpts_bounded() {
        let dir = TempDir::new().unwrap();
        let content: String = (0..30).map(|i| format!("volume event {}\n", i)).collect();
        fs::write(dir.path().join("volume.log"), content).unwrap();

        let mut failures = vec![volume_failure()];
        let options = CorrelationOptions::default();
        attach_correlated_logs(&mut failures, dir.path(), &options);
        let excerpts = gather_excerpts(&failures, dir.path(), &options);
        assert_eq!(excerpts.len(), options.max_excerpts);
        assert_eq!(excerpts[0].file, "volume.log");
    }

    #[test]
    fn test_build_context_shape() {
        let context = build_context(
            TestRunSummary {
                total: 2,
                failed: 1,
                passed: 1,
                ..Default::default()
            },
            vec![volume_failure()],
            Vec::new(),
            Vec::new(),
            None,
        );
        assert_eq!(context.failures.len(), 1);
        assert_eq!(context.summary.total, 2);
        assert!(context.environment_info.is_none());
    }
}
