use failsight_types::{ComponentCounts, FailureRecord, ParsedReport, TestRunSummary};

/// Merge parsed reports into one summary plus a flat, ordered failure list.
///
/// Counts are summed field-wise and failure lists concatenated in source
/// order. Each source carries a caller-supplied label (e.g. a
/// filename-derived component name); labeled sources also land in the
/// per-component breakdown. No reconciliation across overlapping sources is
/// attempted; feeding the same run twice double-counts, by contract.
pub fn aggregate(sources: &[(String, ParsedReport)]) -> (TestRunSummary, Vec<FailureRecord>) {
    let mut summary = TestRunSummary::default();
    let mut failures = Vec::new();

    for (label, report) in sources {
        summary.total += report.total;
        summary.passed += report.passed;
        summary.failed += report.failed;
        summary.skipped += report.skipped;
        summary.errors += report.errors;
        summary.review += report.review;
        summary.duration_seconds += report.duration_seconds;

        if !label.is_empty() {
            let counts = summary.components.entry(label.clone()).or_default();
            counts.total += report.total;
            counts.passed += report.passed;
            counts.failed += report.failed;
            counts.skipped += report.skipped;
        }

        for record in &report.failures {
            let mut record = record.clone();
            if record.source_component.is_none() && !label.is_empty() {
                record.source_component = Some(label.clone());
            }
            failures.push(record);
        }
    }

    (summary, failures)
}

/// Split a combined failure list into (failures shown to AI, skipped tests).
pub fn split_failures(records: Vec<FailureRecord>) -> (Vec<FailureRecord>, Vec<FailureRecord>) {
    records.into_iter().partition(|r| !r.kind.is_skip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsight_types::FailureKind;

    fn report(total: u64, passed: u64, failed: u64, skipped: u64) -> ParsedReport {
        ParsedReport {
            total,
            passed,
            failed,
            skipped,
            ..Default::default()
        }
    }

    #[test]
    fn test_counts_summed_fieldwise() {
        let sources = vec![
            ("neutron".to_string(), report(10, 7, 2, 1)),
            ("cinder".to_string(), report(5, 5, 0, 0)),
        ];
        let (summary, _) = aggregate(&sources);
        assert_eq!(summary.total, 15);
        assert_eq!(summary.passed, 12);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_component_breakdown() {
        let sources = vec![
            ("neutron".to_string(), report(10, 7, 2, 1)),
            ("cinder".to_string(), report(5, 5, 0, 0)),
        ];
        let (summary, _) = aggregate(&sources);
        assert_eq!(summary.components.len(), 2);
        let neutron = &summary.components["neutron"];
        assert_eq!(
            *neutron,
            ComponentCounts {
                total: 10,
                passed: 7,
                failed: 2,
                skipped: 1
            }
        );
    }

    #[test]
    fn test_unlabeled_source_has_no_component_entry() {
        let sources = vec![(String::new(), report(3, 3, 0, 0))];
        let (summary, _) = aggregate(&sources);
        assert!(summary.components.is_empty());
        assert_eq!(summary.total, 3);
    }

    #[test]
    fn test_failures_keep_source_order_and_get_labels() {
        let mut first = report(2, 1, 1, 0);
        first
            .failures
            .push(FailureRecord::new("test_a", "ClassA", FailureKind::Failure));
        let mut second = report(2, 1, 1, 0);
        second
            .failures
            .push(FailureRecord::new("test_b", "ClassB", FailureKind::Failure));

        let sources = vec![("one".to_string(), first), ("two".to_string(), second)];
        let (_, failures) = aggregate(&sources);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].test_name, "test_a");
        assert_eq!(failures[0].source_component.as_deref(), Some("one"));
        assert_eq!(failures[1].test_name, "test_b");
        assert_eq!(failures[1].source_component.as_deref(), Some("two"));
    }

    #[test]
    fn test_split_failures_separates_skips() {
        let records = vec![
            FailureRecord::new("test_f", "C", FailureKind::Failure),
            FailureRecord::new("test_s", "C", FailureKind::Skip),
            FailureRecord::new("test_r", "C", FailureKind::Review),
        ];
        let (failures, skips) = split_failures(records);
        assert_eq!(failures.len(), 2);
        assert_eq!(skips.len(), 1);
        assert_eq!(skips[0].test_name, "test_s");
        // Review stays with the failures, never with the skips
        assert!(failures.iter().any(|f| f.kind == FailureKind::Review));
    }
}
