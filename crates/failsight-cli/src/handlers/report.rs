use anyhow::{Context, Result, bail};
use failsight_engine::{aggregate, split_failures};
use failsight_parsers::{create_parser, detect_parser_for_path, parse_component_dir};
use failsight_types::{FailureRecord, TestRunSummary};
use std::path::Path;
use tracing::warn;

/// A report loaded through whichever parser fits the artifact
pub(crate) struct LoadedReport {
    pub summary: TestRunSummary,
    pub failures: Vec<FailureRecord>,
    pub skipped_tests: Vec<FailureRecord>,
}

/// Parse a report artifact (or a directory of component reports) and
/// aggregate it into one summary.
pub(crate) fn load_report(path: &Path, report_format: &str) -> Result<LoadedReport> {
    let sources = if path.is_dir() {
        let reports = parse_component_dir(path)?;
        if reports.is_empty() {
            bail!(
                "no component validation reports found under {}",
                path.display()
            );
        }
        reports
    } else {
        let parser = match report_format {
            "auto" => detect_parser_for_path(path)?,
            name => create_parser(name)?,
        };
        let report = parser
            .parse(path)
            .with_context(|| format!("parsing {}", path.display()))?;
        if report.total < report.failed + report.skipped + report.errors + report.review {
            warn!(path = %path.display(), "source counts are self-contradicting");
        }
        let label = report.metadata.get("component").cloned().unwrap_or_default();
        vec![(label, report)]
    };

    let (summary, records) = aggregate(&sources);
    let (failures, skipped_tests) = split_failures(records);

    Ok(LoadedReport {
        summary,
        failures,
        skipped_tests,
    })
}
