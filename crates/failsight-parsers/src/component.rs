use crate::traits::{ProbeResult, ReportFormat, ReportParser};
use crate::{Error, Result};
use failsight_types::{FailureKind, FailureRecord, ParsedReport};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Filename suffix of a per-component validation report
const REPORT_SUFFIX: &str = "-validation_report.json";

/// Components whose validation reports are picked up from an attachment tree
const TARGET_COMPONENTS: [&str; 3] = ["neutron", "cinder", "manila"];

/// Parser for per-component validation-report JSON files
///
/// One file covers one component (e.g. `neutron_ipv4-validation_report.json`).
/// Counts come from the file's own `total` object; `passed` is supplied
/// directly by the source as `success`. Test names are dotted paths with an
/// optional bracketed id tag.
pub struct ComponentReportParser;

impl ReportParser for ComponentReportParser {
    fn format(&self) -> ReportFormat {
        ReportFormat::Component
    }

    fn probe(&self, path: &Path) -> ProbeResult {
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if name.ends_with(REPORT_SUFFIX) => ProbeResult::match_high(),
            Some(name) if name.ends_with(".json") => ProbeResult::match_low(),
            _ => ProbeResult::NoMatch,
        }
    }

    fn parse(&self, path: &Path) -> Result<ParsedReport> {
        if !path.exists() {
            return Err(Error::MissingArtifact(path.to_path_buf()));
        }
        let component = component_name(path);
        let content = std::fs::read_to_string(path)?;
        let report = parse_component_str(&content, &component)?;

        info!(
            component = %component,
            total = report.total,
            failed = report.failed,
            "parsed component validation report"
        );
        Ok(report)
    }
}

/// Component label derived from the report filename
fn component_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(REPORT_SUFFIX).to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Debug, Default, Deserialize)]
struct Totals {
    #[serde(default)]
    tests: u64,
    #[serde(default)]
    success: u64,
    #[serde(default)]
    failures: u64,
    #[serde(default)]
    skipped: u64,
    #[serde(default)]
    errors: u64,
}

#[derive(Debug, Deserialize)]
struct FailureDetail {
    #[serde(rename = "type")]
    kind: Option<String>,
    log: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TestCase {
    #[serde(default)]
    status: String,
    failure: Option<FailureDetail>,
    output: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValidationReport {
    #[serde(default)]
    total: Totals,
    #[serde(default)]
    test_cases: BTreeMap<String, TestCase>,
}

fn parse_component_str(content: &str, component: &str) -> Result<ParsedReport> {
    let data: ValidationReport = serde_json::from_str(content)?;

    let mut report = ParsedReport {
        total: data.total.tests,
        passed: data.total.success,
        failed: data.total.failures,
        skipped: data.total.skipped,
        errors: data.total.errors,
        ..Default::default()
    };
    report
        .metadata
        .insert("component".to_string(), component.to_string());

    for (full_name, case) in &data.test_cases {
        let (class_name, short_name) = split_test_name(full_name);

        match case.status.as_str() {
            "FAIL" => {
                // Only failures carrying detail produce a record; the count
                // above already includes the rest
                if let Some(detail) = &case.failure {
                    report.failures.push(FailureRecord {
                        test_name: short_name,
                        class_name,
                        error_message: detail
                            .kind
                            .clone()
                            .unwrap_or_else(|| "Test failed".to_string()),
                        traceback: detail.log.clone().unwrap_or_default(),
                        kind: FailureKind::Failure,
                        duration_seconds: 0.0,
                        source_component: Some(component.to_string()),
                        correlated_log_paths: Vec::new(),
                    });
                }
            }
            "SKIP" => {
                report.failures.push(FailureRecord {
                    test_name: short_name,
                    class_name,
                    error_message: case
                        .output
                        .clone()
                        .unwrap_or_else(|| "Test skipped".to_string()),
                    traceback: String::new(),
                    kind: FailureKind::Skip,
                    duration_seconds: 0.0,
                    source_component: Some(component.to_string()),
                    correlated_log_paths: Vec::new(),
                });
            }
            _ => {}
        }
    }

    Ok(report)
}

/// Split a dotted test path into (class name, short name).
///
/// `tempest.api.network.test_ports.PortsTest.test_create[id-42]` becomes
/// (`tempest.api.network.test_ports.PortsTest`, `test_create [id-42]`).
fn split_test_name(full_name: &str) -> (String, String) {
    let (base, tag) = match full_name.split_once('[') {
        Some((base, rest)) => (base, Some(rest.trim_end_matches(']'))),
        None => (full_name, None),
    };

    let (class_name, short) = match base.rsplit_once('.') {
        Some((class_name, short)) => (class_name.to_string(), short.to_string()),
        None => (base.to_string(), base.to_string()),
    };

    let short_name = match tag {
        Some(tag) => format!("{} [{}]", short, tag),
        None => short,
    };

    (class_name, short_name)
}

/// Parse every target-component validation report under an attachments tree.
///
/// Files that fail to parse are logged and skipped; they never abort the
/// remaining components. Returns (component label, report) pairs for the
/// aggregator.
pub fn parse_component_dir(dir: &Path) -> Result<Vec<(String, ParsedReport)>> {
    if !dir.exists() {
        warn!(dir = %dir.display(), "attachments directory not found");
        return Ok(Vec::new());
    }

    let parser = ComponentReportParser;
    let mut reports = Vec::new();

    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(REPORT_SUFFIX) {
            continue;
        }
        let lowered = name.to_lowercase();
        if !TARGET_COMPONENTS.iter().any(|c| lowered.starts_with(c)) {
            continue;
        }

        match parser.parse(path) {
            Ok(report) => reports.push((component_name(path), report)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable validation report");
            }
        }
    }

    Ok(reports)
}
