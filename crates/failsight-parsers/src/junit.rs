use crate::traits::{ProbeResult, ReportFormat, ReportParser};
use crate::xml::{attr, read_probe_head};
use crate::{Error, Result};
use failsight_types::{FailureKind, FailureRecord, ParsedReport};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::Path;
use tracing::{info, warn};

/// Parser for JUnit-style XML result files
///
/// Accepts one or more `testsuite` elements, optionally wrapped in
/// `testsuites`. The suite's own `tests`/`failures` attributes are ignored:
/// counts come from the testcases actually iterated, which is the only number
/// that survives truncated or hand-edited reports.
pub struct JunitXmlParser;

impl ReportParser for JunitXmlParser {
    fn format(&self) -> ReportFormat {
        ReportFormat::Junit
    }

    fn probe(&self, path: &Path) -> ProbeResult {
        if path.extension().is_none_or(|e| e != "xml") {
            return ProbeResult::NoMatch;
        }
        let head = match read_probe_head(path) {
            Some(head) => head,
            None => return ProbeResult::NoMatch,
        };
        if head.contains("<testsuites") || head.contains("<testsuite") {
            ProbeResult::match_high()
        } else {
            ProbeResult::NoMatch
        }
    }

    fn parse(&self, path: &Path) -> Result<ParsedReport> {
        if !path.exists() {
            return Err(Error::MissingArtifact(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let mut report = parse_junit_str(&content)?;

        let anomaly = report.reconcile_passed();
        if anomaly {
            warn!(
                total = report.total,
                failed = report.failed,
                skipped = report.skipped,
                errors = report.errors,
                "negative passed count detected, flooring at zero"
            );
        }

        info!(
            total = report.total,
            passed = report.passed,
            failed = report.failed,
            skipped = report.skipped,
            errors = report.errors,
            "parsed JUnit XML"
        );
        Ok(report)
    }
}

/// Which verdict child of a testcase is currently open
#[derive(Debug, Clone, Copy, PartialEq)]
enum VerdictChild {
    Failure,
    Error,
    Skipped,
}

impl VerdictChild {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"failure" => Some(VerdictChild::Failure),
            b"error" => Some(VerdictChild::Error),
            b"skipped" => Some(VerdictChild::Skipped),
            _ => None,
        }
    }

    fn kind(&self) -> FailureKind {
        match self {
            VerdictChild::Failure => FailureKind::Failure,
            VerdictChild::Error => FailureKind::Error,
            VerdictChild::Skipped => FailureKind::Skip,
        }
    }
}

/// In-flight state for the testcase being parsed
struct CaseState {
    name: String,
    class_name: String,
    time: f64,
    verdict: Option<(VerdictChild, Option<String>, String)>,
    open_child: Option<VerdictChild>,
}

impl CaseState {
    fn from_element(e: &BytesStart) -> Self {
        Self {
            name: attr(e, "name").unwrap_or_else(|| "Unknown".to_string()),
            class_name: attr(e, "classname").unwrap_or_else(|| "Unknown".to_string()),
            time: attr(e, "time")
                .and_then(|t| t.parse().ok())
                .unwrap_or(0.0),
            verdict: None,
            open_child: None,
        }
    }
}

fn parse_junit_str(content: &str) -> Result<ParsedReport> {
    let mut reader = Reader::from_str(content);
    let mut report = ParsedReport::default();
    let mut case: Option<CaseState> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"testsuite" => {
                    report.duration_seconds += attr(e, "time")
                        .and_then(|t| t.parse::<f64>().ok())
                        .unwrap_or(0.0);
                }
                b"testcase" => {
                    case = Some(CaseState::from_element(e));
                }
                name => {
                    if let (Some(state), Some(child)) =
                        (case.as_mut(), VerdictChild::from_name(name))
                    {
                        // The first verdict child wins; later siblings are noise
                        if state.verdict.is_none() {
                            state.verdict = Some((child, attr(e, "message"), String::new()));
                            state.open_child = Some(child);
                        }
                    }
                }
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"testsuite" => {
                    report.duration_seconds += attr(e, "time")
                        .and_then(|t| t.parse::<f64>().ok())
                        .unwrap_or(0.0);
                }
                b"testcase" => {
                    // Self-closing testcase: no children, so it passed
                    report.total += 1;
                }
                name => {
                    if let (Some(state), Some(child)) =
                        (case.as_mut(), VerdictChild::from_name(name))
                        && state.verdict.is_none()
                    {
                        state.verdict = Some((child, attr(e, "message"), String::new()));
                    }
                }
            },
            Ok(Event::Text(ref e)) => {
                if let Some(state) = case.as_mut()
                    && state.open_child.is_some()
                    && let Some((_, _, text)) = state.verdict.as_mut()
                    && let Ok(unescaped) = e.unescape()
                {
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"testcase" => {
                    if let Some(state) = case.take() {
                        report.total += 1;
                        finish_case(&mut report, state);
                    }
                }
                name => {
                    if let Some(state) = case.as_mut()
                        && state.open_child == VerdictChild::from_name(name)
                    {
                        state.open_child = None;
                    }
                }
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::MalformedInput(format!("invalid XML: {}", e))),
        }
        buf.clear();
    }

    Ok(report)
}

fn finish_case(report: &mut ParsedReport, state: CaseState) {
    let Some((child, message, text)) = state.verdict else {
        // No failure/error/skipped child: the test passed
        return;
    };

    let kind = child.kind();
    let error_message = match child {
        VerdictChild::Skipped => {
            // Skip reason may live in the message attribute or the text body
            message
                .filter(|m| !m.is_empty())
                .or_else(|| {
                    let trimmed = text.trim();
                    (!trimmed.is_empty()).then(|| trimmed.to_string())
                })
                .unwrap_or_else(|| "Test skipped (no reason provided)".to_string())
        }
        _ => message.unwrap_or_default(),
    };
    let traceback = match child {
        VerdictChild::Skipped => String::new(),
        _ => text,
    };

    match child {
        VerdictChild::Failure => report.failed += 1,
        VerdictChild::Error => report.errors += 1,
        VerdictChild::Skipped => report.skipped += 1,
    }

    report.failures.push(FailureRecord {
        test_name: state.name,
        class_name: state.class_name,
        error_message,
        traceback,
        kind,
        duration_seconds: state.time,
        source_component: None,
        correlated_log_paths: Vec::new(),
    });
}
