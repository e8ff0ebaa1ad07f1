use crate::traits::{ProbeResult, ReportFormat, ReportParser};
use crate::xml::{attr, read_probe_head};
use crate::{Error, Result};
use failsight_types::{FailureKind, FailureRecord, ParsedReport, truncate};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::Path;
use tracing::info;

/// Tokens that mark a line of run output as error evidence
const ERROR_LINE_TOKENS: [&str; 4] = ["error", "fail", "exception", "traceback"];

/// Caps applied when deriving failure details from run output
const MAX_FAILED_COMMANDS: usize = 5;
const MAX_TRACEBACK_LINES: usize = 50;
const MAX_MESSAGE_CHARS: usize = 200;
const MAX_COMMAND_CHARS: usize = 100;
const MAX_STDERR_CHARS: usize = 200;

/// Parser for vendor certification XML result files
///
/// One `<run>` is one executed test. The `<summary data-value>` carries a
/// five-state verdict: PASS, FAIL, REVIEW, SKIP, and anything else counts as
/// an error. REVIEW is a first-class status, surfaced with its own kind and
/// count rather than folded into fail or skip.
pub struct CertificationXmlParser;

impl ReportParser for CertificationXmlParser {
    fn format(&self) -> ReportFormat {
        ReportFormat::Certification
    }

    fn probe(&self, path: &Path) -> ProbeResult {
        if path.extension().is_none_or(|e| e != "xml") {
            return ProbeResult::NoMatch;
        }
        let head = match read_probe_head(path) {
            Some(head) => head,
            None => return ProbeResult::NoMatch,
        };
        if head.contains("<certification") {
            ProbeResult::match_high()
        } else if head.contains("<test ") && head.contains("<run") {
            ProbeResult::match_medium()
        } else {
            ProbeResult::NoMatch
        }
    }

    fn parse(&self, path: &Path) -> Result<ParsedReport> {
        if !path.exists() {
            return Err(Error::MissingArtifact(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let report = parse_certification_str(&content)?;

        info!(
            total = report.total,
            passed = report.passed,
            failed = report.failed,
            review = report.review,
            skipped = report.skipped,
            "parsed certification XML"
        );
        Ok(report)
    }
}

/// Command execution captured inside a run
#[derive(Debug, Default)]
struct CommandRecord {
    command: String,
    return_value: String,
    stderr: String,
}

/// Per-run accumulation, finalized at the run's end tag
#[derive(Debug, Default)]
struct RunState {
    summary_status: Option<String>,
    summary_text: String,
    output: String,
    commands: Vec<CommandRecord>,
}

/// Which text-bearing leaf element is currently open
#[derive(Debug, Clone, Copy, PartialEq)]
enum TextTarget {
    Summary,
    Output,
    Stderr,
}

fn parse_certification_str(content: &str) -> Result<ParsedReport> {
    let mut reader = Reader::from_str(content);
    let mut report = ParsedReport::default();
    let mut buf = Vec::new();

    // Element context
    let mut test_name = String::from("Unknown");
    let mut test_path = String::new();
    let mut run: Option<RunState> = None;
    let mut text_target: Option<TextTarget> = None;
    let mut current_vendor: Option<String> = None;
    let mut components: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                handle_open(
                    e,
                    false,
                    &mut report,
                    &mut test_name,
                    &mut test_path,
                    &mut run,
                    &mut text_target,
                    &mut current_vendor,
                    &mut components,
                );
            }
            Ok(Event::Empty(ref e)) => {
                handle_open(
                    e,
                    true,
                    &mut report,
                    &mut test_name,
                    &mut test_path,
                    &mut run,
                    &mut text_target,
                    &mut current_vendor,
                    &mut components,
                );
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(target), Some(state)) = (text_target, run.as_mut())
                    && let Ok(unescaped) = e.unescape()
                {
                    match target {
                        TextTarget::Summary => state.summary_text.push_str(&unescaped),
                        TextTarget::Output => state.output.push_str(&unescaped),
                        TextTarget::Stderr => {
                            if let Some(cmd) = state.commands.last_mut() {
                                cmd.stderr.push_str(&unescaped);
                            }
                        }
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"run" => {
                    if let Some(state) = run.take() {
                        finish_run(&mut report, &test_name, &test_path, state);
                    }
                    text_target = None;
                }
                b"summary" | b"output" | b"stderr" => text_target = None,
                b"vendor" => current_vendor = None,
                b"test" => {
                    test_name = String::from("Unknown");
                    test_path = String::new();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::MalformedInput(format!("invalid XML: {}", e))),
        }
        buf.clear();
    }

    if !components.is_empty() {
        report
            .metadata
            .insert("components".to_string(), components.join(","));
    }

    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn handle_open(
    e: &BytesStart,
    is_empty: bool,
    report: &mut ParsedReport,
    test_name: &mut String,
    test_path: &mut String,
    run: &mut Option<RunState>,
    text_target: &mut Option<TextTarget>,
    current_vendor: &mut Option<String>,
    components: &mut Vec<String>,
) {
    match e.local_name().as_ref() {
        b"certification" => {
            for (key, attr_name) in [
                ("certification.id", "id"),
                ("certification.name", "name"),
                ("certification.type", "type"),
                ("certification.status", "test-plan-status"),
                ("certification.created", "created"),
                ("certification.updated", "updated"),
            ] {
                if let Some(value) = attr(e, attr_name) {
                    report.metadata.insert(key.to_string(), value);
                }
            }
        }
        b"vendor" => {
            *current_vendor = attr(e, "name");
        }
        b"product" => {
            let vendor = current_vendor.as_deref().unwrap_or("Unknown");
            if vendor == "Red Hat, Inc." {
                if let Some(name) = attr(e, "name") {
                    report.metadata.insert("platform.product".to_string(), name);
                }
            } else if !report.metadata.contains_key("product.name") {
                report
                    .metadata
                    .insert("product.vendor".to_string(), vendor.to_string());
                if let Some(name) = attr(e, "name") {
                    report.metadata.insert("product.name".to_string(), name);
                }
                if let Some(category) = attr(e, "category") {
                    report
                        .metadata
                        .insert("product.category".to_string(), category);
                }
            }
        }
        b"version" => {
            if current_vendor.as_deref() == Some("Red Hat, Inc.") {
                if let Some(version) = attr(e, "version") {
                    report
                        .metadata
                        .insert("platform.version".to_string(), version);
                }
                if let Some(platform) = attr(e, "platform") {
                    report
                        .metadata
                        .insert("platform.platform".to_string(), platform);
                }
            }
        }
        b"plan-component" => {
            if let Some(name) = attr(e, "name") {
                components.push(name);
            }
        }
        b"test" => {
            *test_name = attr(e, "name").unwrap_or_else(|| "Unknown".to_string());
            *test_path = attr(e, "path").unwrap_or_default();
        }
        b"run" => {
            report.total += 1;
            *run = Some(RunState::default());
        }
        b"summary" => {
            if let Some(state) = run.as_mut() {
                state.summary_status =
                    Some(attr(e, "data-value").unwrap_or_else(|| "UNKNOWN".to_string()));
                if !is_empty {
                    *text_target = Some(TextTarget::Summary);
                }
            }
        }
        b"output" => {
            if run.is_some() && !is_empty {
                *text_target = Some(TextTarget::Output);
            }
        }
        b"command" => {
            if let Some(state) = run.as_mut() {
                state.commands.push(CommandRecord {
                    command: attr(e, "command").unwrap_or_else(|| "Unknown command".to_string()),
                    return_value: attr(e, "return-value").unwrap_or_else(|| "?".to_string()),
                    stderr: String::new(),
                });
            }
        }
        b"stderr" => {
            if run.is_some() && !is_empty {
                *text_target = Some(TextTarget::Stderr);
            }
        }
        _ => {}
    }
}

fn finish_run(report: &mut ParsedReport, test_name: &str, test_path: &str, state: RunState) {
    let status = match state.summary_status {
        Some(ref status) => status.to_uppercase(),
        // A run without a summary counts toward the total only
        None => return,
    };

    match status.as_str() {
        "PASS" => report.passed += 1,
        "FAIL" => {
            report.failed += 1;
            report
                .failures
                .push(build_failure(test_name, test_path, &state));
        }
        "REVIEW" => {
            report.review += 1;
            report.failures.push(FailureRecord {
                test_name: test_name.to_string(),
                class_name: test_path.to_string(),
                error_message: format!(
                    "Test requires manual review: {}",
                    state.summary_text.trim()
                ),
                traceback: String::new(),
                kind: FailureKind::Review,
                duration_seconds: 0.0,
                source_component: None,
                correlated_log_paths: Vec::new(),
            });
        }
        "SKIP" => report.skipped += 1,
        _ => report.errors += 1,
    }
}

/// Derive error message and traceback for a failed run.
///
/// Priority order: output lines carrying an error token, else the last 10
/// non-blank output lines; failed commands are appended afterward.
fn build_failure(test_name: &str, test_path: &str, state: &RunState) -> FailureRecord {
    let mut error_message = format!("Test '{}' failed", test_name);
    let mut traceback_lines: Vec<String> = Vec::new();

    let output = state.output.trim();
    if !output.is_empty() {
        let lines: Vec<&str> = output.lines().collect();

        for line in &lines {
            let lowered = line.to_lowercase();
            if ERROR_LINE_TOKENS.iter().any(|t| lowered.contains(t)) {
                traceback_lines.push(line.to_string());
            }
        }

        if traceback_lines.is_empty() {
            traceback_lines = lines
                .iter()
                .rev()
                .take(10)
                .rev()
                .filter(|l| !l.trim().is_empty())
                .map(|l| l.to_string())
                .collect();
        }

        if let Some(first) = traceback_lines.first() {
            error_message = truncate(first, MAX_MESSAGE_CHARS);
        }
    }

    let failed_commands: Vec<&CommandRecord> = state
        .commands
        .iter()
        .filter(|c| c.return_value != "0")
        .collect();

    for cmd in failed_commands.iter().take(MAX_FAILED_COMMANDS) {
        traceback_lines.push(format!(
            "Command failed (RC={}): {}",
            cmd.return_value,
            truncate(&cmd.command, MAX_COMMAND_CHARS)
        ));
        let stderr = cmd.stderr.trim();
        if !stderr.is_empty() {
            traceback_lines.push(format!("  Error: {}", truncate(stderr, MAX_STDERR_CHARS)));
        }
    }

    traceback_lines.truncate(MAX_TRACEBACK_LINES);

    FailureRecord {
        test_name: test_name.to_string(),
        class_name: test_path.to_string(),
        error_message,
        traceback: traceback_lines.join("\n"),
        kind: FailureKind::Failure,
        duration_seconds: 0.0,
        source_component: None,
        correlated_log_paths: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap_runs(runs: &str) -> String {
        format!(
            r#"<certification id="12345" name="Storage Cert" type="full" test-plan-status="in-progress">
                <test name="storage_check" path="tests/storage">{}</test>
            </certification>"#,
            runs
        )
    }

    #[test]
    fn test_status_buckets() {
        let xml = wrap_runs(
            r#"<run><summary data-value="PASS">ok</summary></run>
               <run><summary data-value="FAIL">bad</summary></run>
               <run><summary data-value="REVIEW">check me</summary></run>
               <run><summary data-value="SKIP">n/a</summary></run>
               <run><summary data-value="WEIRD">?</summary></run>"#,
        );
        let report = parse_certification_str(&xml).unwrap();
        assert_eq!(report.total, 5);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.review, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.errors, 1);
    }

    #[test]
    fn test_review_is_first_class() {
        let xml = wrap_runs(r#"<run><summary data-value="REVIEW">needs eyes</summary></run>"#);
        let report = parse_certification_str(&xml).unwrap();
        assert_eq!(report.review, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.skipped, 0);
        let record = &report.failures[0];
        assert_eq!(record.kind, FailureKind::Review);
        assert_eq!(
            record.error_message,
            "Test requires manual review: needs eyes"
        );
    }

    #[test]
    fn test_fail_picks_first_error_line() {
        let xml = wrap_runs(
            r#"<run>
                <summary data-value="FAIL">failed</summary>
                <output>starting up
all good so far
Error: disk full
cleanup done</output>
            </run>"#,
        );
        let report = parse_certification_str(&xml).unwrap();
        let record = &report.failures[0];
        assert!(record.error_message.starts_with("Error: disk full"));
        assert!(record.error_message.chars().count() <= 200);
        assert_eq!(record.kind, FailureKind::Failure);
    }

    #[test]
    fn test_fail_falls_back_to_tail_lines() {
        let output: String = (1..=15)
            .map(|i| format!("step {} completed\n", i))
            .collect();
        let xml = wrap_runs(&format!(
            r#"<run><summary data-value="FAIL">failed</summary><output>{}</output></run>"#,
            output
        ));
        let report = parse_certification_str(&xml).unwrap();
        let record = &report.failures[0];
        // Last 10 non-blank lines, first one becomes the message
        assert_eq!(record.error_message, "step 6 completed");
        assert_eq!(record.traceback.lines().count(), 10);
    }

    #[test]
    fn test_fail_without_output_keeps_default_message() {
        let xml = wrap_runs(r#"<run><summary data-value="FAIL">failed</summary></run>"#);
        let report = parse_certification_str(&xml).unwrap();
        assert_eq!(
            report.failures[0].error_message,
            "Test 'storage_check' failed"
        );
    }

    #[test]
    fn test_failed_commands_annotated_and_capped() {
        let commands: String = (0..8)
            .map(|i| {
                format!(
                    r#"<command command="probe-{}" return-value="2"><stderr>device busy</stderr></command>"#,
                    i
                )
            })
            .collect();
        let xml = wrap_runs(&format!(
            r#"<run><summary data-value="FAIL">failed</summary>{}</run>"#,
            commands
        ));
        let report = parse_certification_str(&xml).unwrap();
        let traceback = &report.failures[0].traceback;
        let command_lines = traceback
            .lines()
            .filter(|l| l.starts_with("Command failed"))
            .count();
        assert_eq!(command_lines, 5);
        assert!(traceback.contains("Command failed (RC=2): probe-0"));
        assert!(traceback.contains("  Error: device busy"));
    }

    #[test]
    fn test_successful_commands_not_annotated() {
        let xml = wrap_runs(
            r#"<run>
                <summary data-value="FAIL">failed</summary>
                <command command="setup" return-value="0"><stderr></stderr></command>
            </run>"#,
        );
        let report = parse_certification_str(&xml).unwrap();
        assert!(!report.failures[0].traceback.contains("Command failed"));
    }

    #[test]
    fn test_certification_metadata_captured() {
        let xml = r#"<certification id="99" name="NetCert" type="full" test-plan-status="done">
            <vendor name="Acme Storage"><product name="AcmeFS" category="storage"/></vendor>
            <vendor name="Red Hat, Inc."><product name="RHEL"><version version="9.4" platform="x86_64"/></product></vendor>
            <plan-component id="1" name="cinder" bits="64"/>
            <plan-component id="2" name="manila" bits="64"/>
            <test name="t" path="p"><run><summary data-value="PASS">ok</summary></run></test>
        </certification>"#;
        let report = parse_certification_str(xml).unwrap();
        assert_eq!(report.metadata.get("certification.id").unwrap(), "99");
        assert_eq!(report.metadata.get("product.vendor").unwrap(), "Acme Storage");
        assert_eq!(report.metadata.get("product.name").unwrap(), "AcmeFS");
        assert_eq!(report.metadata.get("platform.product").unwrap(), "RHEL");
        assert_eq!(report.metadata.get("platform.version").unwrap(), "9.4");
        assert_eq!(report.metadata.get("components").unwrap(), "cinder,manila");
    }

    #[test]
    fn test_traceback_capped_at_fifty_lines() {
        let output: String = (0..80).map(|i| format!("error in step {}\n", i)).collect();
        let xml = wrap_runs(&format!(
            r#"<run><summary data-value="FAIL">failed</summary><output>{}</output></run>"#,
            output
        ));
        let report = parse_certification_str(&xml).unwrap();
        assert_eq!(report.failures[0].traceback.lines().count(), 50);
    }
}
