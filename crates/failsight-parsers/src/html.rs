use crate::traits::{ProbeResult, ReportFormat, ReportParser};
use crate::xml::read_probe_head;
use crate::{Error, Result};
use failsight_types::{FailureKind, FailureRecord, ParsedReport};
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Parser for HTML report files
///
/// No fixed schema is guaranteed. The parser degrades through strategies:
/// a summary table, a statistics container, conventionally class-named
/// failure rows, and finally a plain-text scan. The plain-text fallback is
/// best-effort only and is never treated as authoritative where the summary
/// counts disagree.
pub struct HtmlReportParser;

impl ReportParser for HtmlReportParser {
    fn format(&self) -> ReportFormat {
        ReportFormat::Html
    }

    fn probe(&self, path: &Path) -> ProbeResult {
        let is_html = path
            .extension()
            .is_some_and(|e| e == "html" || e == "htm");
        if !is_html {
            return ProbeResult::NoMatch;
        }
        match read_probe_head(path) {
            Some(head) if head.to_lowercase().contains("<html") => ProbeResult::match_high(),
            Some(_) => ProbeResult::match_low(),
            None => ProbeResult::NoMatch,
        }
    }

    fn parse(&self, path: &Path) -> Result<ParsedReport> {
        if !path.exists() {
            return Err(Error::MissingArtifact(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let report = parse_html_str(&content)?;

        info!(
            total = report.total,
            failed = report.failed,
            failures = report.failures.len(),
            "parsed HTML report"
        );
        Ok(report)
    }
}

fn int_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

fn stats_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*(test|pass|fail|error|skip)").unwrap())
}

fn test_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(test_\w+)").unwrap())
}

// ---------------------------------------------------------------------------
// Lightweight tolerant HTML tree
// ---------------------------------------------------------------------------

/// Elements that never carry content and often appear unclosed
const VOID_ELEMENTS: [&str; 10] = [
    "br", "hr", "img", "input", "meta", "link", "col", "area", "base", "wbr",
];

enum HtmlContent {
    Text(String),
    Element(usize),
}

struct HtmlNode {
    name: String,
    classes: Vec<String>,
    id: Option<String>,
    content: Vec<HtmlContent>,
}

struct HtmlTree {
    nodes: Vec<HtmlNode>,
}

impl HtmlTree {
    /// Tokenize HTML into a tree, tolerating the usual malformations.
    ///
    /// A tokenizer error after some structure was read keeps the partial
    /// tree; an error before anything was read is a malformed document.
    fn parse(content: &str) -> Result<Self> {
        let mut reader = Reader::from_str(content);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        let mut tree = HtmlTree {
            nodes: vec![HtmlNode {
                name: "#root".to_string(),
                classes: Vec::new(),
                id: None,
                content: Vec::new(),
            }],
        };
        let mut stack: Vec<usize> = vec![0];
        let mut buf = Vec::new();
        let mut saw_element = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    saw_element = true;
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                    let idx = tree.push_node(&stack, e, &name);
                    if !VOID_ELEMENTS.contains(&name.as_str()) {
                        stack.push(idx);
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    saw_element = true;
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                    tree.push_node(&stack, e, &name);
                }
                Ok(Event::End(ref e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                    // Pop to the nearest matching open element, if any
                    if let Some(pos) = stack
                        .iter()
                        .rposition(|&idx| tree.nodes[idx].name == name && idx != 0)
                    {
                        stack.truncate(pos);
                    }
                }
                Ok(Event::Text(ref e)) => {
                    let text = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(e.as_ref()).into_owned());
                    let parent = *stack.last().unwrap_or(&0);
                    tree.nodes[parent].content.push(HtmlContent::Text(text));
                }
                Ok(Event::CData(ref e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    let parent = *stack.last().unwrap_or(&0);
                    tree.nodes[parent].content.push(HtmlContent::Text(text));
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    if !saw_element {
                        return Err(Error::MalformedInput(format!("invalid HTML: {}", e)));
                    }
                    debug!("HTML tokenizer stopped early: {}", e);
                    break;
                }
            }
            buf.clear();
        }

        Ok(tree)
    }

    fn push_node(
        &mut self,
        stack: &[usize],
        e: &quick_xml::events::BytesStart,
        name: &str,
    ) -> usize {
        let classes = crate::xml::attr(e, "class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let id = crate::xml::attr(e, "id");
        let idx = self.nodes.len();
        self.nodes.push(HtmlNode {
            name: name.to_string(),
            classes,
            id,
            content: Vec::new(),
        });
        let parent = *stack.last().unwrap_or(&0);
        self.nodes[parent].content.push(HtmlContent::Element(idx));
        idx
    }

    /// Concatenated text of a node and its descendants, in document order
    fn text(&self, idx: usize) -> String {
        let mut out = String::new();
        self.collect_text(idx, &mut out);
        out
    }

    fn collect_text(&self, idx: usize, out: &mut String) {
        for content in &self.nodes[idx].content {
            match content {
                HtmlContent::Text(t) => out.push_str(t),
                HtmlContent::Element(child) => {
                    // Scripts and styles are markup plumbing, not report text
                    let name = self.nodes[*child].name.as_str();
                    if name != "script" && name != "style" {
                        self.collect_text(*child, out);
                    }
                }
            }
        }
    }

    /// Preorder descendant indices of a node (excluding the node itself)
    fn descendants(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        self.walk(idx, &mut out);
        out
    }

    fn walk(&self, idx: usize, out: &mut Vec<usize>) {
        for content in &self.nodes[idx].content {
            if let HtmlContent::Element(child) = content {
                out.push(*child);
                self.walk(*child, out);
            }
        }
    }

    fn has_class(&self, idx: usize, class: &str) -> bool {
        self.nodes[idx].classes.iter().any(|c| c == class)
    }

    fn find_descendant(&self, idx: usize, pred: impl Fn(&Self, usize) -> bool) -> Option<usize> {
        self.descendants(idx).into_iter().find(|&d| pred(self, d))
    }
}

// ---------------------------------------------------------------------------
// Extraction strategies
// ---------------------------------------------------------------------------

fn parse_html_str(content: &str) -> Result<ParsedReport> {
    let tree = HtmlTree::parse(content)?;
    let mut report = ParsedReport::default();

    let summary_found = parse_summary_table(&tree, &mut report);
    if !summary_found {
        parse_stats_container(&tree, &mut report);
    }

    parse_failure_rows(&tree, &mut report);

    // Structured extraction found nothing but the summary says something
    // failed: fall back to scanning the visible text
    if report.failures.is_empty() && (report.failed > 0 || report.errors > 0) {
        parse_failures_from_text(&tree.text(0), &mut report);
    }

    Ok(report)
}

fn first_int(text: &str) -> u64 {
    int_re()
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Strategy 1: a `<table class="summary">` of label/value rows
fn parse_summary_table(tree: &HtmlTree, report: &mut ParsedReport) -> bool {
    let Some(table) = tree.find_descendant(0, |t, idx| {
        t.nodes[idx].name == "table" && t.has_class(idx, "summary")
    }) else {
        return false;
    };

    for row in tree
        .descendants(table)
        .into_iter()
        .filter(|&idx| tree.nodes[idx].name == "tr")
    {
        let cells: Vec<usize> = tree
            .descendants(row)
            .into_iter()
            .filter(|&idx| tree.nodes[idx].name == "td")
            .collect();
        if cells.len() < 2 {
            continue;
        }

        let label = tree.text(cells[0]).trim().to_lowercase();
        let value_text = tree.text(cells[1]).trim().to_string();
        let value = first_int(&value_text);

        if label.contains("total") {
            report.total = value;
        } else if label.contains("pass") {
            report.passed = value;
        } else if label.contains("fail") {
            report.failed = value;
        } else if label.contains("skip") {
            report.skipped = value;
        } else if label.contains("error") {
            report.errors = value;
        } else if label.contains("time") || label.contains("duration") {
            report.duration_seconds = value_text
                .trim_end_matches('s')
                .trim()
                .parse()
                .unwrap_or(value as f64);
        }
    }

    true
}

/// Strategy 2: regex over a statistics container's text
fn parse_stats_container(tree: &HtmlTree, report: &mut ParsedReport) {
    let Some(stats) = tree.find_descendant(0, |t, idx| {
        t.nodes[idx].name == "div"
            && (t.has_class(idx, "statistics") || t.nodes[idx].id.as_deref() == Some("stats"))
    }) else {
        return;
    };

    let text = tree.text(stats);
    for caps in stats_re().captures_iter(&text) {
        let value: u64 = caps[1].parse().unwrap_or(0);
        match caps[2].to_lowercase().as_str() {
            "test" => report.total = value,
            "pass" => report.passed = value,
            "fail" => report.failed = value,
            "error" => report.errors = value,
            "skip" => report.skipped = value,
            _ => {}
        }
    }
}

/// Strategy 3: rows/divs tagged with conventional failure class names
fn parse_failure_rows(tree: &HtmlTree, report: &mut ParsedReport) {
    let mut rows: Vec<usize> = Vec::new();

    let results_table = tree.find_descendant(0, |t, idx| {
        t.nodes[idx].name == "table"
            && (t.has_class(idx, "results") || t.nodes[idx].id.as_deref() == Some("results-table"))
    });
    if let Some(table) = results_table {
        rows = tree
            .descendants(table)
            .into_iter()
            .filter(|&idx| {
                tree.nodes[idx].name == "tr"
                    && ["failed", "error", "failure"]
                        .iter()
                        .any(|c| tree.has_class(idx, c))
            })
            .collect();
    }

    if rows.is_empty() {
        rows = tree
            .descendants(0)
            .into_iter()
            .filter(|&idx| {
                tree.nodes[idx].name == "div"
                    && ["test-failure", "test-error", "failure"]
                        .iter()
                        .any(|c| tree.has_class(idx, c))
            })
            .collect();
    }

    for row in rows {
        if let Some(failure) = parse_failure_row(tree, row) {
            report.failures.push(failure);
        }
    }
}

fn class_text(tree: &HtmlTree, row: usize, primary: &str, td_fallback: &str) -> Option<String> {
    let node = tree
        .find_descendant(row, |t, idx| t.has_class(idx, primary))
        .or_else(|| {
            tree.find_descendant(row, |t, idx| {
                t.nodes[idx].name == "td" && t.has_class(idx, td_fallback)
            })
        })?;
    Some(tree.text(node).trim().to_string())
}

fn parse_failure_row(tree: &HtmlTree, row: usize) -> Option<FailureRecord> {
    let test_name = class_text(tree, row, "test-name", "name")?;
    if test_name.is_empty() {
        return None;
    }

    let kind = if tree.has_class(row, "error") || tree.has_class(row, "test-error") {
        FailureKind::Error
    } else if tree.has_class(row, "skip") {
        FailureKind::Skip
    } else {
        FailureKind::Failure
    };

    let traceback = class_text(tree, row, "traceback", "traceback")
        .or_else(|| {
            tree.find_descendant(row, |t, idx| t.nodes[idx].name == "pre")
                .map(|idx| tree.text(idx).trim().to_string())
        })
        .unwrap_or_default();

    Some(FailureRecord {
        test_name,
        class_name: class_text(tree, row, "test-class", "class")
            .unwrap_or_else(|| "Unknown".to_string()),
        error_message: class_text(tree, row, "error-message", "message").unwrap_or_default(),
        traceback,
        kind,
        duration_seconds: 0.0,
        source_component: None,
        correlated_log_paths: Vec::new(),
    })
}

/// Strategy 4: plain-text scan for FAILED/ERROR markers
fn parse_failures_from_text(text: &str, report: &mut ParsedReport) {
    let mut current: Option<FailureRecord> = None;
    let mut in_traceback = false;

    for raw_line in text.lines() {
        let line = raw_line.trim();

        if line.contains("FAILED") || line.contains("ERROR") {
            if let Some(failure) = current.take() {
                report.failures.push(failure);
            }

            let test_name = test_name_re()
                .captures(line)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            let kind = if line.contains("ERROR") {
                FailureKind::Error
            } else {
                FailureKind::Failure
            };

            current = Some(FailureRecord {
                test_name,
                class_name: "Unknown".to_string(),
                error_message: line.to_string(),
                traceback: String::new(),
                kind,
                duration_seconds: 0.0,
                source_component: None,
                correlated_log_paths: Vec::new(),
            });
            in_traceback = false;
        } else if let Some(failure) = current.as_mut()
            && (line.contains("Traceback") || in_traceback)
        {
            in_traceback = true;
            failure.traceback.push_str(line);
            failure.traceback.push('\n');
        }
    }

    if let Some(failure) = current.take() {
        report.failures.push(failure);
    }
}
