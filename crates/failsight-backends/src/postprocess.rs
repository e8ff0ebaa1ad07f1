//! Best-effort decomposition of free-form AI responses.
//!
//! This is heuristic text mining, not guaranteed structurally correct: a
//! response that ignores the requested sections yields mostly-empty
//! collections, and that is a valid outcome. Confidence is a fixed
//! per-backend constant, never computed from content quality.

use failsight_types::{AnalysisResult, FailureInsight};

/// Line prefixes that open an insight
const INSIGHT_MARKERS: [&str; 4] = ["test:", "failure:", "error:", "issue:"];

/// Words that open the solutions section
const SOLUTION_MARKERS: [&str; 5] = ["solution", "fix", "recommendation", "suggest", "resolution"];

/// Error-ish words that qualify a line as a log reference
const LOG_KEYWORDS: [&str; 4] = ["error", "warn", "fail", "exception"];

const MAX_INSIGHTS: usize = 10;
const MAX_SOLUTIONS: usize = 10;
const MAX_LOG_REFS: usize = 5;
const SUMMARY_FALLBACK_CHARS: usize = 500;
const SUMMARY_SECTION_CHARS: usize = 1000;

/// ASCII case-insensitive substring search returning a byte offset valid in
/// the original string.
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

/// First `max` characters of a string, on char boundaries.
fn head_chars(s: &str, max: usize) -> String {
    failsight_types::truncate(s, max)
}

/// Extract the text between two markers, e.g. "Summary" .. "Root Cause".
///
/// No start marker: first 500 chars. Start without end: a bounded slice
/// from the start marker.
pub fn extract_section(text: &str, start_marker: &str, end_marker: &str) -> String {
    let Some(start) = find_ci(text, start_marker) else {
        return head_chars(text, SUMMARY_FALLBACK_CHARS);
    };

    let tail = &text[start..];
    if let Some(relative_end) = find_ci(&tail[start_marker.len()..], end_marker) {
        return tail[..start_marker.len() + relative_end].trim().to_string();
    }

    head_chars(tail, SUMMARY_SECTION_CHARS).trim().to_string()
}

fn is_bullet(line: &str) -> bool {
    line.starts_with('-')
        || line.starts_with('*')
        || line.starts_with('\u{2022}')
        || line
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
}

fn strip_bullet(line: &str) -> &str {
    line.trim_start_matches(|c: char| {
        c == '-' || c == '*' || c == '\u{2022}' || c == '.' || c == ' ' || c.is_ascii_digit()
    })
}

/// Segment the response into per-failure insights.
pub fn parse_failure_insights(text: &str) -> Vec<FailureInsight> {
    let mut insights: Vec<FailureInsight> = Vec::new();
    let mut current: Option<String> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        let lowered = line.to_lowercase();

        if INSIGHT_MARKERS.iter().any(|m| lowered.contains(m)) {
            if let Some(description) = current.take() {
                insights.push(FailureInsight { description });
            }
            current = Some(line.to_string());
        } else if is_bullet(line) {
            if let Some(description) = current.take() {
                insights.push(FailureInsight { description });
            }
            current = Some(strip_bullet(line).to_string());
        } else if let Some(description) = current.as_mut()
            && !line.is_empty()
            && !line.starts_with('#')
        {
            description.push(' ');
            description.push_str(line);
        }
    }

    if let Some(description) = current {
        insights.push(FailureInsight { description });
    }

    insights.truncate(MAX_INSIGHTS);
    insights
}

/// Collect bulleted/numbered lines following a solution-ish heading.
pub fn parse_solutions(text: &str) -> Vec<String> {
    let mut solutions = Vec::new();
    let mut in_section = false;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        let lowered = line.to_lowercase();

        if SOLUTION_MARKERS.iter().any(|m| lowered.contains(m)) {
            in_section = true;
            continue;
        }

        if in_section && is_bullet(line) {
            let solution = strip_bullet(line);
            // Shorter lines are headers, not actionable advice
            if solution.len() > 10 {
                solutions.push(solution.to_string());
            }
        }
    }

    solutions.truncate(MAX_SOLUTIONS);
    solutions
}

/// Collect lines that reference logs alongside an error-ish keyword.
pub fn parse_correlated_logs(text: &str) -> Vec<String> {
    let mut logs = Vec::new();

    for raw_line in text.lines() {
        let lowered = raw_line.to_lowercase();
        if lowered.contains("log") && LOG_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            logs.push(raw_line.trim().to_string());
        }
    }

    logs.truncate(MAX_LOG_REFS);
    logs
}

/// Decompose one completion response into the structured result shape.
pub fn decompose_response(text: &str, confidence: f32) -> AnalysisResult {
    AnalysisResult {
        summary: extract_section(text, "Summary", "Root Cause"),
        failure_insights: parse_failure_insights(text),
        suggested_solutions: parse_solutions(text),
        correlated_logs: parse_correlated_logs(text),
        confidence,
    }
}
