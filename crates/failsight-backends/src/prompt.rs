//! Shared prompt construction.
//!
//! Standalone pure functions rather than trait default methods, so every
//! backend variant formats failures the same way without inheriting state.

use failsight_types::{AnalysisContext, FailureKind, FailureRecord, LogExcerpt};

/// Failures included verbatim in a prompt before the "+N more" suffix
pub const MAX_PROMPT_FAILURES: usize = 5;

/// Log excerpts included in a prompt
pub const MAX_PROMPT_EXCERPTS: usize = 5;

/// Traceback lines carried per failure
const MAX_TRACEBACK_LINES: usize = 10;

fn kind_label(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Failure => "failure",
        FailureKind::Error => "error",
        FailureKind::Skip => "skip",
        FailureKind::Review => "review",
    }
}

/// System preamble: analyst role plus the run's headline counts.
pub fn build_system_prompt(context: &AnalysisContext) -> String {
    let summary = &context.summary;
    format!(
        "You are an expert test failure analyzer. You help engineers understand why \
integration and certification tests fail.\n\
\n\
Test Summary:\n\
- Total Tests: {}\n\
- Failed: {}\n\
- Errors: {}\n\
- Skipped: {}\n\
- Review: {}\n\
\n\
Your task is to:\n\
1. Analyze the test failures and error messages\n\
2. Correlate failures with operational logs when available\n\
3. Identify root causes\n\
4. Suggest concrete solutions\n\
\n\
Be concise, technical, and actionable. Focus on the \"why\" and \"how to fix\".",
        summary.total, summary.failed, summary.errors, summary.skipped, summary.review
    )
}

/// Format up to `max` failures for a prompt, with a "+N more" suffix when
/// the list is truncated.
pub fn format_failures(failures: &[FailureRecord], max: usize) -> String {
    let mut out = String::from("Test Failures:\n\n");

    for (i, failure) in failures.iter().take(max).enumerate() {
        out.push_str(&format!("{}. Test: {}\n", i + 1, failure.test_name));
        out.push_str(&format!("   Class: {}\n", failure.class_name));
        out.push_str(&format!("   Type: {}\n", kind_label(failure.kind)));
        let message = if failure.error_message.is_empty() {
            "No message"
        } else {
            &failure.error_message
        };
        out.push_str(&format!("   Error: {}\n", message));

        if !failure.traceback.is_empty() {
            out.push_str("   Traceback:\n");
            for line in failure.traceback.lines().take(MAX_TRACEBACK_LINES) {
                out.push_str(&format!("     {}\n", line));
            }
        }
        out.push('\n');
    }

    if failures.len() > max {
        out.push_str(&format!("\n... and {} more failures\n", failures.len() - max));
    }

    out
}

/// Format up to `max` correlated log excerpts for a prompt.
pub fn format_log_excerpts(excerpts: &[LogExcerpt], max: usize) -> String {
    if excerpts.is_empty() {
        return String::new();
    }

    let mut out = String::from("\n\nRelated Log Excerpts:\n");
    for (i, excerpt) in excerpts.iter().take(max).enumerate() {
        out.push_str(&format!("\n{}. File: {}\n", i + 1, excerpt.file));
        out.push_str(&format!("   Context:\n{}\n", excerpt.context));
    }
    out
}

/// The complete user prompt for a one-shot analysis request.
pub fn build_analysis_prompt(context: &AnalysisContext) -> String {
    format!(
        "{}{}\n\nProvide a detailed analysis with:\n\
1. Summary of failure patterns\n\
2. Root cause analysis for each failure\n\
3. Correlated log insights\n\
4. Specific solutions",
        format_failures(&context.failures, MAX_PROMPT_FAILURES),
        format_log_excerpts(&context.log_excerpts, MAX_PROMPT_EXCERPTS)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsight_types::TestRunSummary;

    fn context_with_failures(n: usize) -> AnalysisContext {
        let failures = (0..n)
            .map(|i| {
                let mut record = FailureRecord::new(
                    format!("test_case_{}", i),
                    "SomeClass",
                    FailureKind::Failure,
                );
                record.error_message = format!("boom {}", i);
                record
            })
            .collect();
        AnalysisContext {
            failures,
            summary: TestRunSummary {
                total: n as u64,
                failed: n as u64,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_system_prompt_carries_counts() {
        let prompt = build_system_prompt(&context_with_failures(3));
        assert!(prompt.contains("Total Tests: 3"));
        assert!(prompt.contains("Failed: 3"));
    }

    #[test]
    fn test_failures_truncated_with_more_suffix() {
        let context = context_with_failures(8);
        let text = format_failures(&context.failures, MAX_PROMPT_FAILURES);
        assert!(text.contains("1. Test: test_case_0"));
        assert!(text.contains("5. Test: test_case_4"));
        assert!(!text.contains("test_case_5"));
        assert!(text.contains("... and 3 more failures"));
    }

    #[test]
    fn test_no_suffix_when_under_cap() {
        let context = context_with_failures(2);
        let text = format_failures(&context.failures, MAX_PROMPT_FAILURES);
        assert!(!text.contains("more failures"));
    }

    #[test]
    fn test_traceback_capped_at_ten_lines() {
        let mut context = context_with_failures(1);
        context.failures[0].traceback =
            (0..20).map(|i| format!("frame {}\n", i)).collect();
        let text = format_failures(&context.failures, MAX_PROMPT_FAILURES);
        assert!(text.contains("frame 9"));
        assert!(!text.contains("frame 10"));
    }

    #[test]
    fn test_excerpts_section_empty_without_excerpts() {
        assert!(format_log_excerpts(&[], MAX_PROMPT_EXCERPTS).is_empty());
    }

    #[test]
    fn test_analysis_prompt_requests_sections() {
        let prompt = build_analysis_prompt(&context_with_failures(1));
        assert!(prompt.contains("Root cause analysis"));
        assert!(prompt.contains("Specific solutions"));
    }
}
