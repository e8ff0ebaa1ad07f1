use crate::args::OutputFormat;
use crate::handlers::load_report;
use anyhow::Result;
use failsight_engine::{CorrelationOptions, attach_correlated_logs};
use failsight_types::truncate;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ParseOutput<'a> {
    summary: &'a failsight_types::TestRunSummary,
    failures: &'a [failsight_types::FailureRecord],
    skipped_tests: &'a [failsight_types::FailureRecord],
}

pub fn run(
    path: &Path,
    report_format: &str,
    logs: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let mut loaded = load_report(path, report_format)?;

    if let Some(log_root) = logs {
        attach_correlated_logs(
            &mut loaded.failures,
            log_root,
            &CorrelationOptions::default(),
        );
    }

    match format {
        OutputFormat::Json => {
            let output = ParseOutput {
                summary: &loaded.summary,
                failures: &loaded.failures,
                skipped_tests: &loaded.skipped_tests,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            let s = &loaded.summary;
            println!(
                "total {}  passed {}  failed {}  errors {}  skipped {}  review {}",
                s.total, s.passed, s.failed, s.errors, s.skipped, s.review
            );
            for (component, counts) in &s.components {
                println!(
                    "  {}: {}/{} passed, {} failed, {} skipped",
                    component, counts.passed, counts.total, counts.failed, counts.skipped
                );
            }
            for failure in &loaded.failures {
                println!(
                    "[{:?}] {} :: {}",
                    failure.kind,
                    failure.test_name,
                    truncate(&failure.error_message, 120)
                );
                for log in &failure.correlated_log_paths {
                    println!("    log: {}", log);
                }
            }
            if !loaded.skipped_tests.is_empty() {
                println!("{} skipped tests not shown", loaded.skipped_tests.len());
            }
        }
    }
    Ok(())
}
