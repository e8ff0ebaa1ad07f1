use crate::args::OutputFormat;
use crate::config::Config;
use crate::handlers::load_report;
use anyhow::{Result, bail};
use failsight_backends::{StreamEvent, bridge_events, default_registry};
use failsight_engine::{
    CorrelationOptions, attach_correlated_logs, build_context, gather_excerpts,
};
use failsight_types::AnalysisContext;
use futures::StreamExt;
use std::io::Write;
use std::path::Path;
use tokio::sync::mpsc;

/// Build the analysis context for one report artifact.
pub(crate) fn assemble_context(
    path: &Path,
    report_format: &str,
    logs: Option<&Path>,
) -> Result<AnalysisContext> {
    let mut loaded = load_report(path, report_format)?;

    let mut excerpts = Vec::new();
    if let Some(log_root) = logs {
        let options = CorrelationOptions::default();
        attach_correlated_logs(&mut loaded.failures, log_root, &options);
        excerpts = gather_excerpts(&loaded.failures, log_root, &options);
    }

    Ok(build_context(
        loaded.summary,
        loaded.failures,
        loaded.skipped_tests,
        excerpts,
        None,
    ))
}

/// Drain a chunk channel to the terminal: text inline, errors to stderr.
pub(crate) async fn print_chunks(mut rx: mpsc::Receiver<StreamEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Text(chunk) => {
                print!("{}", chunk);
                let _ = std::io::stdout().flush();
            }
            StreamEvent::Error(message) => eprintln!("\n[stream error: {}]", message),
        }
    }
    println!();
}

/// Drain a chunk channel as wire-format SSE frames.
pub(crate) async fn print_frames(rx: mpsc::Receiver<StreamEvent>) {
    let mut frames = Box::pin(bridge_events(rx));
    while let Some(frame) = frames.next().await {
        print!("{}", frame);
        let _ = std::io::stdout().flush();
    }
}

pub async fn run(
    path: &Path,
    backend_name: &str,
    stream: bool,
    report_format: &str,
    logs: Option<&Path>,
    config: Config,
    format: OutputFormat,
) -> Result<()> {
    let context = assemble_context(path, report_format, logs)?;

    let mut registry = default_registry();
    registry.initialize_all(&config.backends).await;
    let Some(backend) = registry.get(backend_name) else {
        bail!(
            "backend '{}' not available; registered: {}",
            backend_name,
            registry.names().join(", ")
        );
    };
    if !backend.is_initialized() {
        bail!(
            "backend '{}' not initialized; check its API key or endpoint configuration",
            backend_name
        );
    }

    if stream && backend.supports_streaming() {
        let (tx, rx) = mpsc::channel(32);
        let consumer = async {
            match format {
                OutputFormat::Plain => print_chunks(rx).await,
                OutputFormat::Json => print_frames(rx).await,
            }
        };
        let (call_result, ()) = tokio::join!(backend.analyze_streaming(&context, tx), consumer);
        call_result?;
    } else {
        let result = backend.analyze_complete(&context).await?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
            OutputFormat::Plain => {
                println!("{}\n", result.summary);
                if !result.failure_insights.is_empty() {
                    println!("Insights:");
                    for insight in &result.failure_insights {
                        println!("  - {}", insight.description);
                    }
                }
                if !result.suggested_solutions.is_empty() {
                    println!("Suggested solutions:");
                    for solution in &result.suggested_solutions {
                        println!("  - {}", solution);
                    }
                }
                if !result.correlated_logs.is_empty() {
                    println!("Log references:");
                    for log in &result.correlated_logs {
                        println!("  - {}", log);
                    }
                }
                println!("confidence: {:.2}", result.confidence);
            }
        }
    }
    Ok(())
}
