use crate::args::OutputFormat;
use crate::config::Config;
use crate::handlers::analyze::{assemble_context, print_chunks, print_frames};
use anyhow::{Result, bail};
use failsight_backends::default_registry;
use std::path::Path;
use tokio::sync::mpsc;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    path: &Path,
    message: &str,
    backend_name: &str,
    stream: bool,
    report_format: &str,
    config: Config,
    format: OutputFormat,
) -> Result<()> {
    let context = assemble_context(path, report_format, None)?;

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

    // One-shot invocation: no prior conversation to carry
    let history = Vec::new();

    if stream && backend.supports_streaming() {
        let (tx, rx) = mpsc::channel(32);
        let consumer = async {
            match format {
                OutputFormat::Plain => print_chunks(rx).await,
                OutputFormat::Json => print_frames(rx).await,
            }
        };
        let (call_result, ()) = tokio::join!(
            backend.chat_streaming(message, &history, &context, tx),
            consumer
        );
        call_result?;
    } else {
        let response = backend
            .chat_complete(message, &history, &context)
            .await?;
        match format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "role": "assistant",
                    "content": response,
                }))?
            ),
            OutputFormat::Plain => println!("{}", response),
        }
    }
    Ok(())
}
