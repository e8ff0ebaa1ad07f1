use crate::args::OutputFormat;
use crate::config::Config;
use anyhow::Result;
use failsight_backends::default_registry;

pub async fn run(config: Config, format: OutputFormat) -> Result<()> {
    let mut registry = default_registry();
    registry.initialize_all(&config.backends).await;
    let listing = registry.list_available();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing)?),
        OutputFormat::Plain => {
            println!("{} backends registered:", listing.total);
            for backend in &listing.available {
                let state = if backend.initialized {
                    "ready"
                } else {
                    "not configured"
                };
                let streaming = if backend.supports_streaming {
                    "streaming"
                } else {
                    "complete-only"
                };
                println!(
                    "  {:<8} {} ({}, {})",
                    backend.name, backend.display_name, state, streaming
                );
            }
        }
    }
    Ok(())
}
