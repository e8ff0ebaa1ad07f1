mod args;
mod config;
mod handlers;

pub use args::{Cli, Commands, OutputFormat};
pub use config::Config;

use anyhow::Result;

pub fn run(cli: Cli) -> Result<()> {
    let format = cli.format;
    let config_path = cli.config.clone();
    let load_config = || Config::load(config_path.as_deref());

    match cli.command {
        Commands::Scan { root } => handlers::scan::run(&root, format),
        Commands::Parse {
            path,
            report_format,
            logs,
        } => handlers::parse::run(&path, &report_format, logs.as_deref(), format),
        Commands::Correlate {
            root,
            test,
            error,
            max_results,
        } => handlers::correlate::run(&root, &test, &error, max_results, format),
        Commands::Backends => {
            let config = load_config()?;
            runtime()?.block_on(handlers::backends::run(config, format))
        }
        Commands::Analyze {
            path,
            backend,
            stream,
            report_format,
            logs,
        } => {
            let config = load_config()?;
            runtime()?.block_on(handlers::analyze::run(
                &path,
                &backend,
                stream,
                &report_format,
                logs.as_deref(),
                config,
                format,
            ))
        }
        Commands::Chat {
            path,
            message,
            backend,
            stream,
            report_format,
        } => {
            let config = load_config()?;
            runtime()?.block_on(handlers::chat::run(
                &path,
                &message,
                &backend,
                stream,
                &report_format,
                config,
                format,
            ))
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}
