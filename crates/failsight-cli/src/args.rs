use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Plain,
    /// Machine-readable JSON (SSE frames for streaming output)
    Json,
}

#[derive(Parser)]
#[command(name = "failsight")]
#[command(about = "Normalize test reports and analyze failures with AI backends", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(long, default_value = "plain", global = true)]
    pub format: OutputFormat,

    /// Config file path (defaults to the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover report artifacts in an extracted archive
    Scan {
        /// Root of the extracted archive
        root: PathBuf,
    },

    /// Parse a report artifact into the canonical failure model
    Parse {
        /// Report file, or a directory of component validation reports
        path: PathBuf,

        /// Report format (auto-detected when omitted)
        #[arg(long = "report-format", default_value = "auto")]
        report_format: String,

        /// Log bundle root; correlates failures with log files when set
        #[arg(long)]
        logs: Option<PathBuf>,
    },

    /// Rank log files against a failing test
    Correlate {
        /// Log bundle root
        root: PathBuf,

        /// Failing test name
        #[arg(long)]
        test: String,

        /// Failure error message
        #[arg(long, default_value = "")]
        error: String,

        #[arg(long, default_value_t = 5)]
        max_results: usize,
    },

    /// List configured AI backends and their state
    Backends,

    /// Run AI failure analysis on a parsed report
    Analyze {
        /// Report file, or a directory of component validation reports
        path: PathBuf,

        #[arg(long, default_value = "gemini")]
        backend: String,

        /// Stream partial results as they arrive
        #[arg(long)]
        stream: bool,

        #[arg(long = "report-format", default_value = "auto")]
        report_format: String,

        /// Log bundle root for failure/log correlation
        #[arg(long)]
        logs: Option<PathBuf>,
    },

    /// Ask a question about a parsed report
    Chat {
        /// Report file, or a directory of component validation reports
        path: PathBuf,

        #[arg(long)]
        message: String,

        #[arg(long, default_value = "gemini")]
        backend: String,

        /// Stream the answer as it arrives
        #[arg(long)]
        stream: bool,

        #[arg(long = "report-format", default_value = "auto")]
        report_format: String,
    },
}
