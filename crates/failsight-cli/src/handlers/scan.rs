use crate::args::OutputFormat;
use anyhow::Result;
use failsight_parsers::{discover_certification_files, discover_test_folders};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ScanListing {
    test_folders: Vec<failsight_parsers::TestFolder>,
    certification_files: Vec<failsight_parsers::CertificationFile>,
}

pub fn run(root: &Path, format: OutputFormat) -> Result<()> {
    let listing = ScanListing {
        test_folders: discover_test_folders(root)?,
        certification_files: discover_certification_files(root)?,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing)?),
        OutputFormat::Plain => {
            println!("Test folders ({}):", listing.test_folders.len());
            for folder in &listing.test_folders {
                let logs = if folder.has_log_bundle {
                    " [logs]"
                } else {
                    ""
                };
                println!("  {}{}", folder.path, logs);
            }
            println!(
                "Certification files ({}):",
                listing.certification_files.len()
            );
            for file in &listing.certification_files {
                println!("  {} ({})", file.path, file.size_human);
            }
        }
    }
    Ok(())
}
