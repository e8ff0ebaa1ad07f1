use crate::args::OutputFormat;
use anyhow::Result;
use failsight_engine::{extract_keywords, rank_candidates};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct CandidateOutput {
    path: String,
    filename_score: u32,
    content_score: u32,
    total_score: u32,
}

pub fn run(
    root: &Path,
    test: &str,
    error: &str,
    max_results: usize,
    format: OutputFormat,
) -> Result<()> {
    let keywords = extract_keywords(test, error);
    let candidates: Vec<CandidateOutput> = rank_candidates(root, test, error, max_results)
        .into_iter()
        .map(|c| CandidateOutput {
            path: c.relative_path.clone(),
            filename_score: c.filename_score,
            content_score: c.content_score,
            total_score: c.total_score(),
        })
        .collect();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "keywords": keywords,
                    "candidates": candidates,
                }))?
            );
        }
        OutputFormat::Plain => {
            println!("keywords: {}", keywords.join(", "));
            if candidates.is_empty() {
                println!("no related log files found");
            }
            for candidate in &candidates {
                println!(
                    "{:>4}  {} (name {}, content {})",
                    candidate.total_score,
                    candidate.path,
                    candidate.filename_score,
                    candidate.content_score
                );
            }
        }
    }
    Ok(())
}
