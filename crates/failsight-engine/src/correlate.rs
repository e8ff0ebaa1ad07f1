use failsight_types::LogExcerpt;
use regex::Regex;
use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Extensions accepted as log files
const LOG_EXTENSIONS: [&str; 4] = ["log", "txt", "out", "err"];

/// Service names worth hunting for in failure text
const SERVICE_NAMES: [&str; 7] = [
    "nova", "cinder", "neutron", "glance", "keystone", "heat", "swift",
];

/// Resource nouns worth hunting for in failure text
const RESOURCE_NOUNS: [&str; 8] = [
    "volume", "instance", "network", "port", "router", "image", "server", "snapshot",
];

/// Error-type tokens, normalized to single words
const ERROR_TOKENS: [&str; 7] = [
    "timeout", "error", "failure", "exception", "denied", "not found", "conflict",
];

/// Files above this size are never content-scanned
const MAX_SCAN_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Content scoring reads at most this many lines per file
const MAX_SCAN_LINES: usize = 500;

/// Excerpt extraction stops after this many matches per file
const MAX_EXCERPTS_PER_FILE: usize = 10;

fn uuid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
    })
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z]+").unwrap())
}

/// A scored log file candidate; produced and consumed within one
/// correlation call.
#[derive(Debug, Clone)]
pub struct LogCandidate {
    pub relative_path: String,
    pub filename_score: u32,
    pub content_score: u32,
}

impl LogCandidate {
    pub fn total_score(&self) -> u32 {
        self.filename_score + self.content_score
    }
}

/// Extract search keywords from a failure's test name and error message.
///
/// Output is sorted and deduplicated, so correlation is deterministic for
/// identical inputs.
pub fn extract_keywords(test_name: &str, error_message: &str) -> Vec<String> {
    let mut keywords = BTreeSet::new();
    let name_lower = test_name.to_lowercase();
    let message_lower = error_message.to_lowercase();

    // Alphabetic runs from the test name, short particles dropped
    for m in word_re().find_iter(&name_lower) {
        if m.as_str().len() > 3 {
            keywords.insert(m.as_str().to_string());
        }
    }

    for service in SERVICE_NAMES {
        if name_lower.contains(service) || message_lower.contains(service) {
            keywords.insert(service.to_string());
        }
    }

    for resource in RESOURCE_NOUNS {
        if name_lower.contains(resource) || message_lower.contains(resource) {
            keywords.insert(resource.to_string());
        }
    }

    for token in ERROR_TOKENS {
        if message_lower.contains(token) {
            keywords.insert(token.replace(' ', "_"));
        }
    }

    // Resource identifiers are the strongest correlation signal
    for (i, m) in uuid_re().find_iter(&message_lower).enumerate() {
        if i >= 3 {
            break;
        }
        keywords.insert(m.as_str().to_string());
    }

    keywords.into_iter().collect()
}

fn has_log_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| LOG_EXTENSIONS.contains(&e))
}

/// Score every accepted log file under `root` against the keyword set.
///
/// Files whose name matches nothing are dropped without a content scan;
/// unreadable files are logged and skipped, never fatal.
pub fn score_candidates(root: &Path, keywords: &[String]) -> Vec<LogCandidate> {
    let mut candidates = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if !has_log_extension(path) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_lowercase();
        let filename_score = score_filename(&file_name, keywords);
        if filename_score == 0 {
            continue;
        }

        let content_score = match entry.metadata() {
            Ok(meta) if meta.len() < MAX_SCAN_FILE_SIZE => {
                match scan_log_content(path, keywords) {
                    Ok(score) => score,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "error scanning log file");
                        0
                    }
                }
            }
            _ => 0,
        };

        let relative_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        candidates.push(LogCandidate {
            relative_path,
            filename_score,
            content_score,
        });
    }

    candidates
}

/// Filename relevance: exact stem match beats a substring hit.
fn score_filename(file_name: &str, keywords: &[String]) -> u32 {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    let mut score = 0;
    for keyword in keywords {
        if file_name.contains(keyword.as_str()) {
            if keyword == stem {
                score += 5;
            } else {
                score += 2;
            }
        }
    }
    score
}

/// Content relevance over the first lines of a file; keyword hits on
/// error/warn/fail lines weigh more.
fn scan_log_content(path: &Path, keywords: &[String]) -> std::io::Result<u32> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let mut score = 0;

    for line in reader.lines().take(MAX_SCAN_LINES) {
        let line = match line {
            Ok(line) => line.to_lowercase(),
            // Binary junk inside a .log file; stop scoring, keep the file
            Err(_) => break,
        };
        let errorish =
            line.contains("error") || line.contains("warn") || line.contains("fail");
        for keyword in keywords {
            if line.contains(keyword.as_str()) {
                score += if errorish { 3 } else { 1 };
            }
        }
    }

    Ok(score)
}

/// Rank log files against a test failure, best matches first.
///
/// An empty keyword set yields an empty result without touching the
/// filesystem beyond the root existence check. Deterministic: identical
/// inputs produce identical ordered output.
pub fn rank_candidates(
    root: &Path,
    test_name: &str,
    error_message: &str,
    max_results: usize,
) -> Vec<LogCandidate> {
    if !root.exists() {
        warn!(root = %root.display(), "log root does not exist");
        return Vec::new();
    }

    let keywords = extract_keywords(test_name, error_message);
    if keywords.is_empty() {
        return Vec::new();
    }
    debug!(?keywords, "searching logs");

    let mut candidates = score_candidates(root, &keywords);

    // Stable sort: ties keep walk order
    candidates.sort_by(|a, b| {
        b.total_score()
            .cmp(&a.total_score())
            .then(b.filename_score.cmp(&a.filename_score))
    });
    candidates.truncate(max_results);

    info!(
        matches = candidates.len(),
        test = %test_name,
        "correlated log files"
    );
    candidates
}

/// Convenience wrapper around [`rank_candidates`] returning relative paths.
pub fn find_related_logs(
    root: &Path,
    test_name: &str,
    error_message: &str,
    max_results: usize,
) -> Vec<String> {
    rank_candidates(root, test_name, error_message, max_results)
        .into_iter()
        .map(|c| c.relative_path)
        .collect()
}

/// Pull matching regions out of one log file with surrounding context.
///
/// The read is line-oriented and bounded: scanning stops once the excerpt
/// cap is reached and trailing context is filled, so a huge file is never
/// loaded whole.
pub fn extract_excerpts(
    log_path: &Path,
    keywords: &[String],
    context_lines: usize,
) -> crate::Result<Vec<LogExcerpt>> {
    let file = std::fs::File::open(log_path)?;
    let reader = BufReader::new(file);
    let file_label = log_path.to_string_lossy().into_owned();

    let mut excerpts: Vec<LogExcerpt> = Vec::new();
    // (excerpt index, remaining trailing-context lines)
    let mut pending: Vec<(usize, usize)> = Vec::new();
    let mut back_buffer: VecDeque<String> = VecDeque::with_capacity(context_lines + 1);

    for (index, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let line_lower = line.to_lowercase();

        // Feed trailing context into unfinished excerpts
        pending.retain_mut(|(excerpt_idx, remaining)| {
            excerpts[*excerpt_idx].context.push('\n');
            excerpts[*excerpt_idx].context.push_str(&line);
            *remaining -= 1;
            *remaining > 0
        });

        let matched = excerpts.len() < MAX_EXCERPTS_PER_FILE
            && keywords.iter().any(|k| line_lower.contains(k.as_str()));
        if matched {
            let mut context: Vec<&str> = back_buffer.iter().map(String::as_str).collect();
            context.push(&line);
            excerpts.push(LogExcerpt {
                file: file_label.clone(),
                line_number: index + 1,
                matched_line: line.trim().to_string(),
                context: context.join("\n"),
            });
            if context_lines > 0 {
                pending.push((excerpts.len() - 1, context_lines));
            }
        }

        if excerpts.len() >= MAX_EXCERPTS_PER_FILE && pending.is_empty() {
            break;
        }

        back_buffer.push_back(line);
        if back_buffer.len() > context_lines {
            back_buffer.pop_front();
        }
    }

    Ok(excerpts)
}
