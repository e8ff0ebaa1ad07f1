use crate::Result;
use failsight_types::human_file_size;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

/// A test directory found inside an extracted archive
#[derive(Debug, Clone, Serialize)]
pub struct TestFolder {
    pub name: String,
    pub path: String,
    pub has_results_xml: bool,
    pub has_log_bundle: bool,
}

/// A certification result file found inside an extracted archive
#[derive(Debug, Clone, Serialize)]
pub struct CertificationFile {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub size_human: String,
}

/// Find test directories holding a `tempest_results.xml` artifact.
///
/// A missing root yields an empty listing with a warning; only explicitly
/// requested artifacts are allowed to be fatal.
pub fn discover_test_folders(root: &Path) -> Result<Vec<TestFolder>> {
    if !root.exists() {
        warn!(root = %root.display(), "extraction root does not exist");
        return Ok(Vec::new());
    }

    let mut folders = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
    {
        let dir = entry.path();
        let has_results_xml = dir.join("tempest_results.xml").is_file();
        if !has_results_xml {
            continue;
        }

        let relative = dir
            .strip_prefix(root)
            .unwrap_or(dir)
            .to_string_lossy()
            .into_owned();
        folders.push(TestFolder {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: relative,
            has_results_xml,
            has_log_bundle: dir.join("must-gather").is_dir(),
        });
    }

    info!(count = folders.len(), "discovered test folders");
    Ok(folders)
}

/// Find certification result files (`results-*.xml`) under a root.
pub fn discover_certification_files(root: &Path) -> Result<Vec<CertificationFile>> {
    if !root.exists() {
        warn!(root = %root.display(), "extraction root does not exist");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let name = entry.file_name().to_string_lossy();
        if !(name.starts_with("results-") && name.ends_with(".xml")) {
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        files.push(CertificationFile {
            name: name.into_owned(),
            path: relative,
            size,
            size_human: human_file_size(size),
        });
    }

    info!(count = files.len(), "discovered certification files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_test_folders() {
        let dir = tempfile::TempDir::new().unwrap();
        let run_a = dir.path().join("run-a");
        std::fs::create_dir_all(run_a.join("must-gather")).unwrap();
        std::fs::write(run_a.join("tempest_results.xml"), "<testsuite/>").unwrap();
        let run_b = dir.path().join("run-b");
        std::fs::create_dir_all(&run_b).unwrap();
        std::fs::write(run_b.join("tempest_results.xml"), "<testsuite/>").unwrap();
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();

        let folders = discover_test_folders(dir.path()).unwrap();
        assert_eq!(folders.len(), 2);
        let a = folders.iter().find(|f| f.name == "run-a").unwrap();
        assert!(a.has_log_bundle);
        let b = folders.iter().find(|f| f.name == "run-b").unwrap();
        assert!(!b.has_log_bundle);
    }

    #[test]
    fn test_discover_certification_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("results-20240101.xml"), "<certification/>").unwrap();
        std::fs::write(dir.path().join("notes.xml"), "<x/>").unwrap();

        let files = discover_certification_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "results-20240101.xml");
        assert!(files[0].size > 0);
        assert!(files[0].size_human.ends_with(" B"));
    }

    #[test]
    fn test_missing_root_yields_empty() {
        let folders = discover_test_folders(Path::new("/nonexistent/extract")).unwrap();
        assert!(folders.is_empty());
        let files = discover_certification_files(Path::new("/nonexistent/extract")).unwrap();
        assert!(files.is_empty());
    }
}
