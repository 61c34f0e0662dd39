use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::output::RESULTS_PREFIX;

/// Whether `name` looks like a persisted `results_*.json` or `results_*.csv`.
pub fn is_result_file(name: &str) -> bool {
    name.strip_prefix(RESULTS_PREFIX)
        .map(|rest| {
            [".json", ".csv"]
                .iter()
                .any(|ext| rest.len() > ext.len() && rest.ends_with(ext))
        })
        .unwrap_or(false)
}

/// Delete every persisted result file directly inside `dir`, returning the
/// removed paths in name order.
pub fn remove_result_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut targets = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(is_result_file) {
            targets.push(entry.path());
        }
    }
    targets.sort();
    for path in &targets {
        fs::remove_file(path)?;
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_result_artifacts() {
        assert!(is_result_file("results_1754595284.json"));
        assert!(is_result_file("results_1754595284.csv"));
        assert!(!is_result_file("results_.json"));
        assert!(!is_result_file("results_1.txt"));
        assert!(!is_result_file("teuthology.log"));
        assert!(!is_result_file("my_results_1.json"));
    }

    #[test]
    fn removes_results_and_keeps_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["results_1.json", "results_1.csv", "results_2.json", "input.log", "notes.json"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let removed = remove_result_files(dir.path()).unwrap();
        assert_eq!(removed.len(), 3);
        assert!(dir.path().join("input.log").exists());
        assert!(dir.path().join("notes.json").exists());
        assert!(!dir.path().join("results_2.json").exists());
    }
}
