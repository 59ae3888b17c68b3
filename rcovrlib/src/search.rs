//! Locating coverage data files under the search roots.
//!
//! A normal run looks for the binary counter files the instrumented build
//! leaves behind: every `.gcda`, plus any `.gcno` without a sibling `.gcda`
//! (compiled but never executed, so it still deserves a 0% row instead of
//! silence). With pre-generated reports (`--use-gcov-files`) the search
//! collects `.gcov` text files instead and the gcov tool is never run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::error::CovError;
use crate::Result;

/// What kind of input files a search collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Binary counter files (`.gcda`, and orphaned `.gcno`).
    DataFiles,
    /// Pre-generated `.gcov` text reports.
    GcovFiles,
}

/// Check if a directory should be skipped during traversal.
fn should_skip_dir(path: &Path, name: &str, exclude_dirs: &[Regex]) -> bool {
    if name.starts_with('.') {
        return true;
    }
    let path_str = path.to_string_lossy();
    exclude_dirs.iter().any(|p| p.is_match(&path_str))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e == ext)
}

/// Find coverage input files under the given search roots.
///
/// Roots may be directories (walked recursively) or files (taken as-is when
/// they match the mode). Directories matching an `exclude_dirs` pattern are
/// pruned whole. The result is sorted and deduplicated.
pub fn find_datafiles(
    roots: &[PathBuf],
    mode: SearchMode,
    exclude_dirs: &[Regex],
) -> Result<Vec<PathBuf>> {
    let mut gcda = BTreeSet::new();
    let mut gcno = BTreeSet::new();
    let mut gcov = BTreeSet::new();

    for root in roots {
        if !root.exists() {
            return Err(CovError::PathNotFound(root.clone()));
        }

        if root.is_file() {
            collect(root.clone(), mode, &mut gcda, &mut gcno, &mut gcov);
            continue;
        }

        let walker = WalkDir::new(root).follow_links(true).into_iter();
        for entry in walker.filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            if e.file_type().is_dir() {
                let name = e.file_name().to_str().unwrap_or("");
                return !should_skip_dir(e.path(), name, exclude_dirs);
            }
            true
        }) {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            if entry.path().is_file() {
                collect(
                    entry.path().to_path_buf(),
                    mode,
                    &mut gcda,
                    &mut gcno,
                    &mut gcov,
                );
            }
        }
    }

    let mut files: Vec<PathBuf> = match mode {
        SearchMode::GcovFiles => gcov.into_iter().collect(),
        SearchMode::DataFiles => {
            // A .gcno only matters when its .gcda never materialized.
            for candidate in gcno {
                if !gcda.contains(&candidate.with_extension("gcda")) {
                    gcda.insert(candidate);
                }
            }
            gcda.into_iter().collect()
        }
    };

    files.sort();
    files.dedup();
    Ok(files)
}

fn collect(
    path: PathBuf,
    mode: SearchMode,
    gcda: &mut BTreeSet<PathBuf>,
    gcno: &mut BTreeSet<PathBuf>,
    gcov: &mut BTreeSet<PathBuf>,
) {
    match mode {
        SearchMode::DataFiles => {
            if has_extension(&path, "gcda") {
                gcda.insert(path);
            } else if has_extension(&path, "gcno") {
                gcno.insert(path);
            }
        }
        SearchMode::GcovFiles => {
            if has_extension(&path, "gcov") {
                gcov.insert(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_finds_gcda_files() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("obj/sub")).unwrap();
        touch(&temp.path().join("obj/a.gcda"));
        touch(&temp.path().join("obj/a.gcno"));
        touch(&temp.path().join("obj/sub/b.gcda"));
        touch(&temp.path().join("obj/readme.txt"));

        let files =
            find_datafiles(&[temp.path().to_path_buf()], SearchMode::DataFiles, &[]).unwrap();
        assert_eq!(names(&files), vec!["a.gcda", "b.gcda"]);
    }

    #[test]
    fn test_orphaned_gcno_is_included() {
        let temp = tempdir().unwrap();
        touch(&temp.path().join("ran.gcda"));
        touch(&temp.path().join("ran.gcno"));
        touch(&temp.path().join("never_ran.gcno"));

        let files =
            find_datafiles(&[temp.path().to_path_buf()], SearchMode::DataFiles, &[]).unwrap();
        assert_eq!(names(&files), vec!["never_ran.gcno", "ran.gcda"]);
    }

    #[test]
    fn test_gcov_mode_collects_reports() {
        let temp = tempdir().unwrap();
        touch(&temp.path().join("a.c.gcov"));
        touch(&temp.path().join("a.gcda"));

        let files =
            find_datafiles(&[temp.path().to_path_buf()], SearchMode::GcovFiles, &[]).unwrap();
        assert_eq!(names(&files), vec!["a.c.gcov"]);
    }

    #[test]
    fn test_excluded_directories_are_pruned() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("keep")).unwrap();
        fs::create_dir_all(temp.path().join("vendor/deep")).unwrap();
        touch(&temp.path().join("keep/a.gcda"));
        touch(&temp.path().join("vendor/deep/b.gcda"));

        let exclude = vec![Regex::new("vendor").unwrap()];
        let files = find_datafiles(
            &[temp.path().to_path_buf()],
            SearchMode::DataFiles,
            &exclude,
        )
        .unwrap();
        assert_eq!(names(&files), vec!["a.gcda"]);
    }

    #[test]
    fn test_hidden_directories_are_skipped() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();
        touch(&temp.path().join(".git/stale.gcda"));
        touch(&temp.path().join("real.gcda"));

        let files =
            find_datafiles(&[temp.path().to_path_buf()], SearchMode::DataFiles, &[]).unwrap();
        assert_eq!(names(&files), vec!["real.gcda"]);
    }

    #[test]
    fn test_file_root_is_taken_directly() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("only.gcda");
        touch(&file);

        let files = find_datafiles(&[file.clone()], SearchMode::DataFiles, &[]).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn test_duplicate_roots_dedup() {
        let temp = tempdir().unwrap();
        touch(&temp.path().join("a.gcda"));

        let roots = vec![temp.path().to_path_buf(), temp.path().to_path_buf()];
        let files = find_datafiles(&roots, SearchMode::DataFiles, &[]).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let result = find_datafiles(
            &[PathBuf::from("/nonexistent/path")],
            SearchMode::DataFiles,
            &[],
        );
        assert!(matches!(result, Err(CovError::PathNotFound(_))));
    }
}
