//! Options for a coverage aggregation run.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::filter::{compile_patterns, normalize_path, PathFilter};
use crate::Result;

/// Options controlling search, gcov invocation, and aggregation.
///
/// Rendering choices (output format, sorting, branch tables) are not part
/// of this struct; they belong to the individual report builders.
#[derive(Debug, Clone)]
pub struct Options {
    /// Root directory of the project. Filters resolve against it and
    /// reports display paths relative to it.
    pub root: PathBuf,
    /// Directories (or single files) to search for coverage data. Empty
    /// means the root plus the object directory, if one is set.
    pub search_paths: Vec<PathBuf>,
    /// Keep only source files matching one of these patterns. Empty means
    /// everything under the root.
    pub filter: Vec<String>,
    /// Drop source files matching one of these patterns.
    pub exclude: Vec<String>,
    /// Keep only gcov report files matching this pattern.
    pub gcov_filter: Option<String>,
    /// Drop gcov report files matching one of these patterns.
    pub gcov_exclude: Vec<String>,
    /// Prune whole directories matching one of these patterns from the
    /// search.
    pub exclude_directories: Vec<String>,
    /// gcov executable name or path.
    pub gcov_executable: String,
    /// Directory holding the object files, when gcov cannot find it from
    /// the data file alone.
    pub object_directory: Option<PathBuf>,
    /// Exclude exception-cleanup edges and branches on trivial lines.
    pub exclude_unreachable_branches: bool,
    /// Consume existing `.gcov` reports instead of running gcov.
    pub use_gcov_files: bool,
    /// Skip unparseable report records instead of failing the run.
    pub ignore_parse_errors: bool,
    /// Keep the generated `.gcov` files in the working directory.
    pub keep_gcov_files: bool,
    /// Remove `.gcda` data files once they have been processed.
    pub delete_data_files: bool,
    /// Minimum total line coverage, 0.0 to disable the check.
    pub fail_under_line: f64,
    /// Minimum total branch coverage, 0.0 to disable the check.
    pub fail_under_branch: f64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            search_paths: Vec::new(),
            filter: Vec::new(),
            exclude: Vec::new(),
            gcov_filter: None,
            gcov_exclude: Vec::new(),
            exclude_directories: Vec::new(),
            gcov_executable: std::env::var("GCOV").unwrap_or_else(|_| "gcov".to_string()),
            object_directory: None,
            exclude_unreachable_branches: false,
            use_gcov_files: false,
            ignore_parse_errors: false,
            keep_gcov_files: false,
            delete_data_files: false,
            fail_under_line: 0.0,
            fail_under_branch: 0.0,
        }
    }
}

impl Options {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the project root.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the search paths.
    pub fn search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    /// Set the source include patterns.
    pub fn filter(mut self, patterns: Vec<String>) -> Self {
        self.filter = patterns;
        self
    }

    /// Set the source exclude patterns.
    pub fn exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    /// Set the gcov executable.
    pub fn gcov_executable(mut self, executable: impl Into<String>) -> Self {
        self.gcov_executable = executable.into();
        self
    }

    /// Set the object directory.
    pub fn object_directory(mut self, dir: Option<PathBuf>) -> Self {
        self.object_directory = dir;
        self
    }

    /// Set the coverage minimums checked after the run.
    pub fn fail_under(mut self, line: f64, branch: f64) -> Self {
        self.fail_under_line = line;
        self.fail_under_branch = branch;
        self
    }

    /// Compile patterns and resolve paths. Fails with
    /// [`crate::CovError::InvalidFilterPattern`] before anything is parsed.
    pub(crate) fn resolve(&self) -> Result<ResolvedOptions> {
        let cwd = std::env::current_dir()?;
        let root_dir = normalize_path(&cwd, &self.root);

        let mut source_filter = PathFilter::new().exclude_many(&self.exclude)?;
        if self.filter.is_empty() {
            // Everything under the root, and nothing else.
            let escaped = regex::escape(&format!(
                "{}{}",
                root_dir.display(),
                std::path::MAIN_SEPARATOR
            ));
            source_filter = source_filter.include(&escaped)?;
        } else {
            source_filter = source_filter.include_many(&self.filter)?;
        }

        let mut gcov_filter = PathFilter::new().exclude_many(&self.gcov_exclude)?;
        if let Some(pattern) = &self.gcov_filter {
            gcov_filter = gcov_filter.include(pattern)?;
        }

        let exclude_dirs = compile_patterns(&self.exclude_directories)?;

        let object_directory = self
            .object_directory
            .as_ref()
            .map(|dir| normalize_path(&cwd, dir));

        let search_paths = if self.search_paths.is_empty() {
            let mut paths = vec![root_dir.clone()];
            paths.extend(object_directory.clone());
            paths
        } else {
            self.search_paths
                .iter()
                .map(|p| normalize_path(&cwd, p))
                .collect()
        };

        Ok(ResolvedOptions {
            root_dir,
            search_paths,
            source_filter,
            gcov_filter,
            exclude_dirs,
            object_directory,
        })
    }
}

/// Options with patterns compiled and paths made absolute.
#[derive(Debug)]
pub(crate) struct ResolvedOptions {
    pub root_dir: PathBuf,
    pub search_paths: Vec<PathBuf>,
    pub source_filter: PathFilter,
    pub gcov_filter: PathFilter,
    pub exclude_dirs: Vec<Regex>,
    pub object_directory: Option<PathBuf>,
}

impl ResolvedOptions {
    /// Resolve a source path reported by gcov into the canonical merge key.
    pub fn canonical_source(&self, object_dir: &Path, source: &Path) -> PathBuf {
        let base = if source.is_absolute() {
            Path::new("")
        } else {
            object_dir
        };
        normalize_path(base, source)
    }
}
