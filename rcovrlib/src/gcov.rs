//! Running the gcov executable and collecting the reports it writes.
//!
//! gcov drops its `*.gcov` text reports into the working directory, so each
//! invocation runs inside a fresh temporary directory; parallel invocations
//! can never clobber each other's output. The report's own `Source:`
//! preamble names the file it describes, relative to the compiler's working
//! directory, and is resolved against the object directory to form the
//! canonical source path.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::CovError;
use crate::filter::normalize_path;
use crate::Result;

/// One text report produced by a gcov invocation.
#[derive(Debug)]
pub struct GcovReport {
    /// Name of the `.gcov` file gcov wrote (path-mangled by
    /// `--preserve-paths`).
    pub gcov_file: PathBuf,
    /// Resolved source path the report describes.
    pub source: PathBuf,
    /// Full report text.
    pub text: String,
}

/// Result of processing one data file: the reports plus any warnings about
/// output that could not be used.
#[derive(Debug, Default)]
pub struct GcovOutput {
    pub reports: Vec<GcovReport>,
    pub warnings: Vec<String>,
}

/// Configured gcov invoker.
#[derive(Debug, Clone)]
pub struct GcovRunner {
    executable: String,
    object_directory: Option<PathBuf>,
    keep_dir: Option<PathBuf>,
}

impl GcovRunner {
    /// Create a runner for the given executable name or path.
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            object_directory: None,
            keep_dir: None,
        }
    }

    /// Override the object directory passed to gcov. Defaults to the data
    /// file's own directory.
    pub fn with_object_directory(mut self, dir: Option<PathBuf>) -> Self {
        self.object_directory = dir;
        self
    }

    /// Keep the generated `.gcov` files by copying them into `dir` instead
    /// of discarding them with the working directory.
    pub fn with_keep_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.keep_dir = dir;
        self
    }

    /// Run gcov on one data file and collect every report it wrote.
    ///
    /// A tool that cannot be spawned is a fatal [`CovError::GcovInvocation`];
    /// a run that fails or produces unusable output only yields warnings, so
    /// one bad data file cannot sink the rest of the run.
    pub fn run(&self, datafile: &Path) -> Result<GcovOutput> {
        let datafile = fs::canonicalize(datafile).map_err(|e| CovError::FileRead {
            path: datafile.to_path_buf(),
            source: e,
        })?;
        let object_dir = match &self.object_directory {
            Some(dir) => dir.clone(),
            None => datafile.parent().unwrap_or(Path::new(".")).to_path_buf(),
        };

        let workdir = tempfile::tempdir()?;
        let output = Command::new(&self.executable)
            .arg("--branch-counts")
            .arg("--branch-probabilities")
            .arg("--preserve-paths")
            .arg("--object-directory")
            .arg(&object_dir)
            .arg(&datafile)
            .current_dir(workdir.path())
            .output()
            .map_err(|e| CovError::GcovInvocation {
                executable: self.executable.clone(),
                message: e.to_string(),
            })?;

        let mut out = GcovOutput::default();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            out.warnings.push(format!(
                "gcov failed on {} ({}): {}",
                datafile.display(),
                output.status,
                stderr.trim()
            ));
            return Ok(out);
        }

        for entry in fs::read_dir(workdir.path())? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_none_or(|e| e != "gcov") {
                continue;
            }

            let text = fs::read_to_string(&path).map_err(|e| CovError::FileRead {
                path: path.clone(),
                source: e,
            })?;
            let gcov_file = PathBuf::from(entry.file_name());

            if let Some(keep_dir) = &self.keep_dir {
                if let Err(e) = fs::copy(&path, keep_dir.join(&gcov_file)) {
                    out.warnings
                        .push(format!("cannot keep {}: {e}", gcov_file.display()));
                }
            }

            match source_from_report(&text) {
                Some(source) => {
                    tracing::debug!(report = %gcov_file.display(), source, "collected gcov report");
                    out.reports.push(GcovReport {
                        gcov_file,
                        source: normalize_path(&object_dir, Path::new(source)),
                        text,
                    });
                }
                None => {
                    out.warnings.push(format!(
                        "{}: report carries no Source: line, skipped",
                        gcov_file.display()
                    ));
                }
            }
        }

        if out.reports.is_empty() && out.warnings.is_empty() {
            out.warnings.push(format!(
                "gcov produced no report for {}",
                datafile.display()
            ));
        }

        Ok(out)
    }
}

/// Extract the `Source:` value from a report's preamble
/// (`-:    0:Source:<path>`).
pub fn source_from_report(text: &str) -> Option<&str> {
    for line in text.lines() {
        let mut fields = line.splitn(3, ':');
        let (Some(marker), Some(lineno), Some(rest)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return None;
        };
        if marker.trim() != "-" || lineno.trim() != "0" {
            return None;
        }
        if let Some(source) = rest.strip_prefix("Source:") {
            return Some(source.trim());
        }
    }
    None
}
