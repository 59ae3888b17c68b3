//! Run orchestration: search, gcov invocation, parsing, exclusion, merge.
//!
//! Per-datafile work (running gcov, parsing its reports, scanning source
//! files for exclusion markers) carries no shared state and runs on the
//! rayon pool; the merge into the one `CoverageStore` happens afterwards on
//! the calling thread, one fragment at a time. Merge order cannot affect
//! the outcome, so the parallel split is invisible in the results.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::CovError;
use crate::exclude::apply_exclusions;
use crate::gcov::{source_from_report, GcovRunner};
use crate::merge::merge_fragment;
use crate::model::{CoverageStore, FileCoverage};
use crate::options::{Options, ResolvedOptions};
use crate::parser::parse_report;
use crate::search::{find_datafiles, SearchMode};
use crate::stats::{check_thresholds, file_stats, FileStats, ProjectStats, ThresholdCheck};
use crate::Result;

/// Everything a finished run produced: the merged store, the statistics
/// derived from it, and the warnings collected along the way.
#[derive(Debug)]
pub struct RunReport {
    /// Merged per-file coverage, keyed by canonical path.
    pub store: CoverageStore,
    /// Per-file tallies, in path order.
    pub files: Vec<FileStats>,
    /// Project-wide tallies.
    pub totals: ProjectStats,
    /// Absolute project root, for root-relative display.
    pub root: PathBuf,
    /// Deferred warnings (skipped records, unreadable sources, failed
    /// gcov runs). Reported after processing, never fatal.
    pub warnings: Vec<String>,
}

impl RunReport {
    /// Evaluate the configured coverage minimums against the totals.
    pub fn threshold_check(&self, fail_under_line: f64, fail_under_branch: f64) -> ThresholdCheck {
        check_thresholds(&self.totals, fail_under_line, fail_under_branch)
    }
}

/// Fragments and warnings produced from one data file.
#[derive(Debug, Default)]
struct DatafileOutcome {
    fragments: Vec<FileCoverage>,
    warnings: Vec<String>,
}

/// Collect, aggregate and tally coverage according to `options`.
///
/// Filter patterns are compiled first; an invalid one fails the run before
/// any file is touched. Everything else that goes wrong with a single
/// report degrades to a warning, except malformed report records, which
/// are fatal unless `ignore_parse_errors` is set.
pub fn run(options: &Options) -> Result<RunReport> {
    let resolved = options.resolve()?;

    let mode = if options.use_gcov_files {
        SearchMode::GcovFiles
    } else {
        SearchMode::DataFiles
    };
    let datafiles = find_datafiles(&resolved.search_paths, mode, &resolved.exclude_dirs)?;
    tracing::debug!(count = datafiles.len(), "collected coverage input files");

    let keep_dir = if options.keep_gcov_files && !options.use_gcov_files {
        Some(std::env::current_dir()?)
    } else {
        None
    };
    let runner = GcovRunner::new(options.gcov_executable.clone())
        .with_object_directory(resolved.object_directory.clone())
        .with_keep_dir(keep_dir);

    let outcomes: Vec<Result<DatafileOutcome>> = datafiles
        .par_iter()
        .map(|datafile| {
            if options.use_gcov_files {
                process_gcov_file(datafile, options, &resolved)
            } else {
                process_datafile(datafile, &runner, options, &resolved)
            }
        })
        .collect();

    let mut store = CoverageStore::new();
    let mut warnings = Vec::new();
    for outcome in outcomes {
        let outcome = outcome?;
        for fragment in outcome.fragments {
            merge_fragment(&mut store, fragment);
        }
        warnings.extend(outcome.warnings);
    }

    if options.delete_data_files && !options.use_gcov_files {
        for datafile in &datafiles {
            if datafile.extension().is_some_and(|e| e == "gcda") {
                if let Err(e) = fs::remove_file(datafile) {
                    warnings.push(format!("cannot remove {}: {e}", datafile.display()));
                }
            }
        }
    }

    tracing::debug!(files = store.len(), "gathered coverage data");

    let files = file_stats(&store);
    let totals = ProjectStats::from_files(&files);

    Ok(RunReport {
        store,
        files,
        totals,
        root: resolved.root_dir,
        warnings,
    })
}

/// Run gcov on one data file and turn its reports into fragments.
fn process_datafile(
    datafile: &Path,
    runner: &GcovRunner,
    options: &Options,
    resolved: &ResolvedOptions,
) -> Result<DatafileOutcome> {
    tracing::debug!(datafile = %datafile.display(), "processing");

    let output = runner.run(datafile)?;
    let mut outcome = DatafileOutcome {
        warnings: output.warnings,
        ..Default::default()
    };

    for report in output.reports {
        if !resolved.gcov_filter.matches(&report.gcov_file) {
            tracing::debug!(report = %report.gcov_file.display(), "filtered out gcov file");
            continue;
        }
        build_fragment(report.source, &report.text, options, resolved, &mut outcome)?;
    }
    Ok(outcome)
}

/// Consume one pre-generated `.gcov` report.
fn process_gcov_file(
    gcov_file: &Path,
    options: &Options,
    resolved: &ResolvedOptions,
) -> Result<DatafileOutcome> {
    tracing::debug!(gcov_file = %gcov_file.display(), "processing");

    let mut outcome = DatafileOutcome::default();
    if !resolved.gcov_filter.matches(gcov_file) {
        return Ok(outcome);
    }

    let text = match fs::read_to_string(gcov_file) {
        Ok(text) => text,
        Err(e) => {
            outcome
                .warnings
                .push(format!("cannot read {}: {e}", gcov_file.display()));
            return Ok(outcome);
        }
    };

    let Some(source) = source_from_report(&text) else {
        outcome.warnings.push(format!(
            "{}: report carries no Source: line, skipped",
            gcov_file.display()
        ));
        return Ok(outcome);
    };

    let object_dir = gcov_file.parent().unwrap_or(Path::new("."));
    let source = resolved.canonical_source(object_dir, Path::new(source));
    build_fragment(source, &text, options, resolved, &mut outcome)?;
    Ok(outcome)
}

/// Parse and exclusion-annotate one report, appending the fragment to the
/// outcome when its source passes the filters.
fn build_fragment(
    source: PathBuf,
    text: &str,
    options: &Options,
    resolved: &ResolvedOptions,
    outcome: &mut DatafileOutcome,
) -> Result<()> {
    if !resolved.source_filter.matches(&source) {
        tracing::debug!(source = %source.display(), "filtered out source file");
        return Ok(());
    }

    let parsed = parse_report(&source, text, options.ignore_parse_errors)?;
    outcome.warnings.extend(parsed.warnings);
    let mut fragment = parsed.fragment;

    match fs::read_to_string(&source) {
        Ok(source_text) => {
            apply_exclusions(
                &mut fragment,
                &source_text,
                options.exclude_unreachable_branches,
            );
        }
        Err(e) => {
            // No source, no inline markers; the counts still stand.
            let err = CovError::MissingSource {
                path: source.clone(),
                source: e,
            };
            outcome.warnings.push(format!("{err}; exclusion markers not applied"));
        }
    }

    outcome.fragments.push(fragment);
    Ok(())
}
