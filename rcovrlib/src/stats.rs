//! Aggregate statistics over merged coverage data.
//!
//! Statistics are computed on demand from the store, never stored alongside
//! it. Excluded lines are omitted from every tally, and a branch is omitted
//! when either it or its line is excluded. A line with no execution data
//! (`#####`) is still instrumented: it counts toward the total and not
//! toward the covered count.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::{CoverageStore, FileCoverage};

/// Percentage of covered units, defined as 100.0 when nothing is
/// instrumented (no instrumentable units means nothing is uncovered).
pub fn percent(covered: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        covered as f64 / total as f64 * 100.0
    }
}

/// Line and branch tallies for one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStats {
    /// Canonical source path these tallies describe.
    pub path: PathBuf,
    /// Instrumented, non-excluded lines.
    pub lines_total: u64,
    /// Instrumented, non-excluded lines with at least one hit.
    pub lines_covered: u64,
    /// Non-excluded branches on non-excluded lines.
    pub branches_total: u64,
    /// Of those, branches taken at least once.
    pub branches_covered: u64,
    /// Counted lines that never ran, ascending.
    pub uncovered_lines: Vec<u32>,
    /// Lines with at least one counted branch never taken, ascending.
    pub uncovered_branch_lines: Vec<u32>,
}

impl FileStats {
    /// Tally one file's merged record.
    pub fn from_file(file: &FileCoverage) -> Self {
        let mut stats = Self {
            path: file.path.clone(),
            lines_total: 0,
            lines_covered: 0,
            branches_total: 0,
            branches_covered: 0,
            uncovered_lines: Vec::new(),
            uncovered_branch_lines: Vec::new(),
        };

        for (number, line) in &file.lines {
            if line.excluded {
                continue;
            }
            stats.lines_total += 1;
            if line.hits.is_covered() {
                stats.lines_covered += 1;
            } else {
                stats.uncovered_lines.push(*number);
            }

            let mut missed_branch = false;
            for branch in &line.branches {
                if branch.excluded {
                    continue;
                }
                stats.branches_total += 1;
                if branch.is_taken() {
                    stats.branches_covered += 1;
                } else {
                    missed_branch = true;
                }
            }
            if missed_branch {
                stats.uncovered_branch_lines.push(*number);
            }
        }

        stats
    }

    /// Line coverage percentage for this file.
    pub fn line_percent(&self) -> f64 {
        percent(self.lines_covered, self.lines_total)
    }

    /// Branch coverage percentage for this file.
    pub fn branch_percent(&self) -> f64 {
        percent(self.branches_covered, self.branches_total)
    }

    /// Counted lines that never ran.
    pub fn lines_uncovered(&self) -> u64 {
        self.lines_total - self.lines_covered
    }
}

/// Project-wide tallies, summed over all files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub lines_total: u64,
    pub lines_covered: u64,
    pub branches_total: u64,
    pub branches_covered: u64,
}

impl ProjectStats {
    /// Sum per-file tallies into project totals.
    pub fn from_files(files: &[FileStats]) -> Self {
        let mut total = Self::default();
        for f in files {
            total.lines_total += f.lines_total;
            total.lines_covered += f.lines_covered;
            total.branches_total += f.branches_total;
            total.branches_covered += f.branches_covered;
        }
        total
    }

    /// Project line coverage percentage.
    pub fn line_percent(&self) -> f64 {
        percent(self.lines_covered, self.lines_total)
    }

    /// Project branch coverage percentage.
    pub fn branch_percent(&self) -> f64 {
        percent(self.branches_covered, self.branches_total)
    }
}

/// Per-file tallies for every file in the store, in path order.
pub fn file_stats(store: &CoverageStore) -> Vec<FileStats> {
    store.iter().map(FileStats::from_file).collect()
}

/// Result of checking project coverage against configured minimums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdCheck {
    /// Line coverage fell below the required minimum.
    pub line_failed: bool,
    /// Branch coverage fell below the required minimum.
    pub branch_failed: bool,
}

impl ThresholdCheck {
    /// True when no threshold was violated.
    pub fn passed(&self) -> bool {
        !self.line_failed && !self.branch_failed
    }

    /// Process exit code for this outcome: 0 on success, 2 for a line
    /// violation, 4 for a branch violation, 6 for both. The codes are
    /// bit-distinct so callers can test each violation independently.
    pub fn exit_code(&self) -> u8 {
        let mut code = 0;
        if self.line_failed {
            code |= 2;
        }
        if self.branch_failed {
            code |= 4;
        }
        code
    }
}

/// Check project coverage against minimum percentages.
///
/// A minimum of 0.0 disables that check. Comparison is strict: coverage
/// exactly at the minimum passes. A project with no branches at all passes
/// the branch check for any minimum ([`percent`] reports 100.0 when the
/// total is zero).
pub fn check_thresholds(
    stats: &ProjectStats,
    fail_under_line: f64,
    fail_under_branch: f64,
) -> ThresholdCheck {
    let line_failed = fail_under_line > 0.0 && stats.line_percent() < fail_under_line;
    let branch_failed = fail_under_branch > 0.0 && stats.branch_percent() < fail_under_branch;
    ThresholdCheck {
        line_failed,
        branch_failed,
    }
}
