//! Plain-text coverage table.
//!
//! The classic fixed-width report: banner, one row per file with line (or
//! branch) tallies and a Missing column, and a TOTAL row. Uncovered line
//! numbers are compressed into ranges; uncovered branch lines are listed
//! one by one.

use std::fmt::Write;

use crate::report::{relative_to_root, sorted_stats, truncate_label, SortMode};
use crate::run::RunReport;
use crate::stats::FileStats;

const NAME_WIDTH: usize = 40;
const COUNT_WIDTH: usize = 8;
const RULE_WIDTH: usize = 78;

/// Text table generator.
#[derive(Debug)]
pub struct TextFormatter<'a> {
    report: &'a RunReport,
    branches: bool,
    sort: SortMode,
}

impl<'a> TextFormatter<'a> {
    pub fn new(report: &'a RunReport) -> Self {
        Self {
            report,
            branches: false,
            sort: SortMode::default(),
        }
    }

    /// Report branch tallies instead of line tallies.
    pub fn branches(mut self, branches: bool) -> Self {
        self.branches = branches;
        self
    }

    /// Row ordering.
    pub fn sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    /// Render the table.
    pub fn generate(&self) -> String {
        let rule = "-".repeat(RULE_WIDTH);
        let mut out = String::new();

        out.push_str(&rule);
        out.push('\n');
        let _ = writeln!(out, "{}GCC Code Coverage Report", " ".repeat(27));
        let _ = writeln!(out, "Directory: {}", self.report.root.display());
        out.push_str(&rule);
        out.push('\n');

        let (counted, executed) = if self.branches {
            ("Branches", "Taken")
        } else {
            ("Lines", "Exec")
        };
        let _ = writeln!(
            out,
            "{:<NAME_WIDTH$}{:>COUNT_WIDTH$}{:>COUNT_WIDTH$}  Cover   Missing",
            "File", counted, executed
        );
        out.push_str(&rule);
        out.push('\n');

        for file in sorted_stats(&self.report.files, self.sort) {
            out.push_str(&self.file_row(file));
            out.push('\n');
        }

        out.push_str(&rule);
        out.push('\n');
        let (total, covered) = self.totals();
        let _ = writeln!(
            out,
            "{:<NAME_WIDTH$}{:>COUNT_WIDTH$}{:>COUNT_WIDTH$}{:>6}%",
            "TOTAL",
            total,
            covered,
            percent_cell(covered, total)
        );
        out.push_str(&rule);
        out.push('\n');

        out
    }

    fn totals(&self) -> (u64, u64) {
        let t = &self.report.totals;
        if self.branches {
            (t.branches_total, t.branches_covered)
        } else {
            (t.lines_total, t.lines_covered)
        }
    }

    fn file_row(&self, file: &FileStats) -> String {
        let label = relative_to_root(&file.path, &self.report.root);
        let label = truncate_label(&label, NAME_WIDTH - 2);

        let (total, covered, missing) = if self.branches {
            (
                file.branches_total,
                file.branches_covered,
                join_lines(&file.uncovered_branch_lines),
            )
        } else {
            (
                file.lines_total,
                file.lines_covered,
                format_ranges(&file.uncovered_lines),
            )
        };

        format!(
            "{:<NAME_WIDTH$}{:>COUNT_WIDTH$}{:>COUNT_WIDTH$}{:>6}%   {}",
            label,
            total,
            covered,
            percent_cell(covered, total),
            missing
        )
    }
}

/// Truncated integer percentage, or `--` when nothing was counted.
fn percent_cell(covered: u64, total: u64) -> String {
    if total == 0 {
        "--".to_string()
    } else {
        format!("{}", (covered as f64 / total as f64 * 100.0) as u64)
    }
}

/// Compress ascending line numbers into a range list, `3-5,12`.
fn format_ranges(lines: &[u32]) -> String {
    let mut parts = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let start = lines[i];
        let mut end = start;
        while i + 1 < lines.len() && lines[i + 1] == end + 1 {
            end = lines[i + 1];
            i += 1;
        }
        if end > start {
            parts.push(format!("{start}-{end}"));
        } else {
            parts.push(start.to_string());
        }
        i += 1;
    }
    parts.join(",")
}

/// Plain comma list, no aggregation.
fn join_lines(lines: &[u32]) -> String {
    lines
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CoverageStore;
    use crate::stats::ProjectStats;
    use std::path::PathBuf;

    fn sample_report() -> RunReport {
        let files = vec![
            FileStats {
                path: PathBuf::from("/proj/src/alpha.c"),
                lines_total: 10,
                lines_covered: 7,
                branches_total: 4,
                branches_covered: 2,
                uncovered_lines: vec![3, 4, 5],
                uncovered_branch_lines: vec![3, 9],
            },
            FileStats {
                path: PathBuf::from("/proj/src/beta.c"),
                lines_total: 5,
                lines_covered: 5,
                branches_total: 0,
                branches_covered: 0,
                uncovered_lines: vec![],
                uncovered_branch_lines: vec![],
            },
        ];
        let totals = ProjectStats::from_files(&files);
        RunReport {
            store: CoverageStore::new(),
            files,
            totals,
            root: PathBuf::from("/proj"),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_line_table_layout() {
        let report = sample_report();
        let out = TextFormatter::new(&report).generate();

        assert!(out.contains("GCC Code Coverage Report"));
        assert!(out.contains("Directory: /proj"));
        assert!(out.contains("Lines"));
        assert!(out.contains("Exec"));

        let alpha = out.lines().find(|l| l.starts_with("src/alpha.c")).unwrap();
        assert!(alpha.contains("10"));
        assert!(alpha.contains("70%"));
        assert!(alpha.ends_with("3-5"));
    }

    #[test]
    fn test_total_row_sums_files() {
        let report = sample_report();
        let out = TextFormatter::new(&report).generate();
        let total = out.lines().find(|l| l.starts_with("TOTAL")).unwrap();
        // 12 of 15 lines, truncated percent
        assert!(total.contains("15"));
        assert!(total.contains("12"));
        assert!(total.contains("80%"));
    }

    #[test]
    fn test_branch_table_lists_lines_unaggregated() {
        let report = sample_report();
        let out = TextFormatter::new(&report).branches(true).generate();

        assert!(out.contains("Branches"));
        assert!(out.contains("Taken"));
        let alpha = out.lines().find(|l| l.starts_with("src/alpha.c")).unwrap();
        assert!(alpha.contains("50%"));
        assert!(alpha.ends_with("3,9"));

        // No branches at all shows the placeholder percent.
        let beta = out.lines().find(|l| l.starts_with("src/beta.c")).unwrap();
        assert!(beta.contains("--%"));
    }

    #[test]
    fn test_sort_uncovered_applies() {
        let report = sample_report();
        let out = TextFormatter::new(&report)
            .sort(SortMode::Uncovered)
            .generate();
        let beta_pos = out.find("src/beta.c").unwrap();
        let alpha_pos = out.find("src/alpha.c").unwrap();
        assert!(beta_pos < alpha_pos);
    }

    #[test]
    fn test_format_ranges() {
        assert_eq!(format_ranges(&[]), "");
        assert_eq!(format_ranges(&[7]), "7");
        assert_eq!(format_ranges(&[3, 4, 5, 12]), "3-5,12");
        assert_eq!(format_ranges(&[1, 2, 4, 6, 7]), "1-2,4,6-7");
    }
}
