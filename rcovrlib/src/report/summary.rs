//! Two-line totals summary.

use std::fmt::Write;

use crate::run::RunReport;

/// Summary generator: `lines: P% (C out of T)` plus the branch line.
#[derive(Debug)]
pub struct SummaryFormatter<'a> {
    report: &'a RunReport,
}

impl<'a> SummaryFormatter<'a> {
    pub fn new(report: &'a RunReport) -> Self {
        Self { report }
    }

    pub fn generate(&self) -> String {
        let t = &self.report.totals;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "lines: {:.1}% ({} out of {})",
            t.line_percent(),
            t.lines_covered,
            t.lines_total
        );
        let _ = writeln!(
            out,
            "branches: {:.1}% ({} out of {})",
            t.branch_percent(),
            t.branches_covered,
            t.branches_total
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CoverageStore;
    use crate::stats::ProjectStats;
    use std::path::PathBuf;

    fn report(totals: ProjectStats) -> RunReport {
        RunReport {
            store: CoverageStore::new(),
            files: Vec::new(),
            totals,
            root: PathBuf::from("/proj"),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_summary_lines() {
        let out = SummaryFormatter::new(&report(ProjectStats {
            lines_total: 15,
            lines_covered: 12,
            branches_total: 4,
            branches_covered: 2,
        }))
        .generate();

        assert_eq!(
            out,
            "lines: 80.0% (12 out of 15)\nbranches: 50.0% (2 out of 4)\n"
        );
    }

    #[test]
    fn test_empty_project_is_vacuously_covered() {
        let out = SummaryFormatter::new(&report(ProjectStats::default())).generate();
        assert!(out.contains("lines: 100.0% (0 out of 0)"));
        assert!(out.contains("branches: 100.0% (0 out of 0)"));
    }
}
