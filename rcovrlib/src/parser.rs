//! gcov text-report parsing.
//!
//! A gcov report is line-oriented. Each record is one of:
//!
//! - **Line record**: `<marker>:<lineno>:<source text>` where marker is a
//!   non-negative hit count, `#####` (instrumented but not executed), `-`
//!   (no code on the line), or `=====` (excluded by the tool itself).
//!   Records with line number 0 are preamble metadata (`Source:`, `Graph:`,
//!   `Runs:`) and are skipped here.
//! - **Branch record**: `branch N taken M`, optionally suffixed
//!   `(fallthrough)` or `(throw)`, or `branch N never executed`. A branch
//!   record describes the most recent line record, in declaration order.
//! - **Skipped metadata**: records starting `function `, `call ` or
//!   `unconditional `, and blank lines.
//!
//! Anything else is malformed. By default a malformed record aborts the
//! report; with `ignore_parse_errors` it is skipped and a warning is kept
//! for end-of-run reporting.

use std::path::{Path, PathBuf};

use crate::error::CovError;
use crate::model::{BranchCoverage, BranchKind, FileCoverage, LineCoverage, LineHits};
use crate::Result;

/// Result of parsing one gcov report: the coverage fragment plus any
/// warnings produced while skipping unparseable records.
#[derive(Debug)]
pub struct ParsedReport {
    /// Per-file coverage fragment, not yet merged or exclusion-annotated.
    pub fragment: FileCoverage,
    /// Deferred warnings (only non-empty under `ignore_parse_errors`).
    pub warnings: Vec<String>,
}

/// Line-by-line report parser.
///
/// Branch records carry no line number of their own; they attach to the
/// line record parsed immediately before them. `current_line` holds that
/// state: the number of the last record that produced a `LineCoverage`,
/// reset by "no code" records so stray branches cannot attach across them.
struct ReportParser {
    fragment: FileCoverage,
    current_line: Option<u32>,
    warnings: Vec<String>,
    ignore_parse_errors: bool,
    source_path: PathBuf,
}

impl ReportParser {
    fn new(source_path: PathBuf, ignore_parse_errors: bool) -> Self {
        Self {
            fragment: FileCoverage::new(source_path.clone()),
            current_line: None,
            warnings: Vec::new(),
            ignore_parse_errors,
            source_path,
        }
    }

    fn parse(mut self, text: &str) -> Result<ParsedReport> {
        for (idx, raw) in text.lines().enumerate() {
            let record = raw.strip_suffix('\r').unwrap_or(raw);
            self.handle_record(idx + 1, record)?;
        }

        Ok(ParsedReport {
            fragment: self.fragment,
            warnings: self.warnings,
        })
    }

    fn handle_record(&mut self, record_no: usize, record: &str) -> Result<()> {
        let trimmed = record.trim_start();

        if trimmed.starts_with("branch ") {
            return self.handle_branch(record_no, trimmed);
        }
        if trimmed.starts_with("function ")
            || trimmed.starts_with("call ")
            || trimmed.starts_with("unconditional ")
        {
            return Ok(());
        }

        let mut fields = record.splitn(3, ':');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(marker), Some(lineno), Some(_source)) => {
                self.handle_line(record_no, marker.trim(), lineno.trim())
            }
            _ if trimmed.is_empty() => Ok(()),
            _ => self.malformed(record_no, format!("unrecognized record '{record}'")),
        }
    }

    fn handle_line(&mut self, record_no: usize, marker: &str, lineno: &str) -> Result<()> {
        let number: u32 = match lineno.parse() {
            Ok(n) => n,
            Err(_) => {
                return self.malformed(record_no, format!("invalid line number '{lineno}'"));
            }
        };

        // Line 0 records are preamble (Source:, Graph:, Runs:, ...).
        if number == 0 {
            return Ok(());
        }

        let line = match marker {
            "-" => {
                // No code on this line; a following branch record would be
                // orphaned, so forget the current line.
                self.current_line = None;
                return Ok(());
            }
            "#####" => LineCoverage::new(LineHits::NotExecuted),
            "=====" => LineCoverage::tool_excluded(),
            _ => match marker.parse::<u64>() {
                Ok(count) => LineCoverage::new(LineHits::Count(count)),
                Err(_) => {
                    return self.malformed(record_no, format!("invalid count marker '{marker}'"));
                }
            },
        };

        self.fragment.insert_line(number, line);
        self.current_line = Some(number);
        Ok(())
    }

    fn handle_branch(&mut self, record_no: usize, record: &str) -> Result<()> {
        let Some(number) = self.current_line else {
            return self.malformed(record_no, "branch record before any line record".to_string());
        };

        let mut words = record.split_whitespace();
        let _ = words.next(); // "branch"

        let index: u32 = match words.next().and_then(|w| w.parse().ok()) {
            Some(i) => i,
            None => {
                return self.malformed(record_no, format!("invalid branch record '{record}'"));
            }
        };

        let branch = match (words.next(), words.next(), words.next()) {
            (Some("never"), Some("executed"), None) => {
                BranchCoverage::new(index, 0, BranchKind::Normal)
            }
            (Some("taken"), Some(count), suffix) => {
                let taken: u64 = match count.parse() {
                    Ok(n) => n,
                    Err(_) => {
                        return self
                            .malformed(record_no, format!("invalid branch count '{count}'"));
                    }
                };
                let kind = match suffix {
                    None => BranchKind::Normal,
                    Some("(fallthrough)") => BranchKind::Fallthrough,
                    Some("(throw)") => BranchKind::Throw,
                    Some(other) => {
                        return self
                            .malformed(record_no, format!("invalid branch suffix '{other}'"));
                    }
                };
                BranchCoverage::new(index, taken, kind)
            }
            _ => {
                return self.malformed(record_no, format!("invalid branch record '{record}'"));
            }
        };

        if let Some(line) = self.fragment.lines.get_mut(&number) {
            line.add_branch(branch);
        }
        Ok(())
    }

    /// Abort with `MalformedReport`, or record a warning and continue when
    /// parse errors are ignored.
    fn malformed(&mut self, record_no: usize, reason: String) -> Result<()> {
        if self.ignore_parse_errors {
            self.warnings.push(format!(
                "{}: skipped record {record_no}: {reason}",
                self.source_path.display()
            ));
            Ok(())
        } else {
            Err(CovError::MalformedReport {
                path: self.source_path.clone(),
                line: record_no,
                reason,
            })
        }
    }
}

/// Parse one gcov report into a coverage fragment for `source_path`.
///
/// The parser performs no I/O; `text` is the full report content. With
/// `ignore_parse_errors`, records that do not match the grammar are skipped
/// and reported in [`ParsedReport::warnings`]; otherwise the first such
/// record fails the whole report.
///
/// # Example
///
/// ```rust
/// use rcovrlib::parser::parse_report;
/// use rcovrlib::model::LineHits;
///
/// let report = "\
///         -:    0:Source:src/answer.c
///         -:    1:// header
///         4:    2:int answer() {
///         4:    3:    return 42;
///     ######:    4:}
/// ";
/// let parsed = parse_report("src/answer.c", report, false).unwrap();
/// assert_eq!(parsed.fragment.line(2).map(|l| l.hits), Some(LineHits::Count(4)));
/// assert_eq!(parsed.fragment.line(4).map(|l| l.hits), Some(LineHits::NotExecuted));
/// assert!(parsed.fragment.line(1).is_none());
/// ```
pub fn parse_report(
    source_path: impl AsRef<Path>,
    text: &str,
    ignore_parse_errors: bool,
) -> Result<ParsedReport> {
    ReportParser::new(source_path.as_ref().to_path_buf(), ignore_parse_errors).parse(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> FileCoverage {
        parse_report("test.c", text, false).unwrap().fragment
    }

    #[test]
    fn test_counts_and_markers() {
        let report = "\
        -:    0:Source:test.c
        -:    1:// comment only
        3:    2:int main() {
        0:    3:    int unused = 0;
    #####:    4:    never_called();
    =====:    5:    tool_excluded();
        -:    6:}
";
        let fragment = parse(report);

        assert!(fragment.line(1).is_none());
        assert_eq!(fragment.line(2).unwrap().hits, LineHits::Count(3));
        assert_eq!(fragment.line(3).unwrap().hits, LineHits::Count(0));
        assert_eq!(fragment.line(4).unwrap().hits, LineHits::NotExecuted);

        let excluded = fragment.line(5).unwrap();
        assert_eq!(excluded.hits, LineHits::NotExecuted);
        assert!(excluded.excluded);
        assert!(!fragment.line(4).unwrap().excluded);
    }

    #[test]
    fn test_preamble_is_skipped() {
        let report = "\
        -:    0:Source:test.c
        -:    0:Graph:test.gcno
        -:    0:Data:test.gcda
        -:    0:Runs:2
        1:    1:int x;
";
        let fragment = parse(report);
        assert_eq!(fragment.lines.len(), 1);
        assert_eq!(fragment.line(1).unwrap().hits, LineHits::Count(1));
    }

    #[test]
    fn test_branches_attach_to_preceding_line() {
        let report = "\
        5:    7:    if (x > 0)
branch  0 taken 4 (fallthrough)
branch  1 taken 1
branch  2 never executed
        4:    8:        y++;
";
        let fragment = parse(report);

        let line = fragment.line(7).unwrap();
        assert_eq!(line.branches.len(), 3);
        assert_eq!(line.branches[0].taken, 4);
        assert_eq!(line.branches[0].kind, BranchKind::Fallthrough);
        assert_eq!(line.branches[1].taken, 1);
        assert_eq!(line.branches[1].kind, BranchKind::Normal);
        assert_eq!(line.branches[2].taken, 0);
        assert!(fragment.line(8).unwrap().branches.is_empty());
    }

    #[test]
    fn test_throw_branches_are_classified() {
        let report = "\
        2:   12:    risky();
branch  0 taken 2 (fallthrough)
branch  1 taken 0 (throw)
";
        let fragment = parse(report);
        let line = fragment.line(12).unwrap();
        assert_eq!(line.branches[1].kind, BranchKind::Throw);
    }

    #[test]
    fn test_function_and_call_records_are_skipped() {
        let report = "\
function main called 1 returned 100% blocks executed 80%
        1:    1:int main() {
call    0 returned 1
unconditional  0 taken 1
        1:    2:}
";
        let fragment = parse(report);
        assert_eq!(fragment.lines.len(), 2);
    }

    #[test]
    fn test_branch_before_any_line_is_malformed() {
        let err = parse_report("test.c", "branch  0 taken 1\n", false).unwrap_err();
        assert!(matches!(err, CovError::MalformedReport { line: 1, .. }));
    }

    #[test]
    fn test_branch_after_no_code_line_is_malformed() {
        let report = "\
        1:    1:int x;
        -:    2:
branch  0 taken 1
";
        let err = parse_report("test.c", report, false).unwrap_err();
        assert!(matches!(err, CovError::MalformedReport { line: 3, .. }));
    }

    #[test]
    fn test_garbage_record_is_malformed() {
        let err = parse_report("test.c", "not a gcov record\n", false).unwrap_err();
        match err {
            CovError::MalformedReport { path, line, .. } => {
                assert_eq!(path, PathBuf::from("test.c"));
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_branch_percentage_is_malformed() {
        // Reports produced without --branch-counts carry percentages, which
        // cannot be aggregated.
        let report = "\
        5:    1:    if (x)
branch  0 taken 61%
";
        assert!(parse_report("test.c", report, false).is_err());
    }

    #[test]
    fn test_ignore_parse_errors_skips_and_warns() {
        let report = "\
        1:    1:int a;
garbage in the middle
        2:    2:int b;
";
        let parsed = parse_report("test.c", report, true).unwrap();
        assert_eq!(parsed.fragment.lines.len(), 2);
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].contains("record 2"));
    }

    #[test]
    fn test_duplicate_line_records_sum() {
        // gcov repeats line records for each template instantiation.
        let report = "\
        2:    5:    t.get();
        3:    5:    t.get();
";
        let fragment = parse(report);
        assert_eq!(fragment.line(5).unwrap().hits, LineHits::Count(5));
    }

    #[test]
    fn test_crlf_reports_parse() {
        let report = "        4:    1:int x;\r\nbranch  0 taken 4\r\n";
        let fragment = parse(report);
        assert_eq!(fragment.line(1).unwrap().hits, LineHits::Count(4));
        assert_eq!(fragment.line(1).unwrap().branches.len(), 1);
    }

    #[test]
    fn test_empty_report_yields_empty_fragment() {
        let fragment = parse("");
        assert!(fragment.lines.is_empty());
    }
}
