//! Cobertura XML report.
//!
//! Element tree per the coverage-04 DTD: `coverage` root with rate and
//! tally attributes, `sources`, and files grouped into `packages` by their
//! root-relative directory. Branch lines carry `condition-coverage` and a
//! `conditions` child. Rates are 0.0 to 1.0 fractions; an empty tally is
//! reported as 1.0, matching the vacuous pass rule for thresholds.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::{FileCoverage, LineCoverage};
use crate::report::relative_to_root;
use crate::run::RunReport;
use crate::stats::FileStats;

const DOCTYPE: &str =
    r#"<!DOCTYPE coverage SYSTEM "http://cobertura.sourceforge.net/xml/coverage-04.dtd">"#;

/// Cobertura XML generator.
#[derive(Debug)]
pub struct XmlFormatter<'a> {
    report: &'a RunReport,
    pretty: bool,
}

impl<'a> XmlFormatter<'a> {
    pub fn new(report: &'a RunReport) -> Self {
        Self {
            report,
            pretty: false,
        }
    }

    /// Indented output instead of the single-line form.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Render the document.
    pub fn generate(&self) -> String {
        let totals = &self.report.totals;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        out.push('\n');
        out.push_str(DOCTYPE);
        out.push('\n');

        let _ = write!(
            out,
            r#"<coverage line-rate="{:.4}" branch-rate="{:.4}" lines-covered="{}" lines-valid="{}" branches-covered="{}" branches-valid="{}" complexity="0.0" timestamp="{}" version="rcovr {}">"#,
            totals.line_percent() / 100.0,
            totals.branch_percent() / 100.0,
            totals.lines_covered,
            totals.lines_total,
            totals.branches_covered,
            totals.branches_total,
            timestamp,
            env!("CARGO_PKG_VERSION"),
        );
        self.newline(&mut out);

        self.element(&mut out, 1, "<sources>");
        self.element(
            &mut out,
            2,
            &format!(
                "<source>{}</source>",
                escape(&self.report.root.display().to_string())
            ),
        );
        self.element(&mut out, 1, "</sources>");

        self.element(&mut out, 1, "<packages>");
        for (package, files) in self.packages() {
            self.write_package(&mut out, &package, &files);
        }
        self.element(&mut out, 1, "</packages>");

        out.push_str("</coverage>\n");
        out
    }

    /// Group per-file stats by root-relative directory, dot-separated.
    fn packages(&self) -> BTreeMap<String, Vec<&FileStats>> {
        let mut packages: BTreeMap<String, Vec<&FileStats>> = BTreeMap::new();
        for file in &self.report.files {
            let rel = relative_to_root(&file.path, &self.report.root);
            let package = Path::new(&rel)
                .parent()
                .map(|p| {
                    p.components()
                        .map(|c| c.as_os_str().to_string_lossy().to_string())
                        .collect::<Vec<_>>()
                        .join(".")
                })
                .unwrap_or_default();
            packages.entry(package).or_default().push(file);
        }
        packages
    }

    fn write_package(&self, out: &mut String, package: &str, files: &[&FileStats]) {
        let (lt, lc, bt, bc) = files.iter().fold((0, 0, 0, 0), |acc, f| {
            (
                acc.0 + f.lines_total,
                acc.1 + f.lines_covered,
                acc.2 + f.branches_total,
                acc.3 + f.branches_covered,
            )
        });

        self.element(
            out,
            2,
            &format!(
                r#"<package name="{}" line-rate="{:.4}" branch-rate="{:.4}" complexity="0.0">"#,
                escape(package),
                rate(lc, lt),
                rate(bc, bt),
            ),
        );
        self.element(out, 3, "<classes>");
        for file in files {
            self.write_class(out, file);
        }
        self.element(out, 3, "</classes>");
        self.element(out, 2, "</package>");
    }

    fn write_class(&self, out: &mut String, file: &FileStats) {
        let rel = relative_to_root(&file.path, &self.report.root);
        let class_name = Path::new(&rel)
            .file_name()
            .map(|n| n.to_string_lossy().replace('.', "_"))
            .unwrap_or_default();

        self.element(
            out,
            4,
            &format!(
                r#"<class name="{}" filename="{}" line-rate="{:.4}" branch-rate="{:.4}" complexity="0.0">"#,
                escape(&class_name),
                escape(&rel),
                file.line_percent() / 100.0,
                file.branch_percent() / 100.0,
            ),
        );
        self.element(out, 5, "<lines>");
        if let Some(coverage) = self.report.store.get(&file.path) {
            self.write_lines(out, coverage);
        }
        self.element(out, 5, "</lines>");
        self.element(out, 4, "</class>");
    }

    fn write_lines(&self, out: &mut String, coverage: &FileCoverage) {
        for (number, line) in &coverage.lines {
            if line.excluded {
                continue;
            }
            let (total, taken) = branch_tally(line);
            if total == 0 {
                self.element(
                    out,
                    6,
                    &format!(
                        r#"<line number="{}" hits="{}" branch="false"/>"#,
                        number,
                        line.hits.count()
                    ),
                );
            } else {
                let condition = 100 * taken / total;
                self.element(
                    out,
                    6,
                    &format!(
                        r#"<line number="{}" hits="{}" branch="true" condition-coverage="{}% ({}/{})">"#,
                        number,
                        line.hits.count(),
                        condition,
                        taken,
                        total
                    ),
                );
                self.element(out, 7, "<conditions>");
                self.element(
                    out,
                    8,
                    &format!(r#"<condition number="0" type="jump" coverage="{condition}%"/>"#),
                );
                self.element(out, 7, "</conditions>");
                self.element(out, 6, "</line>");
            }
        }
    }

    fn element(&self, out: &mut String, depth: usize, text: &str) {
        if self.pretty {
            for _ in 0..depth {
                out.push_str("  ");
            }
        }
        out.push_str(text);
        self.newline(out);
    }

    fn newline(&self, out: &mut String) {
        if self.pretty {
            out.push('\n');
        }
    }
}

/// Counted branches and taken branches on one line.
fn branch_tally(line: &LineCoverage) -> (u64, u64) {
    let mut total = 0;
    let mut taken = 0;
    for branch in &line.branches {
        if branch.excluded {
            continue;
        }
        total += 1;
        if branch.is_taken() {
            taken += 1;
        }
    }
    (total, taken)
}

fn rate(covered: u64, total: u64) -> f64 {
    if total == 0 {
        1.0
    } else {
        covered as f64 / total as f64
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
