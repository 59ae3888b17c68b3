//! Self-contained HTML report.
//!
//! One index page with the project summary and a per-file table; in
//! details mode, one annotated-source page per file, written next to the
//! index and linked from it. Styling is embedded, no external assets.
//! Banding: green at 90% and up, yellow at 75%, red below.

use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::model::FileCoverage;
use crate::report::{relative_to_root, sorted_stats, SortMode};
use crate::run::RunReport;
use crate::stats::FileStats;
use crate::Result;

const STYLE: &str = "\
body { font-family: sans-serif; font-size: 14px; color: #222; }
h1 { font-size: 20px; }
table { border-collapse: collapse; margin-top: 1em; }
th, td { border: 1px solid #bbb; padding: 3px 10px; text-align: left; }
td.count { text-align: right; }
td.coverage-high { background-color: #a7fc9d; }
td.coverage-medium { background-color: #ffe45e; }
td.coverage-low { background-color: #ff8b8b; }
tr.covered { background-color: #dcf5d0; }
tr.uncovered { background-color: #ffd9d9; }
tr.excluded { background-color: #e8e8e8; color: #777; }
pre { margin: 0; font-size: 13px; }
";

/// HTML report generator.
#[derive(Debug)]
pub struct HtmlFormatter<'a> {
    report: &'a RunReport,
    details: bool,
    encoding: String,
    relative_anchors: bool,
    output: PathBuf,
    sort: SortMode,
}

impl<'a> HtmlFormatter<'a> {
    pub fn new(report: &'a RunReport) -> Self {
        Self {
            report,
            details: false,
            encoding: "UTF-8".to_string(),
            relative_anchors: true,
            output: PathBuf::from("coverage.html"),
            sort: SortMode::default(),
        }
    }

    /// Emit one annotated-source page per file, linked from the index.
    pub fn details(mut self, details: bool) -> Self {
        self.details = details;
        self
    }

    /// Charset declared in the page header.
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Link detail pages by bare file name rather than full path.
    pub fn relative_anchors(mut self, relative: bool) -> Self {
        self.relative_anchors = relative;
        self
    }

    /// Where the index will be written; detail page names derive from it.
    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    /// Row ordering.
    pub fn sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    /// Render the index page.
    pub fn generate(&self) -> String {
        let totals = &self.report.totals;
        let mut body = String::new();

        let _ = writeln!(body, "<h1>GCC Code Coverage Report</h1>");
        body.push_str("<table>\n");
        let _ = writeln!(
            body,
            "<tr><th>Directory:</th><td>{}</td></tr>",
            escape(&self.report.root.display().to_string())
        );
        let _ = writeln!(
            body,
            "<tr><th>Date:</th><td>{}</td></tr>",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let _ = writeln!(
            body,
            r#"<tr><th>Lines:</th><td class="{}">{} of {} ({:.1}%)</td></tr>"#,
            coverage_class(totals.line_percent()),
            totals.lines_covered,
            totals.lines_total,
            totals.line_percent()
        );
        let _ = writeln!(
            body,
            r#"<tr><th>Branches:</th><td class="{}">{} of {} ({:.1}%)</td></tr>"#,
            coverage_class(totals.branch_percent()),
            totals.branches_covered,
            totals.branches_total,
            totals.branch_percent()
        );
        body.push_str("</table>\n");

        body.push_str("<table>\n");
        body.push_str("<tr><th>File</th><th>Lines</th><th>Exec</th><th>Coverage</th></tr>\n");
        for file in sorted_stats(&self.report.files, self.sort) {
            let rel = relative_to_root(&file.path, &self.report.root);
            let label = if self.details {
                format!(
                    r#"<a href="{}">{}</a>"#,
                    self.href(&rel),
                    escape(&rel)
                )
            } else {
                escape(&rel)
            };
            let _ = writeln!(
                body,
                r#"<tr><td>{}</td><td class="count">{}</td><td class="count">{}</td><td class="{}">{:.1}%</td></tr>"#,
                label,
                file.lines_total,
                file.lines_covered,
                coverage_class(file.line_percent()),
                file.line_percent()
            );
        }
        body.push_str("</table>\n");

        self.page("Coverage report", &body)
    }

    /// Render one page per file whose source can still be read.
    pub fn detail_pages(&self) -> Vec<(String, String)> {
        let mut pages = Vec::new();
        for file in sorted_stats(&self.report.files, self.sort) {
            let Some(coverage) = self.report.store.get(&file.path) else {
                continue;
            };
            let rel = relative_to_root(&file.path, &self.report.root);
            match fs::read_to_string(&file.path) {
                Ok(text) => {
                    pages.push((self.page_name(&rel), self.detail_page(file, coverage, &text)));
                }
                Err(e) => {
                    tracing::warn!(source = %file.path.display(), error = %e, "no detail page");
                }
            }
        }
        pages
    }

    /// Write the index, and in details mode the per-file pages beside it.
    pub fn save(&self) -> Result<()> {
        fs::write(&self.output, self.generate())?;
        if self.details {
            let dir = self.output.parent().unwrap_or(Path::new("."));
            for (name, page) in self.detail_pages() {
                fs::write(dir.join(name), page)?;
            }
        }
        Ok(())
    }

    fn detail_page(&self, file: &FileStats, coverage: &FileCoverage, source: &str) -> String {
        let rel = relative_to_root(&file.path, &self.report.root);
        let mut body = String::new();

        let _ = writeln!(body, "<h1>{}</h1>", escape(&rel));
        body.push_str("<table>\n");
        let _ = writeln!(
            body,
            r#"<tr><th>Lines:</th><td class="{}">{} of {} ({:.1}%)</td></tr>"#,
            coverage_class(file.line_percent()),
            file.lines_covered,
            file.lines_total,
            file.line_percent()
        );
        let _ = writeln!(
            body,
            r#"<tr><th>Branches:</th><td class="{}">{} of {} ({:.1}%)</td></tr>"#,
            coverage_class(file.branch_percent()),
            file.branches_covered,
            file.branches_total,
            file.branch_percent()
        );
        body.push_str("</table>\n");

        body.push_str("<table>\n");
        body.push_str("<tr><th>Line</th><th>Hits</th><th>Source</th></tr>\n");
        for (number, text) in source.lines().enumerate() {
            let number = number as u32 + 1;
            let (class, hits) = match coverage.line(number) {
                Some(line) if line.excluded => ("excluded", line.hits.count().to_string()),
                Some(line) if line.hits.is_covered() => ("covered", line.hits.count().to_string()),
                Some(_) => ("uncovered", "0".to_string()),
                None => ("", "-".to_string()),
            };
            let _ = writeln!(
                body,
                r#"<tr class="{}"><td class="count">{}</td><td class="count">{}</td><td><pre>{}</pre></td></tr>"#,
                class,
                number,
                hits,
                escape(text)
            );
        }
        body.push_str("</table>\n");

        self.page(&rel, &body)
    }

    fn page(&self, title: &str, body: &str) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n\
             <meta http-equiv=\"Content-Type\" content=\"text/html; charset={}\"/>\n\
             <title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
            self.encoding,
            escape(title),
            STYLE,
            body
        )
    }

    /// Detail page file name: index stem plus the mangled relative path.
    fn page_name(&self, rel: &str) -> String {
        let stem = self
            .output
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "coverage".to_string());
        let mangled: String = rel
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        format!("{stem}.{mangled}.html")
    }

    fn href(&self, rel: &str) -> String {
        let name = self.page_name(rel);
        if self.relative_anchors {
            name
        } else {
            match self.output.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.join(name).display().to_string(),
                _ => name,
            }
        }
    }
}

fn coverage_class(percent: f64) -> &'static str {
    if percent >= 90.0 {
        "coverage-high"
    } else if percent >= 75.0 {
        "coverage-medium"
    } else {
        "coverage-low"
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_fragment;
    use crate::model::{CoverageStore, LineCoverage, LineHits};
    use crate::stats::{file_stats, ProjectStats};
    use std::path::PathBuf;

    fn report_for(store: CoverageStore, root: PathBuf) -> RunReport {
        let files = file_stats(&store);
        let totals = ProjectStats::from_files(&files);
        RunReport {
            store,
            files,
            totals,
            root,
            warnings: Vec::new(),
        }
    }

    fn sample_store(root: &Path) -> CoverageStore {
        let mut fragment = FileCoverage::new(root.join("src/alpha.c"));
        fragment.insert_line(1, LineCoverage::new(LineHits::Count(3)));
        fragment.insert_line(2, LineCoverage::new(LineHits::NotExecuted));
        let mut excluded = LineCoverage::new(LineHits::NotExecuted);
        excluded.excluded = true;
        fragment.insert_line(3, excluded);

        let mut store = CoverageStore::new();
        merge_fragment(&mut store, fragment);
        store
    }

    #[test]
    fn test_index_page_shape() {
        let root = PathBuf::from("/proj");
        let report = report_for(sample_store(&root), root);
        let out = HtmlFormatter::new(&report).generate();

        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("charset=UTF-8"));
        assert!(out.contains("GCC Code Coverage Report"));
        assert!(out.contains("<td>/proj</td>"));
        // 1 of 2 counted lines, red band.
        assert!(out.contains(r#"class="coverage-low">1 of 2 (50.0%)"#));
        assert!(out.contains("src/alpha.c"));
        assert!(!out.contains("<a href"));
    }

    #[test]
    fn test_details_links_and_encoding() {
        let root = PathBuf::from("/proj");
        let report = report_for(sample_store(&root), root);
        let out = HtmlFormatter::new(&report)
            .details(true)
            .encoding("ISO-8859-1")
            .output("out/cov.html")
            .generate();

        assert!(out.contains("charset=ISO-8859-1"));
        assert!(out.contains(r#"<a href="cov.src_alpha_c.html">src/alpha.c</a>"#));
    }

    #[test]
    fn test_absolute_anchors_use_output_directory() {
        let root = PathBuf::from("/proj");
        let report = report_for(sample_store(&root), root);
        let out = HtmlFormatter::new(&report)
            .details(true)
            .relative_anchors(false)
            .output("/srv/www/cov.html")
            .generate();

        assert!(out.contains(r#"href="/srv/www/cov.src_alpha_c.html""#));
    }

    #[test]
    fn test_detail_page_row_classes() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().to_path_buf();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(
            root.join("src/alpha.c"),
            "int a() {\nint uncalled() {\nint skipped() {\nplain text\n",
        )
        .unwrap();

        let report = report_for(sample_store(&root), root);
        let pages = HtmlFormatter::new(&report).details(true).detail_pages();
        assert_eq!(pages.len(), 1);
        let (name, page) = &pages[0];
        assert_eq!(name, "coverage.src_alpha_c.html");

        assert!(page.contains(r#"<tr class="covered"><td class="count">1</td><td class="count">3</td>"#));
        assert!(page.contains(r#"<tr class="uncovered"><td class="count">2</td><td class="count">0</td>"#));
        assert!(page.contains(r#"<tr class="excluded"><td class="count">3</td>"#));
        assert!(page.contains(r#"<tr class=""><td class="count">4</td><td class="count">-</td>"#));
    }

    #[test]
    fn test_unreadable_source_is_skipped() {
        let root = PathBuf::from("/nonexistent-root");
        let report = report_for(sample_store(&root), root);
        let pages = HtmlFormatter::new(&report).details(true).detail_pages();
        assert!(pages.is_empty());
    }

    #[test]
    fn test_save_writes_index_and_details() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().to_path_buf();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/alpha.c"), "a\nb\nc\n").unwrap();

        let out_path = temp.path().join("cov.html");
        let report = report_for(sample_store(&root), root);
        HtmlFormatter::new(&report)
            .details(true)
            .output(&out_path)
            .save()
            .unwrap();

        assert!(out_path.exists());
        assert!(temp.path().join("cov.src_alpha_c.html").exists());
    }
}
