//! # rcovrlib
//!
//! A gcov coverage aggregation library: parse per-compilation-unit gcov
//! text reports, merge them into one per-file view, and summarize the
//! result as line and branch statistics.
//!
//! ## Overview
//!
//! A gcov run produces one report per object file, so a source file that
//! is compiled into several units (headers, templates, files shared
//! between test binaries) shows up many times with different counts.
//! This library implements the aggregation pipeline:
//!
//! - **Search**: find `.gcda`/`.gcno` data files (or pre-generated
//!   `.gcov` reports) under the project tree
//! - **Invoke**: run the `gcov` tool in a scratch directory per data file
//! - **Parse**: turn each report into a per-file coverage fragment
//! - **Exclude**: honor `GCOVR_EXCL_*`/`LCOV_EXCL_*` source markers
//! - **Merge**: fold fragments into one store, summing execution counts
//! - **Summarize**: per-file and project tallies, threshold checks, and
//!   text, summary, Cobertura XML, and HTML renderers
//!
//! ## Example
//!
//! ```rust
//! use rcovrlib::{file_stats, merge_fragment, parse_report, CoverageStore};
//!
//! let report = "\
//!         -:    0:Source:src/demo.c
//!         4:    1:int main() {
//!     ######:    2:    return fail();
//!         -:    3:}
//! ";
//!
//! let parsed = parse_report("src/demo.c", report, false).unwrap();
//! let mut store = CoverageStore::new();
//! merge_fragment(&mut store, parsed.fragment);
//!
//! let stats = file_stats(&store);
//! assert_eq!(stats[0].lines_total, 2);
//! assert_eq!(stats[0].lines_covered, 1);
//! assert_eq!(stats[0].line_percent(), 50.0);
//! ```

pub mod error;
pub mod exclude;
pub mod filter;
pub mod gcov;
pub mod merge;
pub mod model;
pub mod options;
pub mod parser;
pub mod report;
pub mod run;
pub mod search;
pub mod stats;

pub use error::CovError;
pub use exclude::apply_exclusions;
pub use filter::{compile_filter, normalize_path, PathFilter};
pub use gcov::{source_from_report, GcovOutput, GcovReport, GcovRunner};
pub use merge::merge_fragment;
pub use model::{
    BranchCoverage, BranchKind, CoverageStore, FileCoverage, LineCoverage, LineHits,
};
pub use options::Options;
pub use parser::{parse_report, ParsedReport};
pub use report::html::HtmlFormatter;
pub use report::summary::SummaryFormatter;
pub use report::text::TextFormatter;
pub use report::xml::XmlFormatter;
pub use report::SortMode;
pub use run::{run, RunReport};
pub use search::{find_datafiles, SearchMode};
pub use stats::{
    check_thresholds, file_stats, percent, FileStats, ProjectStats, ThresholdCheck,
};

/// Result type for rcovrlib operations
pub type Result<T> = std::result::Result<T, CovError>;
