//! Report renderers.
//!
//! Each renderer borrows a finished [`RunReport`](crate::run::RunReport)
//! and generates its output as a `String`; writing to stdout or a file is
//! the caller's business. Formatters are configured with builder methods,
//! one per presentation knob.

pub mod html;
pub mod summary;
pub mod text;
pub mod xml;

use std::path::Path;

use crate::stats::FileStats;

/// Row order for per-file listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Canonical path order.
    #[default]
    Path,
    /// Fewest uncovered lines first.
    Uncovered,
    /// Highest line coverage first; never-run files last, smallest first.
    Percent,
}

/// Order per-file stats for display. Input arrives in path order, and the
/// sort is stable, so ties keep that order.
pub(crate) fn sorted_stats<'a>(files: &'a [FileStats], mode: SortMode) -> Vec<&'a FileStats> {
    let mut rows: Vec<&FileStats> = files.iter().collect();
    match mode {
        SortMode::Path => {}
        SortMode::Uncovered => {
            rows.sort_by_key(|f| f.lines_uncovered());
        }
        SortMode::Percent => {
            rows.sort_by(|a, b| percent_sort_key(a).total_cmp(&percent_sort_key(b)));
        }
    }
    rows
}

/// Sort key reproducing the classic percent ordering: covered files by
/// descending coverage ratio, then never-run files by ascending size.
fn percent_sort_key(f: &FileStats) -> f64 {
    if f.lines_covered > 0 {
        -(f.lines_covered as f64) / (f.lines_total as f64)
    } else if f.lines_total > 0 {
        f.lines_total as f64
    } else {
        1e6
    }
}

/// Display form of `path`: relative to `root` when it lives under it.
pub(crate) fn relative_to_root(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| path.to_string_lossy().to_string())
}

/// Truncate a label to `max_len` characters, keeping the tail with a ".."
/// prefix. The cut always lands on a character boundary.
pub(crate) fn truncate_label(label: &str, max_len: usize) -> String {
    let total = label.chars().count();
    if total <= max_len {
        return label.to_string();
    }
    let skip = total - max_len.saturating_sub(2);
    let start = label
        .char_indices()
        .nth(skip)
        .map_or(label.len(), |(i, _)| i);
    format!("..{}", &label[start..])
}
