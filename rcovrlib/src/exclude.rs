//! Inline exclusion markers and configured branch exclusions.
//!
//! Exclusions come from two places:
//!
//! - **Inline markers** in the source file itself: `GCOVR_EXCL_LINE` (or the
//!   lcov spelling `LCOV_EXCL_LINE`) excludes its own line, and an
//!   `_EXCL_START` / `_EXCL_STOP` pair excludes the whole range between
//!   them, both ends inclusive. The marker families mix freely. An
//!   unterminated start excludes through end of file.
//! - **Unreachable-branch exclusion** (configuration flag): exception
//!   cleanup edges (`(throw)`) and branches that gcc attributes to lines
//!   with no executable outcome of their own, such as a closing brace, are
//!   compiler artifacts rather than decisions in the source.
//!
//! Markers are looked up in the original source text, not in the report's
//! echo of it, so stale reports cannot resurrect deleted markers. Exclusion
//! only ever sets flags; nothing here clears one.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{BranchKind, FileCoverage};

static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:GCOVR|LCOV)_EXCL_(LINE|START|STOP)").unwrap());

static BLOCK_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\*.*?\*/").unwrap());

/// Annotate a fragment with every exclusion derivable from its source text.
///
/// `source` is the content of the file the fragment describes. With
/// `exclude_unreachable_branches`, throw edges and branches on trivial
/// lines are excluded as well.
pub fn apply_exclusions(
    fragment: &mut FileCoverage,
    source: &str,
    exclude_unreachable_branches: bool,
) {
    let mut in_range = false;

    for (idx, text) in source.lines().enumerate() {
        let number = (idx + 1) as u32;
        let mut exclude = in_range;

        for cap in MARKER_RE.captures_iter(text) {
            match &cap[1] {
                "LINE" => exclude = true,
                "START" => {
                    exclude = true;
                    in_range = true;
                }
                "STOP" => {
                    exclude = true;
                    in_range = false;
                }
                _ => unreachable!(),
            }
        }

        if let Some(line) = fragment.lines.get_mut(&number) {
            if exclude {
                line.excluded = true;
            }
            if exclude_unreachable_branches && is_trivial_line(text) {
                for branch in &mut line.branches {
                    branch.excluded = true;
                }
            }
        }
    }

    if exclude_unreachable_branches {
        for line in fragment.lines.values_mut() {
            for branch in &mut line.branches {
                if branch.kind == BranchKind::Throw {
                    branch.excluded = true;
                }
            }
        }
    }
}

/// True when the line carries no executable outcome of its own: only
/// braces, semicolons and whitespace once comments are stripped.
fn is_trivial_line(text: &str) -> bool {
    let without_blocks = BLOCK_COMMENT_RE.replace_all(text, "");
    let mut code: &str = &without_blocks;
    if let Some(i) = code.find("/*") {
        code = &code[..i];
    }
    if let Some(i) = code.find("//") {
        code = &code[..i];
    }
    code.chars()
        .all(|c| c.is_whitespace() || matches!(c, '{' | '}' | ';'))
}
