//! Core data structures for coverage aggregation.
//!
//! This module provides the types that carry coverage knowledge through the
//! pipeline:
//!
//! - **LineHits**: execution state of one line (a real count, or "not executed")
//! - **BranchCoverage**: one conditional-branch outcome at a line
//! - **LineCoverage**: per-line state (hits, exclusion flag, branches)
//! - **FileCoverage**: everything known about one source file
//! - **CoverageStore**: the project-wide map from canonical path to file record
//!
//! A `FileCoverage` produced from a single gcov report is called a *fragment*;
//! fragments for the same source path are folded together by the merge step.
//! Lines the instrumentation reports as carrying no code are simply absent
//! from `FileCoverage.lines` and never enter any statistic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Execution state of one instrumented source line.
///
/// gcov distinguishes a line that ran zero times (count `0`) from a line for
/// which it has no execution data at all (`#####`). Keeping the latter as its
/// own variant instead of a sentinel count prevents accidental arithmetic on
/// a non-count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineHits {
    /// Instrumented, but never executed (`#####` marker).
    NotExecuted,
    /// Exact observed hit count. `Count(0)` means instrumented and run
    /// through zero times; it is distinct from `NotExecuted`.
    Count(u64),
}

impl LineHits {
    /// Numeric view used for summation; `NotExecuted` reads as 0.
    pub fn count(&self) -> u64 {
        match self {
            LineHits::NotExecuted => 0,
            LineHits::Count(n) => *n,
        }
    }

    /// True when the line executed at least once.
    pub fn is_covered(&self) -> bool {
        self.count() > 0
    }

    /// Combine two observations of the same line.
    ///
    /// Counts sum, with `NotExecuted` contributing 0. Only when both sides
    /// are `NotExecuted` does the result stay `NotExecuted`; a numeric side
    /// always wins.
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (LineHits::NotExecuted, LineHits::NotExecuted) => LineHits::NotExecuted,
            (a, b) => LineHits::Count(a.count() + b.count()),
        }
    }
}

/// Classification gcov attaches to a branch edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchKind {
    /// Ordinary conditional edge.
    Normal,
    /// Fallthrough edge of a condition (`(fallthrough)` suffix).
    Fallthrough,
    /// Exception-cleanup edge (`(throw)` suffix); compiler-synthesized.
    Throw,
}

/// One conditional-branch outcome observed at a source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchCoverage {
    /// Position among the branches declared for the line. Stable ordinal,
    /// not content-addressed; the merge key for branches.
    pub index: u32,
    /// Execution count for this branch (0 if never taken).
    pub taken: u64,
    /// True if the branch is omitted from totals.
    pub excluded: bool,
    /// Edge classification as reported by the tool.
    pub kind: BranchKind,
}

impl BranchCoverage {
    /// Create a new branch record, not excluded.
    pub fn new(index: u32, taken: u64, kind: BranchKind) -> Self {
        Self {
            index,
            taken,
            excluded: false,
            kind,
        }
    }

    /// True when the branch executed at least once.
    pub fn is_taken(&self) -> bool {
        self.taken > 0
    }

    /// Fold another observation of the same branch index into this one.
    /// The first observed `kind` is kept.
    pub fn merge(&mut self, other: &BranchCoverage) {
        self.taken += other.taken;
        self.excluded |= other.excluded;
    }
}

/// Observed execution state of one source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCoverage {
    /// Execution state.
    pub hits: LineHits,
    /// True if the line is omitted from totals regardless of hits. Sticky:
    /// once set, no merge clears it.
    pub excluded: bool,
    /// Branches declared on this line, ordered by `index`.
    pub branches: Vec<BranchCoverage>,
}

impl LineCoverage {
    /// Create a line record with the given hits, not excluded, no branches.
    pub fn new(hits: LineHits) -> Self {
        Self {
            hits,
            excluded: false,
            branches: Vec::new(),
        }
    }

    /// Create a line record the instrumentation tool itself excluded
    /// (`=====` marker): excluded, with no execution data.
    pub fn tool_excluded() -> Self {
        Self {
            hits: LineHits::NotExecuted,
            excluded: true,
            branches: Vec::new(),
        }
    }

    /// Attach a branch observation, merging with an existing record of the
    /// same index and keeping `branches` ordered.
    pub fn add_branch(&mut self, branch: BranchCoverage) {
        match self
            .branches
            .binary_search_by_key(&branch.index, |b| b.index)
        {
            Ok(i) => self.branches[i].merge(&branch),
            Err(i) => self.branches.insert(i, branch),
        }
    }

    /// Fold another observation of the same source line into this one:
    /// hits sum (see [`LineHits::merge`]), exclusion ORs, branches merge
    /// positionally by index with one-sided branches carried through.
    pub fn merge(&mut self, other: LineCoverage) {
        self.hits = self.hits.merge(other.hits);
        self.excluded |= other.excluded;
        for branch in other.branches {
            self.add_branch(branch);
        }
    }
}

/// Accumulated coverage knowledge about one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCoverage {
    /// Canonical, normalized source path.
    pub path: PathBuf,
    /// Line number (1-based) to line state. A line absent from the map is
    /// not instrumented and excluded from all statistics.
    pub lines: BTreeMap<u32, LineCoverage>,
}

impl FileCoverage {
    /// Create an empty record for a source path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines: BTreeMap::new(),
        }
    }

    /// Record one line observation, folding into an existing record when the
    /// same line number was already seen (gcov repeats line records for
    /// template instantiations).
    pub fn insert_line(&mut self, number: u32, line: LineCoverage) {
        match self.lines.entry(number) {
            std::collections::btree_map::Entry::Vacant(e) => {
                e.insert(line);
            }
            std::collections::btree_map::Entry::Occupied(mut e) => {
                e.get_mut().merge(line);
            }
        }
    }

    /// Look up one line's state.
    pub fn line(&self, number: u32) -> Option<&LineCoverage> {
        self.lines.get(&number)
    }
}

/// Project-wide mapping from canonical source path to merged coverage.
///
/// Created empty at the start of a run, filled by merging fragments, and
/// queried read-only by the statistics engine and the report renderers.
/// Iteration is sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageStore {
    pub(crate) files: BTreeMap<PathBuf, FileCoverage>,
}

impl CoverageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of source files tracked.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if no file has been merged yet.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Look up one file's merged record.
    pub fn get(&self, path: &Path) -> Option<&FileCoverage> {
        self.files.get(path)
    }

    /// Iterate merged records in path order.
    pub fn iter(&self) -> impl Iterator<Item = &FileCoverage> {
        self.files.values()
    }

    /// Tracked paths, in order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }
}
