//! Source-path filtering with regular expressions.
//!
//! Filters decide which source files and gcov data files enter the run at
//! all. Patterns are compiled once, up front; an invalid pattern is a fatal
//! configuration error. Each pattern is matched against the start of the
//! path string, so `src/` matches anything under `src/` and a leading `.*`
//! opts into matching anywhere.

use std::path::{Component, Path, PathBuf};

use regex::Regex;

use crate::error::CovError;
use crate::Result;

/// Compiled include/exclude filter over path strings.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    /// Patterns to include (if empty, include everything).
    pub include: Vec<Regex>,
    /// Patterns to exclude.
    pub exclude: Vec<Regex>,
}

impl PathFilter {
    /// Create a new empty filter (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an include pattern.
    pub fn include(mut self, pattern: &str) -> Result<Self> {
        self.include.push(compile_filter(pattern)?);
        Ok(self)
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: &str) -> Result<Self> {
        self.exclude.push(compile_filter(pattern)?);
        Ok(self)
    }

    /// Add multiple include patterns.
    pub fn include_many<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        for pattern in patterns {
            self = self.include(pattern.as_ref())?;
        }
        Ok(self)
    }

    /// Add multiple exclude patterns.
    pub fn exclude_many<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        for pattern in patterns {
            self = self.exclude(pattern.as_ref())?;
        }
        Ok(self)
    }

    /// Check if a path passes the filter: it must match at least one
    /// include pattern (or include must be empty) and no exclude pattern.
    pub fn matches(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        for pattern in &self.exclude {
            if pattern.is_match(&path_str) {
                return false;
            }
        }

        if self.include.is_empty() {
            return true;
        }

        self.include.iter().any(|p| p.is_match(&path_str))
    }
}

/// Compile one filter pattern, anchored at the start of the path.
pub fn compile_filter(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})")).map_err(|e| CovError::InvalidFilterPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Compile directory-exclusion patterns. These are matched anywhere in the
/// directory path, so a bare name like `vendor` prunes every `vendor/`
/// subtree.
pub fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p.as_ref()).map_err(|e| CovError::InvalidFilterPattern {
                pattern: p.as_ref().to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Resolve `path` against `base` and normalize it lexically, collapsing
/// `.` and `..` components without touching the filesystem. Used to build
/// the canonical merge key, so the same file reached through different
/// object directories lands under one path.
pub fn normalize_path(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            _ => normalized.push(component.as_os_str()),
        }
    }
    normalized
}
