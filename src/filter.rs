//! Include/exclude narrowing of the changed-file set.
//!
//! Pure over its inputs: no repository access, deterministic output order.

use crate::git::ChangedFile;
use crate::log_debug;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;

/// A compiled glob pattern.
///
/// `*` matches any run of characters excluding `/`, `**` matches across
/// separators, `?` matches a single non-separator character, everything else
/// is literal.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    pub fn new(glob: &str) -> Result<Self> {
        let regex = Regex::new(&glob_to_regex(glob))
            .with_context(|| format!("Invalid glob pattern '{glob}'"))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Compiles a list of glob strings, surfacing the first bad pattern.
pub fn compile_patterns(globs: &[String]) -> Result<Vec<Pattern>> {
    globs.iter().map(|g| Pattern::new(g)).collect()
}

fn glob_to_regex(glob: &str) -> String {
    let mut regex = String::with_capacity(glob.len() + 8);
    regex.push('^');

    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    regex.push_str(".*");
                } else {
                    regex.push_str("[^/]*");
                }
            }
            '?' => regex.push_str("[^/]"),
            c if "\\.+()[]{}^$|".contains(c) => {
                regex.push('\\');
                regex.push(c);
            }
            c => regex.push(c),
        }
    }

    regex.push('$');
    regex
}

/// Narrows `changes` by include/exclude rules.
///
/// A path is kept iff (include is empty OR it matches at least one include
/// pattern) AND NOT (exclude is non-empty AND it matches at least one exclude
/// pattern). The result is deduplicated by path (first occurrence wins) and
/// sorted lexicographically; per-file commit order depends on this.
pub fn filter_changes(
    changes: Vec<ChangedFile>,
    include: &[Pattern],
    exclude: &[Pattern],
) -> Vec<ChangedFile> {
    let mut seen = HashSet::new();
    let mut kept: Vec<ChangedFile> = changes
        .into_iter()
        .filter(|change| {
            let included =
                include.is_empty() || include.iter().any(|p| p.matches(&change.path));
            let excluded =
                !exclude.is_empty() && exclude.iter().any(|p| p.matches(&change.path));
            included && !excluded
        })
        .filter(|change| seen.insert(change.path.clone()))
        .collect();

    kept.sort_by(|a, b| a.path.cmp(&b.path));
    log_debug!("Filter kept {} files", kept.len());
    kept
}
