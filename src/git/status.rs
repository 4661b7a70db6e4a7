use crate::log_debug;
use anyhow::{Context, Result};
use git2::{Repository, Status, StatusOptions};

/// One working-tree change, keyed by repo-relative path.
///
/// Status characters follow the git status model: `A` add, `D` delete,
/// `R` rename, `C` copy, `M` modify, space for "unchanged in that column".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    /// Rename source, when the entry is a rename
    pub original_path: Option<String>,
    pub index_status: char,
    pub worktree_status: char,
}

impl ChangedFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            original_path: None,
            index_status: ' ',
            worktree_status: 'M',
        }
    }

    /// The column that actually carries this entry's change
    pub fn effective_status(&self) -> char {
        if self.index_status == ' ' {
            self.worktree_status
        } else {
            self.index_status
        }
    }

    /// Verb used in deterministic fallback subjects
    pub fn change_verb(&self) -> &'static str {
        match self.effective_status() {
            'A' => "add",
            'D' => "remove",
            'R' => "rename",
            _ => "update",
        }
    }

    /// Final path component, used in per-file fallback subjects
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

fn index_status_char(status: Status) -> char {
    if status.contains(Status::INDEX_RENAMED) {
        'R'
    } else if status.contains(Status::INDEX_NEW) {
        'A'
    } else if status.contains(Status::INDEX_DELETED) {
        'D'
    } else if status.contains(Status::INDEX_MODIFIED) || status.contains(Status::INDEX_TYPECHANGE) {
        'M'
    } else {
        ' '
    }
}

fn worktree_status_char(status: Status) -> char {
    if status.contains(Status::WT_RENAMED) {
        'R'
    } else if status.contains(Status::WT_NEW) {
        'A'
    } else if status.contains(Status::WT_DELETED) {
        'D'
    } else if status.contains(Status::WT_MODIFIED) || status.contains(Status::WT_TYPECHANGE) {
        'M'
    } else {
        ' '
    }
}

/// Collects every pending change (staged, unstaged, and untracked) from the
/// repository. Produced fresh on each pipeline run; never persisted.
pub fn collect_changes(repo: &Repository) -> Result<Vec<ChangedFile>> {
    log_debug!("Collecting working-tree changes");
    let mut changes = Vec::new();

    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .renames_head_to_index(true)
        .renames_index_to_workdir(true);
    let statuses = repo.statuses(Some(&mut opts))?;

    for entry in statuses.iter() {
        let status = entry.status();
        if status.contains(Status::IGNORED) {
            continue;
        }

        let index_status = index_status_char(status);
        let worktree_status = worktree_status_char(status);
        if index_status == ' ' && worktree_status == ' ' {
            continue;
        }

        let path = entry.path().context("Could not get path")?.to_string();

        // Rename source comes from whichever delta carries the rename
        let original_path = entry
            .head_to_index()
            .filter(|_| index_status == 'R')
            .or_else(|| entry.index_to_workdir().filter(|_| worktree_status == 'R'))
            .and_then(|delta| delta.old_file().path())
            .and_then(|p| p.to_str())
            .map(ToString::to_string);

        changes.push(ChangedFile {
            path,
            original_path,
            index_status,
            worktree_status,
        });
    }

    log_debug!("Found {} changed files", changes.len());
    Ok(changes)
}
