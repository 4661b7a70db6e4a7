use crate::config::MAX_PATCH_CHARS;
use crate::git::status::{ChangedFile, collect_changes};
use crate::git::utils::is_binary_diff;
use crate::log_debug;
use anyhow::{Context as AnyhowContext, Result, anyhow};
use git2::{Delta, DiffOptions, Repository, Tree};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Summary of currently staged content, optionally scoped to one path.
/// Ephemeral; computed once per commit unit and fed to the message engine.
#[derive(Debug, Clone, Default)]
pub struct CommitSummary {
    /// Change-type + path listing, one entry per line
    pub name_status: String,
    /// Lines-changed summary in `git diff --stat` style
    pub diff_stat: String,
    /// Unified diff text, truncated to `MAX_PATCH_CHARS`
    pub patch: String,
}

/// Represents a Git repository and provides the operations the auto-commit
/// pipeline needs. The index is treated as exclusively owned for the
/// duration of one run.
#[derive(Debug)]
pub struct GitRepo {
    repo_path: PathBuf,
}

impl GitRepo {
    /// Creates a new `GitRepo` instance from a local path.
    pub fn new(repo_path: &Path) -> Result<Self> {
        Ok(Self {
            repo_path: repo_path.to_path_buf(),
        })
    }

    /// Creates a `GitRepo` for the repository containing `start`, walking
    /// upward the way `git rev-parse --show-toplevel` does.
    pub fn discover(start: &Path) -> Result<Self> {
        let repo = Repository::discover(start)
            .map_err(|e| anyhow!("Not inside a Git repository: {e}"))?;
        let workdir = repo
            .workdir()
            .context("Repository has no working directory")?;
        Self::new(workdir)
    }

    /// Open the repository at the stored path
    pub fn open_repo(&self) -> Result<Repository, git2::Error> {
        Repository::open(&self.repo_path)
    }

    /// Returns the repository path
    pub fn repo_path(&self) -> &PathBuf {
        &self.repo_path
    }

    /// Lists every pending working-tree change.
    pub fn list_changes(&self) -> Result<Vec<ChangedFile>> {
        let repo = self.open_repo()?;
        collect_changes(&repo)
    }

    /// Stages one path, whether it was added, modified, or deleted.
    pub fn stage(&self, path: &str) -> Result<()> {
        log_debug!("Staging path: {}", path);
        let repo = self.open_repo()?;
        let mut index = repo.index()?;

        let rel = Path::new(path);
        if self.repo_path.join(rel).exists() {
            index
                .add_path(rel)
                .with_context(|| format!("Failed to stage '{path}'"))?;
        } else {
            index
                .remove_path(rel)
                .with_context(|| format!("Failed to stage deletion of '{path}'"))?;
        }
        index.write()?;
        Ok(())
    }

    /// Stages a changed file, including the rename source when present.
    pub fn stage_change(&self, change: &ChangedFile) -> Result<()> {
        if let Some(original) = &change.original_path {
            self.stage(original)?;
        }
        self.stage(&change.path)
    }

    /// Whether the index differs from HEAD.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let repo = self.open_repo()?;
        let head_tree = Self::head_tree(&repo)?;
        let diff = repo.diff_tree_to_index(head_tree.as_ref(), None, None)?;
        Ok(diff.deltas().len() > 0)
    }

    /// Builds the staged-diff summary the message engine consumes,
    /// optionally restricted to one path.
    pub fn staged_summary(&self, scope: Option<&str>) -> Result<CommitSummary> {
        let repo = self.open_repo()?;
        let head_tree = Self::head_tree(&repo)?;

        let mut opts = DiffOptions::new();
        if let Some(path) = scope {
            opts.pathspec(path);
        }
        let diff = repo.diff_tree_to_index(head_tree.as_ref(), None, Some(&mut opts))?;

        let mut name_status = String::new();
        diff.foreach(
            &mut |delta, _| {
                let status = match delta.status() {
                    Delta::Added => 'A',
                    Delta::Deleted => 'D',
                    Delta::Renamed => 'R',
                    Delta::Copied => 'C',
                    _ => 'M',
                };
                if let Some(path) = delta.new_file().path().and_then(|p| p.to_str()) {
                    let _ = writeln!(name_status, "{status}\t{path}");
                }
                true
            },
            None,
            None,
            None,
        )?;

        let stats = diff.stats()?;
        let diff_stat = format!(
            "{} file{} changed, {} insertion{}(+), {} deletion{}(-)",
            stats.files_changed(),
            if stats.files_changed() == 1 { "" } else { "s" },
            stats.insertions(),
            if stats.insertions() == 1 { "" } else { "s" },
            stats.deletions(),
            if stats.deletions() == 1 { "" } else { "s" }
        );

        let mut patch = String::new();
        diff.print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                patch.push(line.origin());
            }
            patch.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;

        Ok(CommitSummary {
            name_status,
            diff_stat,
            patch: cap_patch(patch),
        })
    }

    /// Commits the index and returns the short hash. Handles the unborn-HEAD
    /// case by creating a parentless commit.
    pub fn commit(&self, message: &str) -> Result<String> {
        let repo = self.open_repo()?;
        let signature = repo.signature()?;
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<_> = parent.iter().collect();

        let commit_oid = repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;

        let short_hash = commit_oid.to_string()[..7].to_string();
        log_debug!("Created commit {} ({})", short_hash, message);
        Ok(short_hash)
    }

    /// Retrieves the current branch name.
    pub fn get_current_branch(&self) -> Result<String> {
        let repo = self.open_repo()?;
        let head = repo.head()?;
        let branch_name = head.shorthand().unwrap_or("HEAD detached").to_string();
        log_debug!("Current branch: {}", branch_name);
        Ok(branch_name)
    }

    /// Resolves the URL of the named remote.
    pub fn remote_url(&self, remote: &str) -> Result<String> {
        let repo = self.open_repo()?;
        let remote = repo
            .find_remote(remote)
            .with_context(|| format!("Remote '{remote}' not found"))?;
        remote
            .url()
            .map(ToString::to_string)
            .context("Remote URL is not valid UTF-8")
    }

    fn head_tree(repo: &Repository) -> Result<Option<Tree<'_>>> {
        match repo.head() {
            Ok(head) => Ok(Some(head.peel_to_tree()?)),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Caps the patch text at `MAX_PATCH_CHARS` characters (not bytes) and
/// replaces binary diffs with a placeholder.
fn cap_patch(mut patch: String) -> String {
    if is_binary_diff(&patch) {
        return "[Binary file changed]".to_string();
    }

    if patch.chars().count() > MAX_PATCH_CHARS {
        let end = patch
            .char_indices()
            .nth(MAX_PATCH_CHARS)
            .map_or(patch.len(), |(i, _)| i);
        patch.truncate(end);
        patch.push_str("\n[patch truncated]");
    }
    patch
}
