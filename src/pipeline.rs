//! The auto-commit pipeline state machine.
//!
//! Drives change discovery, filtering, staging, message generation, and
//! committing for one run, then optionally delegates to the push validator.
//! Git plumbing failures are fatal; AI failures degrade to deterministic
//! fallback subjects and surface once as a warning on the result.

use crate::config::{CommitMode, Config};
use crate::filter::{Pattern, compile_patterns, filter_changes};
use crate::git::{ChangedFile, GitRepo};
use crate::llm::{self, TokenUsage};
use crate::push::validate_and_push;
use crate::{log_debug, log_warn};
use anyhow::{Result, anyhow};

/// One successful commit made by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub hash: String,
    pub message: String,
    pub files: Vec<String>,
}

/// Terminal outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing was committed; the reason says why
    Skipped(String),
    /// One or more commits were made
    Committed(Vec<CommitRecord>),
}

/// Result of one pipeline run; never mutated after construction.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub outcome: RunOutcome,
    pub pushed: bool,
    pub usage: TokenUsage,
    /// First warning encountered across all commit units
    pub warning: Option<String>,
}

impl RunResult {
    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            outcome: RunOutcome::Skipped(reason.into()),
            pushed: false,
            usage: TokenUsage::default(),
            warning: None,
        }
    }

    /// Commit records, empty when the run was skipped
    pub fn records(&self) -> &[CommitRecord] {
        match &self.outcome {
            RunOutcome::Skipped(_) => &[],
            RunOutcome::Committed(records) => records,
        }
    }
}

/// Orchestrates one auto-commit run against a repository.
///
/// The index is treated as exclusively owned for the duration of the run;
/// concurrent runs against the same working tree are out of scope.
pub struct AutoCommitPipeline {
    config: Config,
    repo: GitRepo,
}

impl AutoCommitPipeline {
    /// Validates the configuration and builds the pipeline.
    pub fn new(config: Config, repo: GitRepo) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, repo })
    }

    /// Runs the pipeline to completion.
    pub async fn run(&self) -> Result<RunResult> {
        if !self.config.enabled {
            log_debug!("Auto-commit disabled; skipping");
            return Ok(RunResult::skipped("disabled"));
        }

        let include = compile_patterns(&self.config.include)?;
        let exclude = compile_patterns(&self.config.exclude)?;
        let changes = self.repo.list_changes()?;
        let filtered = self.filter(changes, &include, &exclude);

        if filtered.is_empty() {
            log_debug!("No changes left after filtering; skipping");
            return Ok(RunResult::skipped("no changes"));
        }

        let result = match self.config.mode {
            CommitMode::Single => self.run_single(&filtered).await?,
            CommitMode::PerFile => self.run_per_file(&filtered).await?,
        };

        if self.config.push.enabled && !result.records().is_empty() {
            let branch = self.repo.get_current_branch()?;
            validate_and_push(&self.repo, &self.config.push, &branch)?;
            return Ok(RunResult {
                pushed: true,
                ..result
            });
        }

        Ok(result)
    }

    fn filter(
        &self,
        changes: Vec<ChangedFile>,
        include: &[Pattern],
        exclude: &[Pattern],
    ) -> Vec<ChangedFile> {
        filter_changes(changes, include, exclude)
    }

    /// Stage everything, commit once.
    async fn run_single(&self, files: &[ChangedFile]) -> Result<RunResult> {
        for file in files {
            self.repo.stage_change(file)?;
        }
        // Some filtered paths may have been staging no-ops
        if !self.repo.has_staged_changes()? {
            return Ok(RunResult::skipped("no staged changes"));
        }

        let fallback = format!(
            "{}: update {} file{}",
            self.fallback_type(),
            files.len(),
            if files.len() == 1 { "" } else { "s" }
        );

        let summary = self.repo.staged_summary(None)?;
        let (message, usage, warning) = self.resolve_message(&summary, fallback).await;

        let hash = self.repo.commit(&message)?;
        let record = CommitRecord {
            hash,
            message,
            files: files.iter().map(|f| f.path.clone()).collect(),
        };

        Ok(RunResult {
            outcome: RunOutcome::Committed(vec![record]),
            pushed: false,
            usage,
            warning,
        })
    }

    /// Stage and commit each file on its own, in sorted path order.
    ///
    /// Requires a clean index at entry so every commit captures exactly one
    /// file's change. Commits already made are never rolled back.
    async fn run_per_file(&self, files: &[ChangedFile]) -> Result<RunResult> {
        if self.repo.has_staged_changes()? {
            return Err(anyhow!(
                "Staging area is not clean; per-file mode requires an empty index at entry"
            ));
        }

        let mut records = Vec::new();
        let mut usage = TokenUsage::default();
        let mut warning: Option<String> = None;

        for file in files {
            self.repo.stage_change(file)?;
            if !self.repo.has_staged_changes()? {
                log_debug!("Staging '{}' produced no diff; skipping", file.path);
                continue;
            }

            let fallback = format!(
                "{}: {} {}",
                self.fallback_type(),
                file.change_verb(),
                file.basename()
            );

            let summary = self.repo.staged_summary(Some(&file.path))?;
            let (message, unit_usage, unit_warning) =
                self.resolve_message(&summary, fallback).await;
            usage.accumulate(unit_usage);
            if warning.is_none() {
                warning = unit_warning;
            }

            let hash = self.repo.commit(&message)?;
            records.push(CommitRecord {
                hash,
                message,
                files: vec![file.path.clone()],
            });
        }

        if records.is_empty() {
            return Ok(RunResult::skipped("no staged changes"));
        }

        Ok(RunResult {
            outcome: RunOutcome::Committed(records),
            pushed: false,
            usage,
            warning,
        })
    }

    /// Asks the message engine for a subject and falls back deterministically.
    async fn resolve_message(
        &self,
        summary: &crate::git::CommitSummary,
        fallback: String,
    ) -> (String, TokenUsage, Option<String>) {
        let max_length = self.config.max_message_length;

        if !self.config.ai.enabled {
            return (clamp_subject(fallback, max_length), TokenUsage::default(), None);
        }

        let generated = llm::generate(&self.config.ai, summary, max_length).await;
        let mut usage = TokenUsage::default();
        if let Some(u) = generated.usage {
            usage.accumulate(u);
        }
        if let Some(w) = &generated.warning {
            log_warn!("AI message generation degraded: {}", w);
        }

        let message = match generated.message {
            Some(m) if !m.is_empty() && m.chars().count() <= max_length => m,
            _ => clamp_subject(fallback, max_length),
        };

        (message, usage, generated.warning)
    }

    /// One canonicalization rule, used by both commit modes: keyword scan of
    /// the configured fallback prefix into a three-way bucket.
    fn fallback_type(&self) -> &'static str {
        let prefix = self.config.fallback_prefix.to_lowercase();
        if prefix.contains("feat") || prefix.contains("add") {
            "feat"
        } else if prefix.contains("fix") || prefix.contains("bug") {
            "fix"
        } else {
            "chore"
        }
    }
}

/// Truncates a fallback subject that itself exceeds the limit.
fn clamp_subject(subject: String, max_length: usize) -> String {
    if subject.chars().count() <= max_length {
        subject
    } else {
        subject.chars().take(max_length).collect()
    }
}
