//! git-otto - automatic AI-assisted commits for coding-agent turns
//!
//! This library drives the auto-commit pipeline: change discovery and
//! filtering, AI commit-subject generation with deterministic fallbacks,
//! single or per-file commit orchestration, and validated pushes.

pub mod cli;
pub mod commands;
pub mod common;
pub mod config;
pub mod filter;
pub mod git;
pub mod llm;
pub mod logger;
pub mod pipeline;
pub mod push;

// Re-export the core surface for easier testing
pub use config::{AiConfig, CommitMode, Config, ProviderApi, ProviderConfig, PushProvider};
pub use pipeline::{AutoCommitPipeline, CommitRecord, RunOutcome, RunResult};
