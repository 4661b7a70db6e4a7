use crate::config::{CommitMode, Config, PushProvider};
use anyhow::Result;
use clap::Args;

#[derive(Args, Clone, Default, Debug)]
pub struct CommonParams {
    /// Override the commit mode
    #[arg(long, help = "Commit mode: single or per-file")]
    pub mode: Option<String>,

    /// Commit every filtered file separately
    #[arg(long, help = "Commit every filtered file separately", conflicts_with = "mode")]
    pub per_file: bool,

    /// Disable AI message generation for this run
    #[arg(long, help = "Disable AI message generation for this run")]
    pub no_ai: bool,

    /// Push after committing
    #[arg(long, help = "Push after committing")]
    pub push: bool,

    /// Override the push provider used for remote validation
    #[arg(long, help = "Push provider: github, gitlab, or generic")]
    pub push_provider: Option<String>,

    /// Override the fallback subject prefix
    #[arg(long, help = "Override the fallback subject prefix")]
    pub fallback_prefix: Option<String>,

    /// Additional exclude glob patterns
    #[arg(long = "exclude", help = "Additional exclude glob patterns")]
    pub exclude: Vec<String>,
}

impl CommonParams {
    /// Layer command-line overrides onto a loaded configuration.
    pub fn apply_to_config(&self, config: &mut Config) -> Result<()> {
        if let Some(mode) = &self.mode {
            config.mode = mode.parse()?;
        }
        if self.per_file {
            config.mode = CommitMode::PerFile;
        }
        if self.no_ai {
            config.ai.enabled = false;
        }
        if self.push {
            config.push.enabled = true;
        }
        if let Some(provider) = &self.push_provider {
            config.push.provider = provider.parse::<PushProvider>()?;
        }
        if let Some(prefix) = &self.fallback_prefix {
            config.fallback_prefix.clone_from(prefix);
        }
        config.exclude.extend(self.exclude.iter().cloned());
        Ok(())
    }
}
