use crate::common::CommonParams;
use crate::config::Config;
use crate::git::GitRepo;
use crate::logger;
use crate::{log_debug, log_warn};
use crate::pipeline::{AutoCommitPipeline, RunOutcome, RunResult};
use anyhow::Result;
use colored::Colorize;
use std::env;

/// Handle the 'run' command: load config, run the pipeline, print the result.
pub async fn handle_run_command(common: CommonParams) -> Result<()> {
    let repo = GitRepo::discover(&env::current_dir()?)?;

    let mut config = Config::load(repo.repo_path())?;
    common.apply_to_config(&mut config)?;
    config.validate()?;

    let pipeline = AutoCommitPipeline::new(config, repo)?;
    let result = pipeline.run().await?;

    print_result(&result);
    Ok(())
}

/// Handle the 'hook' command: like 'run', but the printed result is also
/// persisted to a timestamped log file for the invoking agent host.
pub async fn handle_hook_command(common: CommonParams) -> Result<()> {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let log_path = format!("git-otto-{timestamp}.log");
    logger::enable_logging();
    logger::set_log_file(&log_path)?;
    log_debug!("Hook run started");

    handle_run_command(common).await
}

/// Handle the 'config' command: layer the given overrides onto the personal
/// configuration, persist it, and print the result.
pub fn handle_config_command(common: &CommonParams) -> Result<()> {
    let mut config = Config::load_personal()?;
    common.apply_to_config(&mut config)?;
    config.save()?;

    println!("{}", "Personal configuration:".green().bold());
    print!("{}", toml::to_string(&config)?);
    Ok(())
}

/// Render a run result for the terminal, in `git commit` output style.
fn print_result(result: &RunResult) {
    match &result.outcome {
        RunOutcome::Skipped(reason) => {
            println!("{} {}", "Skipped:".yellow().bold(), reason);
            log_debug!("Run skipped: {}", reason);
        }
        RunOutcome::Committed(records) => {
            for record in records {
                println!(
                    "[{}] {}",
                    record.hash.green().bold(),
                    record.message.bold()
                );
                for file in &record.files {
                    println!("  {file}");
                }
                log_debug!("Committed {} ({})", record.hash, record.message);
            }
            if result.pushed {
                println!("{}", "Pushed to remote".cyan());
                log_debug!("Pushed to remote");
            }
            if !result.usage.is_zero() {
                println!(
                    "Tokens: {} prompt, {} completion, {} total",
                    result.usage.prompt_tokens,
                    result.usage.completion_tokens,
                    result.usage.total_tokens
                );
            }
        }
    }

    if let Some(warning) = &result.warning {
        eprintln!(
            "{} {} (verify your AI configuration)",
            "Warning:".yellow().bold(),
            warning
        );
        log_warn!("Run degraded: {}", warning);
    }
}
