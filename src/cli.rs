use crate::commands;
use crate::common::CommonParams;
use crate::log_debug;
use crate::logger;
use anyhow::Result;
use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand, crate_version};

const LOG_FILE: &str = "git-otto-debug.log";

/// CLI structure defining the available commands and global arguments
#[derive(Parser)]
#[command(
    author,
    version = crate_version!(),
    about = "git-otto: automatic AI-assisted commits at the end of coding-agent turns",
    styles = get_styles(),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log debug messages to a file
    #[arg(short = 'l', long = "log", global = true, help = "Log debug messages to a file")]
    pub log: bool,

    /// Specify a custom log file path
    #[arg(long = "log-file", global = true, help = "Specify a custom log file path")]
    pub log_file: Option<String>,

    /// Print log messages to stdout as well
    #[arg(long = "verbose", global = true, help = "Print log messages to stdout")]
    pub verbose: bool,
}

/// Enumeration of available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the auto-commit pipeline once
    #[command(about = "Run the auto-commit pipeline once")]
    Run {
        #[command(flatten)]
        common: CommonParams,
    },

    /// Turn-end entry point for agent hosts; persists the result to a
    /// timestamped log file
    #[command(about = "Run the pipeline as an agent turn-end hook")]
    Hook {
        #[command(flatten)]
        common: CommonParams,
    },

    /// Update the personal configuration and print the result
    #[command(about = "Update the personal configuration and print the result")]
    Config {
        #[command(flatten)]
        common: CommonParams,
    },
}

/// Defines the styles used for the CLI output
fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Magenta.on_default().bold())
        .usage(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Green.on_default().bold())
        .placeholder(AnsiColor::Yellow.on_default())
}

/// Parse the command-line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Entry point for handling CLI commands
pub async fn main() -> Result<()> {
    let cli = parse_args();

    if cli.log {
        logger::enable_logging();
        let log_file = cli.log_file.as_deref().unwrap_or(LOG_FILE);
        logger::set_log_file(log_file)?;
    } else {
        logger::disable_logging();
    }
    if cli.verbose {
        logger::enable_logging();
        logger::set_log_to_stdout(true);
    }

    handle_command(cli).await
}

/// Handle the command passed to the CLI
pub async fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run { common } => {
            log_debug!("Handling 'run' command");
            commands::handle_run_command(common).await
        }
        Commands::Hook { common } => {
            log_debug!("Handling 'hook' command");
            commands::handle_hook_command(common).await
        }
        Commands::Config { common } => {
            log_debug!("Handling 'config' command");
            commands::handle_config_command(&common)
        }
    }
}
