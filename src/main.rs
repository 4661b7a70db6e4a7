use colored::Colorize;
use git_otto::cli;
use git_otto::logger;

#[tokio::main]
async fn main() {
    if let Err(e) = logger::init() {
        eprintln!("{} {}", "Failed to initialize logging:".red().bold(), e);
        std::process::exit(1);
    }

    if let Err(e) = cli::main().await {
        eprintln!("{} {e:#}", "Error:".red().bold());
        std::process::exit(1);
    }
}
