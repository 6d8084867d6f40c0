mod assembly;
mod cli;
mod commands;
mod config;
mod dispatcher;
mod error;
mod fetch;
mod llm;
mod pipeline;
mod prompt;
mod refiner;
mod script;
mod synthesizer;
mod tts;

use clap::Parser;
use cli::{Cli, Command};
use colored::*;
use error::PodgenResult;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing, gated on RUST_LOG env var
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .try_init();
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        if let Some(hint) = e.hint() {
            eprintln!("{} {}", "hint:".yellow().bold(), hint);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> PodgenResult<()> {
    match cli.command {
        None => commands::generate::run_demo().await,
        Some(Command::Init { path }) => commands::init::run(&path),
        Some(Command::Generate { path }) => commands::generate::run(&path).await,
        Some(Command::Script {
            path,
            no_merge,
            output,
        }) => commands::script::run(&path, !no_merge, output.as_deref()).await,
    }
}
