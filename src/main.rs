use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tributary::app::{AppContext, Paths};
use tributary::cli::commands::{self, Outcome};
use tributary::cli::Cli;
use tributary::printer::Printer;

#[tokio::main]
async fn main() -> ExitCode {
    // Diagnostics go to stderr, stdout carries the timeline
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::FeedErrors) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<Outcome> {
    let mut ctx = AppContext::new(Paths::resolve()?)?;
    let mut printer = Printer::stdio(ctx.config.styling);
    let outcome = commands::run(cli, &mut ctx, &mut printer).await?;
    Ok(outcome)
}
