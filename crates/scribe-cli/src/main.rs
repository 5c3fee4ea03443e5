//! Scribe CLI - note-taking from the terminal, synced to a Scribe backend.

use clap::Parser;

mod cli;
mod commands;
mod error;
mod stores;

use cli::Cli;
use error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scribe=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    commands::dispatch(cli).await
}
