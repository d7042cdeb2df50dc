//! ledgerkey - log in to and out of a ledger service from the command line.
//!
//! Every command opens a session to the service, runs, and disconnects.
//! Fatal errors are printed to stderr and end the process with status 1.

mod cli;
mod reader;

use std::io;
use std::process::ExitCode;

use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let matches = cli::build().get_matches();
    match cli::run(&matches).await {
        Ok(outcome) => {
            println!("{}", outcome);
            ExitCode::SUCCESS
        }
        Err(err) => {
            debug!(?err, "Command failed");
            eprintln!("{}", err.display_message());
            ExitCode::from(err.exit_code())
        }
    }
}
