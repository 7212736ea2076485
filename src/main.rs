//! `WasteLink` command-line client

use std::{io, process::ExitCode};

use clap::Parser;
use tracing::error;

use crate::cli::{Cli, commands, logging};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_subscriber(&cli) {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized, must use eprintln for subscriber errors"
        )]
        {
            eprintln!("Failed to initialise logging: {e}");
        }

        return ExitCode::FAILURE;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match commands::run(cli, &mut out).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");

            #[expect(clippy::print_stderr, reason = "errors are reported to the terminal user")]
            {
                eprintln!("Error: {e}");
            }

            ExitCode::FAILURE
        }
    }
}
