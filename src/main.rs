//! Project Kit command-line entry point.

use anyhow::Result;
use clap::Parser;
use project_kit::cli::{Cli, Command, init, job, show};
use project_kit::logging::{LogTarget, init_tracing};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    init_tracing(cli.verbose, &LogTarget::parse(&cli.log))?;

    match cli.command {
        Command::Init(args) => {
            init::run_init(&args)?;
        }
        Command::Job(args) => {
            if let Err(e) = job::run_job(&args) {
                if !job::already_reported(&e) {
                    eprintln!("Error: {e:#}");
                }
                std::process::exit(1);
            }
        }
        Command::Config(args) => {
            show::run_show(&args)?;
        }
    }

    Ok(())
}
