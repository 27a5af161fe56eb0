//! CLI command definitions for pkit
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod init;
pub mod job;
pub mod show;

use clap::{Parser, Subcommand};
use init::InitArgs;
use job::JobArgs;
use show::ShowArgs;

/// Project Kit: layered project configuration and job runner
#[derive(Parser, Debug)]
#[command(name = "pkit", author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off (default), 1/stdout, 2/stderr, or filename
    #[arg(short, long, default_value = "0", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize the current directory as a project with a .pkit file
    Init(InitArgs),

    /// Run a job with its resolved configuration and arguments
    Job(JobArgs),

    /// Print the merged configuration, or a single resolved key
    Config(ShowArgs),
}
