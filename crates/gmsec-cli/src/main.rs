//! # gmsec CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gmsec_cli::inspect::{run_create, run_describe, run_list, CreateArgs, DescribeArgs};
use gmsec_cli::validate::{run_validate, ValidateArgs};
use gmsec_cli::SpecArgs;

/// GMSEC message specification tool.
///
/// Loads a layered message specification and lists, describes,
/// instantiates, or validates messages against it.
#[derive(Parser, Debug)]
#[command(name = "gmsec", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    spec: SpecArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List schema levels and loaded message templates.
    List,

    /// Show one template's fields, arrays, and dependencies.
    Describe(DescribeArgs),

    /// Create a template-bound message and print it as JSON.
    Create(CreateArgs),

    /// Validate JSON-encoded messages.
    Validate(ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<u8> {
    let spec = cli.spec.load()?;
    match &cli.command {
        Commands::List => run_list(&spec),
        Commands::Describe(args) => run_describe(args, &spec),
        Commands::Create(args) => run_create(args, &spec),
        Commands::Validate(args) => run_validate(args, &spec, &cli.spec.to_config()?),
    }
}
