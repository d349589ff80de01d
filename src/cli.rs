//! Command-line interface implementation for accio.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, Args as ClapArgs, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments structure for accio.
#[derive(Parser, Debug)]
#[command(author, version, about = "accio: generate files from blueprint generators", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a generator into the working directory
    Run(RunArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Path to the generator directory or git repository URL
    #[arg(value_name = "LOCATION")]
    pub location: String,

    /// Evaluate everything but write nothing
    #[arg(long)]
    pub dry: bool,

    /// Overwrite existing files without asking
    #[arg(short, long)]
    pub force: bool,

    /// Keep going when a file fails and report all failures at the end
    #[arg(short, long)]
    pub ignore_errors: bool,

    /// Directory the generated files are written to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub working_dir: PathBuf,

    /// Additional path to ignore, relative to the generator root
    #[arg(long = "ignore", value_name = "PATH")]
    pub ignore: Vec<String>,
}

/// Options of a single generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub location: String,
    pub dry: bool,
    pub force: bool,
    pub ignore_errors: bool,
    pub working_dir: PathBuf,
    pub ignore: Vec<String>,
}

impl From<RunArgs> for RunOptions {
    fn from(args: RunArgs) -> Self {
        Self {
            location: args.location,
            dry: args.dry,
            force: args.force,
            ignore_errors: args.ignore_errors,
            working_dir: args.working_dir,
            ignore: args.ignore,
        }
    }
}

/// Parses command line arguments and returns the Args structure.
///
/// # Returns
/// * `Args` - Parsed command line arguments
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if matches!(
                e.kind(),
                ErrorKind::MissingRequiredArgument
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                    | ErrorKind::MissingSubcommand
            ) {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
