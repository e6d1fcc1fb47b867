//! Command-line interface implementation for Stencil.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments structure for Stencil.
#[derive(Parser, Debug)]
#[command(author, version, about = "Stencil: project pattern scanner and code generator", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a project tree and export the discovered pattern catalog
    Scan {
        /// Root directory to scan
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Write the catalog JSON to this file
        #[arg(short, long, value_name = "FILE")]
        catalog: Option<PathBuf>,

        /// Merge a previously exported catalog before writing
        #[arg(short, long, value_name = "FILE")]
        merge: Option<PathBuf>,

        /// Include glob, repeatable; default includes every source file
        #[arg(long, value_name = "GLOB")]
        include: Vec<String>,

        /// Exclude glob, repeatable; applied on top of conventional exclusions
        #[arg(long, value_name = "GLOB")]
        exclude: Vec<String>,
    },

    /// Render templates into output files
    Generate {
        /// Template category
        #[arg(value_name = "CATEGORY")]
        category: Option<String>,

        /// Template name within the category
        #[arg(value_name = "NAME", requires = "category")]
        name: Option<String>,

        /// JSON file holding the data model for a single template
        #[arg(short, long, value_name = "FILE", requires = "name")]
        data: Option<PathBuf>,

        /// Output file path for a single template
        #[arg(short, long, value_name = "FILE", requires = "name")]
        out: Option<PathBuf>,

        /// JSON plan file: an array of {template, model, output} requests
        #[arg(
            long,
            value_name = "FILE",
            conflicts_with_all = ["category", "name", "data", "out"]
        )]
        plan: Option<PathBuf>,

        /// Templates directory; defaults to the configured one, then ./templates
        #[arg(long, value_name = "DIR")]
        templates: Option<PathBuf>,

        /// Overwrite existing output files
        #[arg(long)]
        overwrite: bool,
    },
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help()
                    .unwrap();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
