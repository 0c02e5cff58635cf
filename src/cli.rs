use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Settings;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub eval: EvalFlags,
}

#[derive(ClapArgs, Debug, Default)]
pub struct EvalFlags {
    /// Print each `if` condition and the statement it belongs to
    #[arg(long, global = true)]
    pub trace_conditions: bool,

    /// Abort any `while` statement after this many iterations
    #[arg(long, global = true, value_name = "N")]
    pub max_iterations: Option<u64>,
}

impl From<&EvalFlags> for Settings {
    fn from(flags: &EvalFlags) -> Self {
        Settings {
            trace_conditions: flags.trace_conditions,
            max_iterations: flags.max_iterations,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a source file, one statement per line
    Run {
        /// Path to the source file
        file: PathBuf,
    },

    /// Check a source file for syntax errors
    Check {
        /// Path to the source file to check
        file: PathBuf,
    },

    /// Run every file in a directory, each in a fresh session
    Test {
        /// Directory holding the source files
        dir: PathBuf,
    },

    /// Start an interactive REPL session
    Repl,
}
