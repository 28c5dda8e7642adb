//! Shopcheck CLI Library
//!
//! Command-line interface for the Shopcheck catalog checks.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{CasesArgs, Cli, ColorArg, Commands, ConfigArgs, RunArgs, SourceArgs};
pub use config::{CliConfig, ColorChoice, Verbosity, DEFAULT_CONFIG_PATH};
pub use error::{CliError, CliResult};
pub use output::{summary_line, ProgressReporter};
pub use runner::{
    apply_run_flags, resolve_cases, resolve_suite, SuiteOutcome, SuiteRunner, SUITE_NAME,
};
