//! Command line client for cosign.
//!
//! Each command resolves the configuration and its flags into a request for
//! one of the coordinators. Nothing is kept between invocations.

pub mod cli;
pub mod handler;
mod listing;
mod prompt;
mod raw;
mod tx;

pub use cli::{Cli, Commands, GlobalOpts};
pub use handler::{CliHandler, Session};

use cosign_errors::{Error, Result};
use std::fmt::Display;

/// Initialize logging from the global options
pub fn init_logging(opts: &GlobalOpts) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    cosign_log::init_tracing_with_level(opts.log_level(), opts.log_format)
}

/// Execute one parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    CliHandler::new(cli.global_opts).execute(cli.command).await
}

pub(crate) fn config_error(e: impl Display) -> Error {
    Error::Config(e.to_string())
}
