//! # rucio-register
//!
//! This is the binary entry point for the `rucio-register` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`, including the historical
//!   single-dash `-noregister` flag.
//! - Running the registration and returning any error, which makes the
//!   process exit non-zero with the error chain on stderr.
//!
//! The upload, reconciliation, and configuration logic lives in the
//! `rucio_register` library crate; the binary only wires it together.

mod cli;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse_from(cli::normalize_args(std::env::args_os()));
    cli.execute()
}
