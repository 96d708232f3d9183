//! # attrclean
//!
//! Command-line entry point.
//!
//! ```bash
//! attrclean clean -r azdias.csv -c customers.csv -m attributes.csv --separator ';'
//! attrclean catalog -m attributes.csv
//! ```
//!
//! Logging is set up before anything else; `RUST_LOG=debug` shows the
//! per-stage column lists.

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // Allow println! in main binary

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    attrclean::logging::init(cli.log_dir.as_deref())?;
    cli::run_command(cli.command)
}
