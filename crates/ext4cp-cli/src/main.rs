//! ext4cp - copy files out of ext2/3/4 disk images without mounting them.

mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use std::process::ExitCode;

/// Exit status of every failed run.
const FAILURE_EXIT_CODE: u8 = 10;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let mut formatter = output::create_formatter(cli.json, cli.verbose);

    match commands::extract::execute(&cli, &mut *formatter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            formatter.format_error(&err);
            ExitCode::from(FAILURE_EXIT_CODE)
        }
    }
}
