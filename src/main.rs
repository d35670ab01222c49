use std::process::ExitCode;

use clap::Parser;
use colorbook::{cli, logger};

fn main() -> ExitCode {
    let args = cli::CliArgs::parse();

    // Overwrites the previous session log.
    logger::init(args.verbose);

    cli::run(args)
}
