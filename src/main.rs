//! assetflow - command-line front end for the stylesheet and image tasks

use std::process::ExitCode;

use assetflow::cli;

fn main() -> ExitCode {
    cli::run()
}
