//! Command-line interface implementation
//!
//! Parses the command line, sets up logging and dispatches to the task
//! implementations in [`tasks`].

mod tasks;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::logging::{init_logging, LoggingConfig};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// assetflow - keep a LESS aggregate in sync with its fragments, build the
/// stylesheets and prepare responsive images
#[derive(Parser, Debug)]
#[command(name = "assetflow")]
#[command(about = "Stylesheet import injection, LESS builds and responsive images")]
#[command(version)]
pub struct Cli {
    /// Path to assetflow.toml (default: search upwards from the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the assets directory
    #[arg(long, global = true)]
    pub assets: Option<PathBuf>,

    /// Debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Inject and rebuild stylesheets, clean the aggregate, then process images
    Default,
    /// Watch the stylesheet folder and keep the aggregate in sync
    Watch,
    /// Inject every fragment into the aggregate and rebuild once
    #[command(alias = "inject")]
    Less,
    /// Watch the stylesheet folder and keep the aggregate in sync
    #[command(name = "watch-less", alias = "watch-inject")]
    WatchLess,
    /// Compress, resize and convert images and write example markup
    Images,
}

/// Entry point used by the binary.
pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_INVALID_ARGS)
            } else {
                ExitCode::from(EXIT_SUCCESS)
            };
        }
    };

    init_logging(LoggingConfig::from_flags(cli.log_level.as_deref(), cli.verbose, cli.quiet));

    let ctx = match tasks::load_context(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match cli.command {
        Commands::Default => tasks::run_default(&ctx),
        Commands::Less => tasks::run_less(&ctx),
        Commands::Watch | Commands::WatchLess => tasks::run_watch(&ctx),
        Commands::Images => tasks::run_images(&ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        let cli = Cli::try_parse_from(["assetflow", "inject"]).unwrap();
        assert_eq!(cli.command, Commands::Less);

        let cli = Cli::try_parse_from(["assetflow", "watch-inject"]).unwrap();
        assert_eq!(cli.command, Commands::WatchLess);

        let cli = Cli::try_parse_from(["assetflow", "watch-less"]).unwrap();
        assert_eq!(cli.command, Commands::WatchLess);
    }

    #[test]
    fn test_parse_global_flags_after_command() {
        let cli = Cli::try_parse_from([
            "assetflow",
            "images",
            "--assets",
            "public/assets",
            "--log-level",
            "debug",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.command, Commands::Images);
        assert_eq!(cli.assets, Some(PathBuf::from("public/assets")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["assetflow", "-v", "-q", "less"]).is_err());
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["assetflow", "render"]).is_err());
    }
}
