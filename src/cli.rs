//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// RunReady - run completion-check coordinator
#[derive(Parser)]
#[command(
    name = "runready",
    about = "Debounced, mutex-guarded completion checks and NEW -> READY transitions for runs",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Trigger a manual completion check for a run
    Check {
        /// Run number to check
        #[arg(value_name = "RUN_NO")]
        run_no: u32,

        /// Seconds to wait for a completion notice
        #[arg(short, long, default_value = "10")]
        wait: u64,
    },

    /// Show the remote status of a run
    Status {
        /// Run number to query
        #[arg(value_name = "RUN_NO")]
        run_no: u32,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Re-trigger completion checks until the run is READY
    Watch {
        /// Run number to watch
        #[arg(value_name = "RUN_NO")]
        run_no: u32,

        /// Seconds between checks
        #[arg(short, long, default_value = "5")]
        interval: u64,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

/// Output format for query commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_command() {
        let cli = Cli::try_parse_from(["runready", "check", "500"]).unwrap();
        match cli.command {
            Command::Check { run_no, wait } => {
                assert_eq!(run_no, 500);
                assert_eq!(wait, 10);
            }
            _ => panic!("Wrong command"),
        }
    }

    #[test]
    fn test_parse_watch_with_interval() {
        let cli = Cli::try_parse_from(["runready", "watch", "501", "--interval", "2"]).unwrap();
        match cli.command {
            Command::Watch {
                run_no,
                interval,
                timeout,
            } => {
                assert_eq!(run_no, 501);
                assert_eq!(interval, 2);
                assert!(timeout.is_none());
            }
            _ => panic!("Wrong command"),
        }
    }

    #[test]
    fn test_missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["runready"]).is_err());
    }
}
