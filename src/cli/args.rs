//! CLI argument definitions using clap
//!
//! Commands:
//! - cfbench load --config <path>
//! - cfbench run --config <path>
//! - cfbench inspect --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cfbench - key/value benchmark client over column-family engines
#[derive(Parser, Debug)]
#[command(name = "cfbench")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Insert the workload's records
    Load {
        /// Path to configuration file
        #[arg(long, default_value = "./cfbench.json")]
        config: PathBuf,
    },

    /// Run the workload's operation mix against loaded records
    Run {
        /// Path to configuration file
        #[arg(long, default_value = "./cfbench.json")]
        config: PathBuf,
    },

    /// Open the data directory, list namespaces and counters, close
    Inspect {
        /// Path to configuration file
        #[arg(long, default_value = "./cfbench.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_subcommands() {
        let cli = Cli::try_parse_from(["cfbench", "run", "--config", "bench.json"]).unwrap();
        match cli.command {
            Command::Run { config } => assert_eq!(config, PathBuf::from("bench.json")),
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::try_parse_from(["cfbench", "inspect"]).unwrap();
        assert!(matches!(cli.command, Command::Inspect { .. }));
    }

    #[test]
    fn test_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["cfbench", "serve"]).is_err());
    }
}
