use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use log::LevelFilter;

use raidplan_api::constants::RAID_CONFIG_PATH_DEFAULT;

use crate::RAIDPLAN_VERSION;

#[derive(Parser, Debug)]
#[clap(version = RAIDPLAN_VERSION)]
pub struct Cli {
    /// Logging verbosity [OFF, ERROR, WARN, INFO, DEBUG, TRACE]
    #[arg(global = true, short, long, default_value_t = LevelFilter::Info)]
    pub verbosity: LevelFilter,

    /// Also write JSON log entries to this file
    #[arg(global = true, long)]
    pub log_file: Option<PathBuf>,

    /// Write tracing spans, as JSON, to this file
    #[arg(global = true, long)]
    pub trace_file: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assign block devices to the logical disks of a RAID configuration
    Resolve {
        /// The RAID configuration to resolve
        #[clap(index = 1, default_value = RAID_CONFIG_PATH_DEFAULT)]
        config: PathBuf,

        /// Block device inventory to use instead of the devices of this host
        #[clap(short, long)]
        inventory: Option<PathBuf>,

        /// Path to save the resolution, printed to stdout otherwise
        #[clap(short, long)]
        output: Option<PathBuf>,

        /// Path to save an eventual fatal error
        #[clap(short, long)]
        error: Option<PathBuf>,
    },

    /// Validate the provided RAID configuration
    Validate {
        /// Path to a RAID configuration file
        #[clap(index = 1, default_value = RAID_CONFIG_PATH_DEFAULT)]
        config: PathBuf,
    },

    /// List the block devices of this host
    Inventory {
        /// Path to save the inventory, printed to stdout otherwise
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Resolve { .. } => "resolve",
            Commands::Validate { .. } => "validate",
            Commands::Inventory { .. } => "inventory",
        }
    }
}

impl Display for Commands {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::try_parse_from([
            "raidplan",
            "-v",
            "debug",
            "resolve",
            "raid.yaml",
            "--inventory",
            "inventory.yaml",
            "-o",
            "resolution.yaml",
        ])
        .unwrap();

        assert_eq!(cli.verbosity, LevelFilter::Debug);
        assert_eq!(cli.log_file, None);
        assert_eq!(cli.command.to_string(), "resolve");
        match cli.command {
            Commands::Resolve {
                config,
                inventory,
                output,
                error,
            } => {
                assert_eq!(config, PathBuf::from("raid.yaml"));
                assert_eq!(inventory, Some(PathBuf::from("inventory.yaml")));
                assert_eq!(output, Some(PathBuf::from("resolution.yaml")));
                assert_eq!(error, None);
            }
            other => panic!("Unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["raidplan", "validate"]).unwrap();
        assert_eq!(cli.verbosity, LevelFilter::Info);
        match cli.command {
            Commands::Validate { config } => {
                assert_eq!(config, PathBuf::from(RAID_CONFIG_PATH_DEFAULT))
            }
            other => panic!("Unexpected command: {other:?}"),
        }

        // Global options are accepted after the subcommand too.
        let cli = Cli::try_parse_from([
            "raidplan",
            "inventory",
            "--log-file",
            "/var/log/raidplan.log",
            "--trace-file",
            "/var/log/raidplan-trace.json",
        ])
        .unwrap();
        assert_eq!(cli.log_file, Some(PathBuf::from("/var/log/raidplan.log")));
        assert_eq!(
            cli.trace_file,
            Some(PathBuf::from("/var/log/raidplan-trace.json"))
        );
        assert_eq!(cli.command.name(), "inventory");
    }

    #[test]
    fn test_parse_failures() {
        Cli::try_parse_from(["raidplan"]).unwrap_err();
        Cli::try_parse_from(["raidplan", "rebuild"]).unwrap_err();
        Cli::try_parse_from(["raidplan", "-v", "loud", "validate"]).unwrap_err();
    }
}
