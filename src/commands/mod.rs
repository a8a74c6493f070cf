//! CLI command implementations
//!
//! Commands are built from parsed arguments by `PixdrillCommandFactory`.

pub mod command_traits;
pub mod drill_command;
pub mod info_command;
pub mod points_file;

pub use command_traits::{Command, CommandFactory};
pub use drill_command::{config_from_args, DrillCommand};
pub use info_command::InfoCommand;
pub use points_file::{parse_points, read_points, stats_to_json};

use clap::ArgMatches;

use crate::config::DrillConfig;
use crate::errors::DrillResult;

/// Chooses the command to run from the CLI arguments
pub struct PixdrillCommandFactory;

impl PixdrillCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        PixdrillCommandFactory
    }
}

impl Default for PixdrillCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFactory for PixdrillCommandFactory {
    fn create_command(&self, args: &ArgMatches, config: DrillConfig) -> DrillResult<Box<dyn Command>> {
        if args.get_one::<String>("info").is_some() {
            Ok(Box::new(InfoCommand::new(args)?))
        } else {
            Ok(Box::new(DrillCommand::new(args, config)?))
        }
    }
}
