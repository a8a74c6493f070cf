//! Command pattern interfaces
//!
//! Each CLI operation is a `Command` built from parsed arguments by a
//! `CommandFactory`.

use crate::config::DrillConfig;
use crate::errors::DrillResult;

/// An executable CLI operation
pub trait Command {
    /// Execute the command
    ///
    /// # Returns
    /// Result indicating success or an error
    fn execute(&self) -> DrillResult<()>;
}

/// Creates commands from CLI arguments
pub trait CommandFactory {
    /// Create the command selected by the arguments
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `config` - Configuration with the flags already applied
    ///
    /// # Returns
    /// A command that implements the Command trait, or an error
    fn create_command(&self, args: &clap::ArgMatches, config: DrillConfig) -> DrillResult<Box<dyn Command>>;
}
