//! Domain model: project identity, commands, command states, release states, config.

pub mod command;
pub mod command_state;
pub mod config;
pub mod error;
pub mod project;
pub mod release_state;

pub use command::{Command, CommandKind};
pub use command_state::{CommandState, StateKind, TransitionError};
pub use config::{Config, ConfigKey};
pub use error::{ReleaseError, Result};
pub use project::{Project, ProjectId, Relation};
pub use release_state::{ReleaseState, TypeOfRun};
