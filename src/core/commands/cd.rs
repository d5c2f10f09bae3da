use std::env;
use std::io::Write;
use std::path::PathBuf;

use super::{Command, CommandError, Flow};
use crate::core::state::ShellState;

#[derive(Clone)]
pub struct CdCommand;

impl Default for CdCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl CdCommand {
    pub fn new() -> Self {
        Self
    }

    fn home_dir() -> Result<PathBuf, CommandError> {
        env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .ok_or_else(|| CommandError::ExecutionError("cd: HOME not set".to_string()))
    }
}

impl Command for CdCommand {
    fn execute(
        &self,
        args: &[String],
        _state: &mut ShellState,
        _out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        let target = match args {
            [] => Self::home_dir()?,
            [path] => PathBuf::from(path),
            _ => return Err(CommandError::InvalidArguments("cd: too many arguments".to_string())),
        };

        env::set_current_dir(&target).map_err(|e| {
            CommandError::ExecutionError(format!("cd: {}: {}", target.display(), e))
        })?;
        Ok(Flow::Continue)
    }
}
