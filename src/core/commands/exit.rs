use std::io::Write;

use super::{Command, CommandError, Flow};
use crate::core::state::ShellState;

/// Leaves the main loop; the shell then exits with status 0. Background jobs
/// are left running.
#[derive(Clone)]
pub struct ExitCommand;

impl Default for ExitCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl ExitCommand {
    pub fn new() -> Self {
        Self
    }
}

impl Command for ExitCommand {
    fn execute(
        &self,
        _args: &[String],
        _state: &mut ShellState,
        _out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        Ok(Flow::Exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_command() {
        let cmd = ExitCommand::new();
        let flow = cmd
            .execute(&["ignored".to_string()], &mut ShellState::new(), &mut std::io::sink())
            .unwrap();
        assert_eq!(flow, Flow::Exit);
    }
}
