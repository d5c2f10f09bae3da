use std::io::Write;

use super::{Command, CommandError, Flow};
use crate::core::state::ShellState;

/// Prints how the last foreground command finished.
#[derive(Clone)]
pub struct StatusCommand;

impl Default for StatusCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCommand {
    pub fn new() -> Self {
        Self
    }
}

impl Command for StatusCommand {
    fn execute(
        &self,
        _args: &[String],
        state: &mut ShellState,
        out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        writeln!(out, "{}", state.last_status())?;
        out.flush()?;
        Ok(Flow::Continue)
    }
}
