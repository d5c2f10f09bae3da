use std::collections::BTreeMap;
use std::io::Write;

use log::debug;

mod cd;
mod exit;
mod status;

pub use cd::CdCommand;
pub use exit::ExitCommand;
pub use status::StatusCommand;

use crate::core::state::{ExitStatus, ShellState};
use crate::input::ParsedCommand;
use crate::process::{JobTable, Launched, ProcessError, ProcessLauncher};

#[derive(Debug)]
pub enum CommandError {
    InvalidArguments(String),
    ExecutionError(String),
    IoError(std::io::Error),
    ProcessError(ProcessError),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::InvalidArguments(msg) => write!(f, "invalid arguments: {}", msg),
            CommandError::ExecutionError(msg) => write!(f, "{}", msg),
            CommandError::IoError(err) => write!(f, "IO error: {}", err),
            CommandError::ProcessError(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        CommandError::IoError(err)
    }
}

impl From<ProcessError> for CommandError {
    fn from(err: ProcessError) -> Self {
        CommandError::ProcessError(err)
    }
}

/// Whether the main loop keeps reading lines after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub trait Command {
    fn execute(
        &self,
        args: &[String],
        state: &mut ShellState,
        out: &mut dyn Write,
    ) -> Result<Flow, CommandError>;
}

#[derive(Clone)]
enum CommandType {
    Cd(CdCommand),
    Exit(ExitCommand),
    Status(StatusCommand),
}

impl Command for CommandType {
    fn execute(
        &self,
        args: &[String],
        state: &mut ShellState,
        out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        match self {
            CommandType::Cd(cmd) => cmd.execute(args, state, out),
            CommandType::Exit(cmd) => cmd.execute(args, state, out),
            CommandType::Status(cmd) => cmd.execute(args, state, out),
        }
    }
}

/// Runs built-ins in-process and hands everything else to the launcher.
#[derive(Clone)]
pub struct CommandExecutor {
    commands: BTreeMap<String, CommandType>,
    launcher: ProcessLauncher,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(ProcessLauncher::default())
    }
}

impl CommandExecutor {
    pub fn new(launcher: ProcessLauncher) -> Self {
        let mut executor = Self {
            commands: BTreeMap::new(),
            launcher,
        };

        executor.commands.insert("cd".to_string(), CommandType::Cd(CdCommand::new()));
        executor.commands.insert("exit".to_string(), CommandType::Exit(ExitCommand::new()));
        executor
            .commands
            .insert("status".to_string(), CommandType::Status(StatusCommand::new()));

        executor
    }

    pub fn is_builtin(&self, command: &str) -> bool {
        self.commands.contains_key(command)
    }

    /// Built-ins ignore redirection and the background marker.
    pub fn execute(
        &self,
        command: &ParsedCommand,
        state: &mut ShellState,
        jobs: &mut JobTable,
        out: &mut dyn Write,
    ) -> Result<Flow, CommandError> {
        if let Some(builtin) = self.commands.get(command.program()) {
            debug!("built-in {}", command.program());
            return builtin.execute(command.arguments(), state, out);
        }

        let background = state.runs_in_background(command.background);
        if command.background && !background {
            debug!("foreground-only mode: running {} in foreground", command.program());
        }

        match self.launcher.launch(command, background)? {
            Launched::Foreground(status) => {
                state.set_last_status(status);
                if let ExitStatus::Signaled(_) = status {
                    writeln!(out, "{}", status)?;
                }
            }
            Launched::Background(pid) => {
                jobs.track(pid);
                writeln!(out, "background pid is {}", pid)?;
            }
        }
        out.flush()?;

        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Parser, PidExpander};
    use std::env;
    use std::sync::atomic::Ordering;

    fn parse(line: &str) -> ParsedCommand {
        Parser::new(PidExpander::new()).parse(line).unwrap().unwrap()
    }

    fn raw(args: &[&str]) -> ParsedCommand {
        ParsedCommand {
            args: args.iter().map(|s| s.to_string()).collect(),
            input: None,
            output: None,
            background: false,
        }
    }

    fn run(
        executor: &CommandExecutor,
        line: &str,
        state: &mut ShellState,
        jobs: &mut JobTable,
    ) -> (Result<Flow, CommandError>, String) {
        let mut out = Vec::new();
        let result = executor.execute(&parse(line), state, jobs, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_builtin_command_detection() {
        let executor = CommandExecutor::default();

        assert!(executor.is_builtin("cd"));
        assert!(executor.is_builtin("exit"));
        assert!(executor.is_builtin("status"));
        assert!(!executor.is_builtin("echo"));
        assert!(!executor.is_builtin(""));
    }

    #[test]
    fn test_status_tracks_foreground_commands() {
        let executor = CommandExecutor::default();
        let mut state = ShellState::new();
        let mut jobs = JobTable::new();

        let (_, out) = run(&executor, "status", &mut state, &mut jobs);
        assert_eq!(out, "exit value 0\n");

        let (result, out) = run(&executor, "false", &mut state, &mut jobs);
        assert_eq!(result.unwrap(), Flow::Continue);
        assert_eq!(out, "");
        let (_, out) = run(&executor, "status", &mut state, &mut jobs);
        assert_eq!(out, "exit value 1\n");

        let mut out = Vec::new();
        executor
            .execute(&raw(&["sh", "-c", "exit 3"]), &mut state, &mut jobs, &mut out)
            .unwrap();
        let (_, out) = run(&executor, "status", &mut state, &mut jobs);
        assert_eq!(out, "exit value 3\n");

        run(&executor, "true", &mut state, &mut jobs);
        assert_eq!(state.last_status(), ExitStatus::Exited(0));
    }

    #[test]
    fn test_signaled_foreground_is_announced() {
        let executor = CommandExecutor::default();
        let mut state = ShellState::new();
        let mut jobs = JobTable::new();

        let mut out = Vec::new();
        executor
            .execute(&raw(&["sh", "-c", "kill -TERM $$"]), &mut state, &mut jobs, &mut out)
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "terminated by signal 15\n");
        assert_eq!(state.last_status(), ExitStatus::Signaled(15));

        let (_, out) = run(&executor, "status", &mut state, &mut jobs);
        assert_eq!(out, "terminated by signal 15\n");
    }

    #[test]
    fn test_background_command_is_tracked() {
        let executor = CommandExecutor::default();
        let mut state = ShellState::new();
        let mut jobs = JobTable::new();

        let (result, out) = run(&executor, "sleep 0 &", &mut state, &mut jobs);
        assert_eq!(result.unwrap(), Flow::Continue);
        assert!(out.starts_with("background pid is "));
        assert_eq!(jobs.len(), 1);

        let pid: i32 = out.trim().rsplit(' ').next().unwrap().parse().unwrap();
        assert!(jobs.contains(nix::unistd::Pid::from_raw(pid)));
        // Background completions never touch the foreground status.
        assert_eq!(state.last_status(), ExitStatus::Exited(0));
        ProcessLauncher::default()
            .wait_foreground(nix::unistd::Pid::from_raw(pid))
            .unwrap();
    }

    #[test]
    fn test_foreground_only_mode_ignores_background_marker() {
        let executor = CommandExecutor::default();
        let mut state = ShellState::new();
        let mut jobs = JobTable::new();
        state.foreground_only_flag().store(true, Ordering::SeqCst);

        let output = env::temp_dir().join(format!("smallsh_fg_only_{}.txt", std::process::id()));
        let line = format!("echo done > {} &", output.display());

        let (result, out) = run(&executor, &line, &mut state, &mut jobs);
        assert_eq!(result.unwrap(), Flow::Continue);
        assert_eq!(out, "");
        assert!(jobs.is_empty());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "done\n");

        let _ = std::fs::remove_file(output);
    }

    #[test]
    fn test_exit_stops_the_loop() {
        let executor = CommandExecutor::default();
        let mut state = ShellState::new();
        let mut jobs = JobTable::new();

        let (result, _) = run(&executor, "exit", &mut state, &mut jobs);
        assert_eq!(result.unwrap(), Flow::Exit);
        let (result, _) = run(&executor, "exit 5 &", &mut state, &mut jobs);
        assert_eq!(result.unwrap(), Flow::Exit);
    }

    #[test]
    fn test_command_error_display() {
        let errors = vec![
            CommandError::InvalidArguments("bad args".to_string()),
            CommandError::ExecutionError("failed".to_string()),
            CommandError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "io error",
            )),
            CommandError::ProcessError(ProcessError::Fork(nix::errno::Errno::EAGAIN)),
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }
}
