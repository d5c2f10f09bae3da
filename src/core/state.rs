use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::sys::wait::WaitStatus;

/// How a child process finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Exited(u8),
    Signaled(i32),
}

impl Default for ExitStatus {
    /// Reported by `status` before any foreground command has completed.
    fn default() -> Self {
        ExitStatus::Exited(0)
    }
}

impl ExitStatus {
    /// Converts a terminal wait result. Stopped, continued and still-alive
    /// results have no `ExitStatus`.
    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(ExitStatus::Exited(u8::try_from(code).unwrap_or(u8::MAX))),
            WaitStatus::Signaled(_, signal, _) => Some(ExitStatus::Signaled(signal as i32)),
            _ => None,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit value {}", code),
            ExitStatus::Signaled(signal) => write!(f, "terminated by signal {}", signal),
        }
    }
}

/// State that survives across command lines.
///
/// `foreground_only` is shared with the terminal-stop handler, which is its
/// only writer; everything else is owned by the main loop.
#[derive(Debug, Default)]
pub struct ShellState {
    foreground_only: Arc<AtomicBool>,
    last_status: ExitStatus,
}

impl ShellState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn foreground_only(&self) -> bool {
        self.foreground_only.load(Ordering::SeqCst)
    }

    /// Handle given to the signal mediator.
    pub fn foreground_only_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.foreground_only)
    }

    pub fn last_status(&self) -> ExitStatus {
        self.last_status
    }

    pub fn set_last_status(&mut self, status: ExitStatus) {
        self.last_status = status;
    }

    /// `&` is honored only outside foreground-only mode.
    pub fn runs_in_background(&self, requested: bool) -> bool {
        requested && !self.foreground_only()
    }
}
