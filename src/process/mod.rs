use std::fmt;

use nix::errno::Errno;

pub mod launcher;
pub mod reaper;
pub mod signal;

pub use launcher::{Launched, ProcessLauncher};
pub use reaper::{ChildJob, JobTable};
pub use signal::{Mode, SignalMediator};

#[derive(Debug)]
pub enum ProcessError {
    Fork(Errno),
    Wait(Errno),
    InvalidArgument(String),
    SignalError(String),
}

impl From<std::ffi::NulError> for ProcessError {
    fn from(e: std::ffi::NulError) -> Self {
        ProcessError::InvalidArgument(e.to_string())
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::Fork(e) => write!(f, "fork failed: {}", e),
            ProcessError::Wait(e) => write!(f, "wait failed: {}", e),
            ProcessError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            ProcessError::SignalError(msg) => write!(f, "signal error: {}", msg),
        }
    }
}

impl std::error::Error for ProcessError {}
