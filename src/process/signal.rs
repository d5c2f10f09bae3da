use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use signal_hook::consts::SIGTSTP;
use signal_hook::SigId;

use crate::process::ProcessError;

pub const ENTER_FOREGROUND_ONLY: &[u8] = b"\nEntering foreground-only mode (& is now ignored)\n";
pub const EXIT_FOREGROUND_ONLY: &[u8] = b"\nExiting foreground-only mode\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    ForegroundOnly,
}

/// Owns the foreground-only flag on behalf of the terminal-stop handler.
#[derive(Debug, Clone)]
pub struct SignalMediator {
    flag: Arc<AtomicBool>,
    notify_fd: RawFd,
}

impl SignalMediator {
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        Self {
            flag,
            notify_fd: libc::STDOUT_FILENO,
        }
    }

    /// Sends mode change notices to `fd` instead of standard output.
    pub fn with_notify_fd(mut self, fd: RawFd) -> Self {
        self.notify_fd = fd;
        self
    }

    pub fn mode(&self) -> Mode {
        if self.flag.load(Ordering::SeqCst) {
            Mode::ForegroundOnly
        } else {
            Mode::Normal
        }
    }

    /// Flips the mode and announces it. Runs inside the SIGTSTP handler, so
    /// it may only touch the atomic flag and issue raw writes of static text.
    pub fn toggle(&self) -> Mode {
        let was_foreground_only = self.flag.fetch_xor(true, Ordering::SeqCst);
        if was_foreground_only {
            write_raw(self.notify_fd, EXIT_FOREGROUND_ONLY);
            Mode::Normal
        } else {
            write_raw(self.notify_fd, ENTER_FOREGROUND_ONLY);
            Mode::ForegroundOnly
        }
    }

    /// Ignores SIGINT in the shell and routes SIGTSTP to `toggle`.
    pub fn install(&self) -> Result<SigId, ProcessError> {
        set_disposition(Signal::SIGINT, SigHandler::SigIgn)?;

        let mediator = self.clone();
        // SAFETY: `toggle` only performs an atomic xor and write(2).
        let registered = unsafe {
            signal_hook::low_level::register(SIGTSTP, move || {
                mediator.toggle();
            })
        };
        registered
            .map_err(|e| ProcessError::SignalError(format!("cannot install SIGTSTP handler: {}", e)))
    }
}

/// Signal setup for a freshly forked child, before exec.
///
/// Foreground children get the default SIGINT action back so Ctrl-C reaches
/// them; background children keep ignoring it. Neither may be stopped by
/// SIGTSTP. Only async-signal-safe calls are made here.
pub fn reset_for_child(foreground: bool) {
    let interrupt = if foreground {
        SigHandler::SigDfl
    } else {
        SigHandler::SigIgn
    };
    let _ = set_disposition(Signal::SIGINT, interrupt);
    let _ = set_disposition(Signal::SIGTSTP, SigHandler::SigIgn);
}

fn set_disposition(signal: Signal, handler: SigHandler) -> Result<(), ProcessError> {
    let action = SigAction::new(handler, SaFlags::empty(), SigSet::all());
    // SAFETY: only SigDfl and SigIgn are installed through here.
    unsafe { sigaction(signal, &action) }
        .map(|_| ())
        .map_err(|e| ProcessError::SignalError(format!("sigaction({}): {}", signal, e)))
}

/// write(2) loop without buffering or allocation.
pub(crate) fn write_raw(fd: RawFd, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        // SAFETY: `bytes` is a live slice for the duration of the call.
        let written = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        if written > 0 {
            bytes = &bytes[written as usize..];
        } else if written < 0 && nix::errno::Errno::last() == nix::errno::Errno::EINTR {
            continue;
        } else {
            return;
        }
    }
}
