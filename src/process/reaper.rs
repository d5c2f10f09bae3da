use std::collections::BTreeSet;
use std::fmt;

use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use super::ProcessError;
use crate::core::state::ExitStatus;

/// A background child that has been collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildJob {
    pub pid: Pid,
    pub status: ExitStatus,
}

impl fmt::Display for ChildJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "background pid {} is done: {}", self.pid, self.status)
    }
}

/// Background children that have not been reaped yet.
#[derive(Debug, Default)]
pub struct JobTable {
    pending: BTreeSet<Pid>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, pid: Pid) {
        self.pending.insert(pid);
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.pending.contains(&pid)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Collects every tracked child that has finished, without blocking.
    /// Children still running stay tracked for the next call, as do children
    /// whose wait failed unexpectedly.
    pub fn reap(&mut self) -> Vec<ChildJob> {
        self.reap_with(Self::poll)
    }

    fn reap_with<F>(&mut self, mut poll: F) -> Vec<ChildJob>
    where
        F: FnMut(Pid) -> Result<Poll, ProcessError>,
    {
        let mut finished = Vec::new();

        for pid in self.pending.clone() {
            match poll(pid) {
                Ok(Poll::Running) => {}
                Ok(Poll::Done(status)) => {
                    debug!("reaped background pid {}: {}", pid, status);
                    self.pending.remove(&pid);
                    finished.push(ChildJob { pid, status });
                }
                Ok(Poll::Gone) => {
                    warn!("background pid {} was already reaped elsewhere", pid);
                    self.pending.remove(&pid);
                }
                Err(e) => warn!("polling background pid {} failed: {}", pid, e),
            }
        }

        finished
    }

    fn poll(pid: Pid) -> Result<Poll, ProcessError> {
        loop {
            match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => return Ok(Poll::Running),
                Ok(status) => {
                    return Ok(ExitStatus::from_wait_status(status).map_or(Poll::Running, Poll::Done))
                }
                Err(Errno::EINTR) => {}
                Err(Errno::ECHILD) => return Ok(Poll::Gone),
                Err(e) => return Err(ProcessError::Wait(e)),
            }
        }
    }
}

enum Poll {
    Running,
    Done(ExitStatus),
    Gone,
}
