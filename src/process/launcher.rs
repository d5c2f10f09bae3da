use std::ffi::CString;
use std::ptr;
use std::os::unix::io::RawFd;

use log::debug;
use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::sys::wait::waitpid;
use nix::unistd::{close, dup2, fork, ForkResult, Pid};

use super::{signal, ProcessError};
use crate::core::state::ExitStatus;
use crate::input::ParsedCommand;

const NULL_DEVICE: &str = "/dev/null";

/// Result of starting one external command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launched {
    Foreground(ExitStatus),
    Background(Pid),
}

/// A redirection the child performs between fork and exec.
struct Redirect {
    path: CString,
    flags: OFlag,
    target: RawFd,
    failure: Vec<u8>,
}

impl Redirect {
    fn input(path: &str) -> Result<Self, ProcessError> {
        Ok(Self {
            path: CString::new(path)?,
            flags: OFlag::O_RDONLY,
            target: libc::STDIN_FILENO,
            failure: format!("{}: no such file or directory\n", path).into_bytes(),
        })
    }

    fn output(path: &str) -> Result<Self, ProcessError> {
        Ok(Self {
            path: CString::new(path)?,
            flags: OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            target: libc::STDOUT_FILENO,
            failure: format!("cannot open {} for output\n", path).into_bytes(),
        })
    }

    fn apply(&self) -> nix::Result<()> {
        let fd = open(self.path.as_c_str(), self.flags, output_mode())?;
        if fd != self.target {
            dup2(fd, self.target)?;
            close(fd)?;
        }
        Ok(())
    }
}

/// rw for everyone, before umask.
fn output_mode() -> Mode {
    Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IWGRP | Mode::S_IROTH | Mode::S_IWOTH
}

/// Everything the child needs, built before fork so the child never allocates.
struct ChildPlan {
    argv: Vec<CString>,
    /// Null-terminated pointers into `argv`, in the layout execvp(3) takes.
    argv_ptrs: Vec<*const libc::c_char>,
    redirects: Vec<Redirect>,
    foreground: bool,
    exec_failure: Vec<u8>,
}

impl ChildPlan {
    fn run(&self) -> ! {
        signal::reset_for_child(self.foreground);

        for redirect in &self.redirects {
            if redirect.apply().is_err() {
                child_fail(&redirect.failure);
            }
        }

        if let Some(program) = self.argv.first() {
            // SAFETY: `argv_ptrs` points into `argv`, which outlives the call,
            // and ends with a null pointer.
            unsafe { libc::execvp(program.as_ptr(), self.argv_ptrs.as_ptr()) };
        }
        child_fail(&self.exec_failure)
    }
}

fn child_fail(message: &[u8]) -> ! {
    signal::write_raw(libc::STDERR_FILENO, message);
    // SAFETY: _exit skips atexit handlers and stdio buffers owned by the parent.
    unsafe { libc::_exit(1) }
}

#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    null_background_io: bool,
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ProcessLauncher {
    /// With `null_background_io`, background jobs without an explicit
    /// redirection read from and write to the null device.
    pub fn new(null_background_io: bool) -> Self {
        Self { null_background_io }
    }

    /// Starts `command`; waits for it unless `background` is set.
    pub fn launch(&self, command: &ParsedCommand, background: bool) -> Result<Launched, ProcessError> {
        let pid = self.spawn(command, background)?;
        if background {
            Ok(Launched::Background(pid))
        } else {
            self.wait_foreground(pid).map(Launched::Foreground)
        }
    }

    pub fn spawn(&self, command: &ParsedCommand, background: bool) -> Result<Pid, ProcessError> {
        let plan = self.plan(command, background)?;

        // SAFETY: the child only runs async-signal-safe code from `ChildPlan::run`.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => plan.run(),
            Ok(ForkResult::Parent { child }) => {
                debug!(
                    "spawned {} as pid {} ({})",
                    command.program(),
                    child,
                    if background { "background" } else { "foreground" }
                );
                Ok(child)
            }
            Err(e) => Err(ProcessError::Fork(e)),
        }
    }

    /// Blocks until `pid` exits or is killed by a signal.
    pub fn wait_foreground(&self, pid: Pid) -> Result<ExitStatus, ProcessError> {
        loop {
            match waitpid(pid, None) {
                Ok(status) => {
                    if let Some(status) = ExitStatus::from_wait_status(status) {
                        debug!("foreground pid {} finished: {}", pid, status);
                        return Ok(status);
                    }
                }
                // The terminal-stop handler interrupted the wait.
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(ProcessError::Wait(e)),
            }
        }
    }

    fn plan(&self, command: &ParsedCommand, background: bool) -> Result<ChildPlan, ProcessError> {
        let argv = command
            .args
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        if argv.is_empty() {
            return Err(ProcessError::InvalidArgument("empty command".to_string()));
        }

        let null_io = background && self.null_background_io;
        let mut redirects = Vec::with_capacity(2);
        match (&command.input, null_io) {
            (Some(path), _) => redirects.push(Redirect::input(path)?),
            (None, true) => redirects.push(Redirect::input(NULL_DEVICE)?),
            (None, false) => {}
        }
        match (&command.output, null_io) {
            (Some(path), _) => redirects.push(Redirect::output(path)?),
            (None, true) => redirects.push(Redirect::output(NULL_DEVICE)?),
            (None, false) => {}
        }

        let argv_ptrs = argv
            .iter()
            .map(|arg| arg.as_ptr())
            .chain(std::iter::once(ptr::null()))
            .collect();

        Ok(ChildPlan {
            argv,
            argv_ptrs,
            redirects,
            foreground: !background,
            exec_failure: format!("{}: no such file or directory\n", command.program()).into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn command(args: &[&str]) -> ParsedCommand {
        ParsedCommand {
            args: args.iter().map(|s| s.to_string()).collect(),
            input: None,
            output: None,
            background: false,
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("smallsh_launcher_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_foreground_exit_codes() {
        let launcher = ProcessLauncher::default();
        assert_eq!(
            launcher.launch(&command(&["true"]), false).unwrap(),
            Launched::Foreground(ExitStatus::Exited(0))
        );
        assert_eq!(
            launcher.launch(&command(&["false"]), false).unwrap(),
            Launched::Foreground(ExitStatus::Exited(1))
        );
        assert_eq!(
            launcher.launch(&command(&["sh", "-c", "exit 42"]), false).unwrap(),
            Launched::Foreground(ExitStatus::Exited(42))
        );
    }

    #[test]
    fn test_foreground_killed_by_signal() {
        let launcher = ProcessLauncher::default();
        let status = launcher
            .launch(&command(&["sh", "-c", "kill -TERM $$"]), false)
            .unwrap();
        assert_eq!(status, Launched::Foreground(ExitStatus::Signaled(15)));
    }

    #[test]
    fn test_output_then_input_redirection() {
        let launcher = ProcessLauncher::default();
        let out = temp_path("redirect.txt");
        let out_str = out.to_str().unwrap().to_string();

        let mut echo = command(&["echo", "hi"]);
        echo.output = Some(out_str.clone());
        assert_eq!(
            launcher.launch(&echo, false).unwrap(),
            Launched::Foreground(ExitStatus::Exited(0))
        );
        assert_eq!(fs::read_to_string(&out).unwrap(), "hi\n");

        let counted = temp_path("count.txt");
        let mut wc = command(&["wc", "-l"]);
        wc.input = Some(out_str);
        wc.output = Some(counted.to_str().unwrap().to_string());
        launcher.launch(&wc, false).unwrap();
        assert_eq!(fs::read_to_string(&counted).unwrap().trim(), "1");

        let _ = fs::remove_file(out);
        let _ = fs::remove_file(counted);
    }

    #[test]
    fn test_output_redirection_truncates() {
        let launcher = ProcessLauncher::default();
        let out = temp_path("truncate.txt");
        fs::write(&out, "a much longer previous content\n").unwrap();

        let mut echo = command(&["echo", "new"]);
        echo.output = Some(out.to_str().unwrap().to_string());
        launcher.launch(&echo, false).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "new\n");

        let _ = fs::remove_file(out);
    }

    #[test]
    fn test_missing_input_fails_child_only() {
        let launcher = ProcessLauncher::default();
        let mut cat = command(&["cat"]);
        cat.input = Some("/nonexistent/smallsh/input".to_string());
        assert_eq!(
            launcher.launch(&cat, false).unwrap(),
            Launched::Foreground(ExitStatus::Exited(1))
        );
    }

    #[test]
    fn test_redirect_failure_messages() {
        let input = Redirect::input("/nonexistent/smallsh/input").unwrap();
        assert_eq!(input.failure, b"/nonexistent/smallsh/input: no such file or directory\n");
        let output = Redirect::output("/nonexistent/smallsh/output").unwrap();
        assert_eq!(output.failure, b"cannot open /nonexistent/smallsh/output for output\n");
    }

    #[test]
    fn test_plan_argv_is_null_terminated() {
        let plan = ProcessLauncher::default()
            .plan(&command(&["ls", "-l", "/tmp"]), false)
            .unwrap();
        assert_eq!(plan.argv_ptrs.len(), plan.argv.len() + 1);
        for (pointer, arg) in plan.argv_ptrs.iter().zip(&plan.argv) {
            assert_eq!(*pointer, arg.as_ptr());
        }
        assert!(plan.argv_ptrs[3].is_null());
    }

    #[test]
    fn test_interrupt_reaches_foreground_children_only() {
        let launcher = ProcessLauncher::default();
        let script = command(&["sh", "-c", "kill -INT $$; exit 7"]);

        assert_eq!(
            launcher.launch(&script, false).unwrap(),
            Launched::Foreground(ExitStatus::Signaled(2))
        );

        let Launched::Background(pid) = launcher.launch(&script, true).unwrap() else {
            panic!("expected a background launch");
        };
        assert_eq!(launcher.wait_foreground(pid).unwrap(), ExitStatus::Exited(7));
    }

    #[test]
    fn test_unwritable_output_fails_child_only() {
        let launcher = ProcessLauncher::default();
        let mut echo = command(&["echo", "hi"]);
        echo.output = Some("/nonexistent/smallsh/output".to_string());
        assert_eq!(
            launcher.launch(&echo, false).unwrap(),
            Launched::Foreground(ExitStatus::Exited(1))
        );
    }

    #[test]
    fn test_unknown_program_fails_child_only() {
        let launcher = ProcessLauncher::default();
        assert_eq!(
            launcher
                .launch(&command(&["smallsh-definitely-not-a-command"]), false)
                .unwrap(),
            Launched::Foreground(ExitStatus::Exited(1))
        );
    }

    #[test]
    fn test_background_returns_without_waiting() {
        let launcher = ProcessLauncher::default();
        let started = std::time::Instant::now();
        let launched = launcher.launch(&command(&["sleep", "1"]), true).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_millis(900));

        let Launched::Background(pid) = launched else {
            panic!("expected a background launch, got {:?}", launched);
        };
        assert_eq!(launcher.wait_foreground(pid).unwrap(), ExitStatus::Exited(0));
    }

    #[test]
    fn test_background_stdin_is_null_device() {
        let launcher = ProcessLauncher::default();
        let out = temp_path("null_stdin.txt");

        let mut cat = command(&["cat"]);
        cat.output = Some(out.to_str().unwrap().to_string());
        let Launched::Background(pid) = launcher.launch(&cat, true).unwrap() else {
            panic!("expected a background launch");
        };
        assert_eq!(launcher.wait_foreground(pid).unwrap(), ExitStatus::Exited(0));
        assert_eq!(fs::read_to_string(&out).unwrap(), "");

        let _ = fs::remove_file(out);
    }

    #[test]
    fn test_interior_nul_is_rejected() {
        let launcher = ProcessLauncher::default();
        let result = launcher.launch(&command(&["echo", "a\0b"]), false);
        assert!(matches!(result, Err(ProcessError::InvalidArgument(_))));
    }
}
